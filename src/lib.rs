// Tue Jan 15 2026 - Alex

pub mod avm;
pub mod config;
pub mod memory;
pub mod pattern;
pub mod ui;
pub mod utils;

pub use avm::{resolve_name, AbcFile, ConstantPool, MethodHandle, NameResolver, TraitDecoder, TraitsHandle};
pub use config::Config;
pub use memory::{Address, MemoryReader, MemoryWriter, ProcessMemory, RegionScanner};
pub use pattern::{MaskedMatcher, Pattern};
