// Wed Jan 15 2026 - Alex

pub mod abc;
pub mod cache;
pub mod cursor;
pub mod error;
pub mod pool;
pub mod resolver;
pub mod traits;

pub use abc::{AbcFile, MethodInfo, Multiname, Namespace};
pub use cache::IdentityCache;
pub use cursor::{BinaryCursor, FixedWidth};
pub use error::BytecodeError;
pub use pool::ConstantPool;
pub use resolver::{
    clear_caches, decode_traits, resolve_name, MethodHandle, MethodIdentity, NameCache, NameResolver, TraitsCache,
    TraitsHandle, TraitsKey,
};
pub use traits::{DecodedTraits, HeaderKind, ScopeHeader, TraitAttributes, TraitDecoder, TraitKind, TraitRecord};
