// Wed Jan 15 2026 - Alex

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BytecodeError {
    #[error("Unexpected end of data at offset {position} (needed {needed} more byte(s))")]
    UnexpectedEof { position: usize, needed: usize },
    #[error("Invalid UTF-8 string at offset {position}")]
    InvalidString { position: usize },
    #[error("Unsupported bytecode version {major}.{minor}")]
    UnsupportedVersion { major: u16, minor: u16 },
    #[error("Invalid multiname kind 0x{kind:02x} at offset {position}")]
    InvalidMultinameKind { kind: u8, position: usize },
    #[error("{table} index {index} out of range")]
    IndexOutOfRange { table: &'static str, index: u32 },
}
