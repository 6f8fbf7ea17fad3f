// Tue Jan 13 2026 - Alex

use thiserror::Error;

#[derive(Error, Debug)]
pub enum MemoryError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Process not found: {0}")]
    ProcessNotFound(i32),
    #[error("Read failed at address 0x{0:x}")]
    ReadFailed(u64),
    #[error("Write failed at address 0x{0:x}")]
    WriteFailed(u64),
    #[error("Invalid maps line: {0}")]
    InvalidMapsLine(String),
    #[error("Permission denied: {0}")]
    PermissionDenied(String),
    #[error("Not supported: {0}")]
    NotSupported(String),
    #[error("Cannot allocate {0} bytes for a read")]
    AllocationFailed(usize),
    #[error("Address 0x{base:x} + 0x{offset:x} overflows")]
    AddressOverflow { base: u64, offset: u64 },
}
