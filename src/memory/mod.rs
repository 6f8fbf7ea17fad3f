// Tue Jan 13 2026 - Alex

pub mod address;
pub mod binary;
pub mod error;
pub mod process;
pub mod protection;
pub mod region;
pub mod scanner;
pub mod traits;

pub use address::Address;
pub use binary::BinaryMemory;
pub use error::MemoryError;
pub use process::ProcessMemory;
pub use protection::Protection;
pub use region::MemoryRegion;
pub use scanner::{RegionScanner, ScanOptions};
pub use traits::{MemoryReader, MemoryWriter};

use crate::pattern::Pattern;

/// Scans `reader` with a default [`RegionScanner`].
pub fn scan(reader: &dyn MemoryReader, pattern: &Pattern, max_results: usize) -> Vec<Address> {
    RegionScanner::new().scan(reader, pattern, max_results)
}

/// Fire-and-forget bulk write through a default [`RegionScanner`].
pub fn write(writer: &dyn MemoryWriter, address: Address, bytes: &[u8]) {
    RegionScanner::new().write(writer, address, bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct RecordingWriter {
        writes: Mutex<Vec<(Address, Vec<u8>)>>,
        fail: bool,
    }

    impl MemoryWriter for RecordingWriter {
        fn write_bytes(&self, addr: Address, data: &[u8]) -> Result<usize, MemoryError> {
            if self.fail {
                return Err(MemoryError::WriteFailed(addr.as_u64()));
            }
            self.writes.lock().push((addr, data.to_vec()));
            Ok(data.len())
        }
    }

    #[test]
    fn test_write_is_fire_and_forget() {
        let writer = RecordingWriter::default();
        write(&writer, Address::new(0x1000), &[0x90, 0xC3]);
        assert_eq!(writer.writes.lock().as_slice(), &[(Address::new(0x1000), vec![0x90, 0xC3])]);

        let failing = RecordingWriter {
            fail: true,
            ..Default::default()
        };
        write(&failing, Address::new(0x1000), &[0x90]);
        assert!(failing.writes.lock().is_empty());
    }

    #[test]
    fn test_scan_binary_image() {
        let image = BinaryMemory::from_bytes(Address::new(0x400000), vec![0x10, 0x20, 0x30, 0x20, 0x30]).unwrap();
        let pattern = Pattern::parse("20 ??").unwrap();
        assert_eq!(scan(&image, &pattern, 8), vec![Address::new(0x400001), Address::new(0x400003)]);
    }
}
