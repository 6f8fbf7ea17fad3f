// Wed Jan 15 2026 - Alex

use crate::memory::{Address, MemoryError, MemoryRegion};
use std::borrow::Cow;

/// Read side of a memory source: a live process or a local image.
pub trait MemoryReader: Send + Sync {
    /// Snapshot of the current mappings, in address-map order. A source
    /// that has gone away reports no regions rather than an error.
    fn regions(&self) -> Vec<MemoryRegion>;

    /// Bulk read. May return fewer bytes than requested when the tail of
    /// the span is no longer mapped.
    fn read_bytes(&self, addr: Address, len: usize) -> Result<Cow<'_, [u8]>, MemoryError>;

    /// Reads a whole region in one call. Sources that can hand out their
    /// bytes in place override this to avoid the copy.
    fn read_region(&self, region: &MemoryRegion) -> Result<Cow<'_, [u8]>, MemoryError> {
        self.read_bytes(region.start(), region.size() as usize)
    }

    /// True when reads are served from this process's own address space.
    fn is_local(&self) -> bool {
        false
    }

    fn read_u32(&self, addr: Address) -> Result<u32, MemoryError> {
        let bytes = self.read_bytes(addr, 4)?;
        let raw: [u8; 4] = bytes
            .get(..4)
            .and_then(|b| b.try_into().ok())
            .ok_or(MemoryError::ReadFailed(addr.as_u64()))?;
        Ok(u32::from_le_bytes(raw))
    }

    fn read_u64(&self, addr: Address) -> Result<u64, MemoryError> {
        let bytes = self.read_bytes(addr, 8)?;
        let raw: [u8; 8] = bytes
            .get(..8)
            .and_then(|b| b.try_into().ok())
            .ok_or(MemoryError::ReadFailed(addr.as_u64()))?;
        Ok(u64::from_le_bytes(raw))
    }

    fn read_ptr(&self, addr: Address) -> Result<Address, MemoryError> {
        Ok(Address::new(self.read_u64(addr)?))
    }

    /// Follows `base -> [+o0] -> [+o1] ...`, dereferencing every offset but
    /// the last. A step that would run past the top of the address space
    /// fails with `AddressOverflow`.
    fn read_pointer_chain(&self, base: Address, offsets: &[u64]) -> Result<Address, MemoryError> {
        let mut address = base;
        for (i, &offset) in offsets.iter().enumerate() {
            let target = address.checked_add(offset).ok_or(MemoryError::AddressOverflow {
                base: address.as_u64(),
                offset,
            })?;
            address = if i + 1 < offsets.len() { self.read_ptr(target)? } else { target };
        }
        Ok(address)
    }
}

pub trait MemoryWriter: Send + Sync {
    /// Single bulk write, returning how many bytes landed.
    fn write_bytes(&self, addr: Address, data: &[u8]) -> Result<usize, MemoryError>;
}
