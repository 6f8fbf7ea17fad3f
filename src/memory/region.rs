// Tue Jan 13 2026 - Alex

use crate::memory::{Address, MemoryError, Protection};
use std::fmt;

/// One mapping of a process address space, as listed by `/proc/<pid>/maps`.
///
/// Regions are snapshots: by the time a read is issued against one, the
/// process may already have unmapped or remapped it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryRegion {
    start: Address,
    end: Address,
    protection: Protection,
    copy_on_write: bool,
    file_offset: u64,
    backing_name: String,
}

impl MemoryRegion {
    /// Covers `[start, end)`. Returns `None` when `end` precedes `start`.
    pub fn new(start: Address, end: Address, protection: Protection, backing_name: String) -> Option<Self> {
        if end.as_u64() < start.as_u64() {
            return None;
        }
        Some(Self {
            start,
            end,
            protection,
            copy_on_write: true,
            file_offset: 0,
            backing_name,
        })
    }

    /// Covers `size` bytes from `start`. Returns `None` when the span would
    /// wrap past the top of the address space.
    pub fn with_size(start: Address, size: u64, protection: Protection, backing_name: String) -> Option<Self> {
        Self::new(start, start.checked_add(size)?, protection, backing_name)
    }

    pub fn with_file_offset(mut self, offset: u64) -> Self {
        self.file_offset = offset;
        self
    }

    pub fn with_copy_on_write(mut self, copy_on_write: bool) -> Self {
        self.copy_on_write = copy_on_write;
        self
    }

    /// Parses a single maps line:
    /// `start-end perms offset dev inode [pathname]`.
    pub fn parse_maps_line(line: &str) -> Result<Self, MemoryError> {
        let invalid = || MemoryError::InvalidMapsLine(line.to_string());

        let mut fields = line.splitn(6, ' ');
        let span = fields.next().ok_or_else(invalid)?;
        let perms = fields.next().ok_or_else(invalid)?;
        let offset = fields.next().ok_or_else(invalid)?;
        let _device = fields.next().ok_or_else(invalid)?;
        let _inode = fields.next().ok_or_else(invalid)?;
        let name = fields.next().map(str::trim).unwrap_or("");

        let (start, end) = span.split_once('-').ok_or_else(invalid)?;
        let start = u64::from_str_radix(start, 16).map_err(|_| invalid())?;
        let end = u64::from_str_radix(end, 16).map_err(|_| invalid())?;
        if perms.len() < 4 {
            return Err(invalid());
        }
        let file_offset = u64::from_str_radix(offset, 16).map_err(|_| invalid())?;

        let region = Self::new(Address::new(start), Address::new(end), Protection::from_perms(perms), name.to_string())
            .ok_or_else(invalid)?;
        Ok(region
            .with_file_offset(file_offset)
            .with_copy_on_write(perms.as_bytes()[3] == b'p'))
    }

    pub fn protection(&self) -> Protection {
        self.protection
    }

    pub fn backing_name(&self) -> &str {
        &self.backing_name
    }

    pub fn file_offset(&self) -> u64 {
        self.file_offset
    }

    pub fn start(&self) -> Address {
        self.start
    }

    pub fn end(&self) -> Address {
        self.end
    }

    pub fn size(&self) -> u64 {
        self.end.offset_from(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn contains(&self, addr: Address) -> bool {
        addr.as_u64() >= self.start.as_u64() && addr.as_u64() < self.end.as_u64()
    }

    /// Byte offset of `addr` into this region, if it falls inside.
    pub fn offset_of(&self, addr: Address) -> Option<u64> {
        self.contains(addr).then(|| addr.offset_from(self.start))
    }

    /// `start-end` in the maps file's notation.
    pub fn span(&self) -> String {
        format!("{:x}-{:x}", self.start, self.end)
    }

    pub fn is_readable(&self) -> bool {
        self.protection.can_read()
    }

    pub fn is_writable(&self) -> bool {
        self.protection.can_write()
    }

    pub fn is_executable(&self) -> bool {
        self.protection.can_execute()
    }

    pub fn is_copy_on_write(&self) -> bool {
        self.copy_on_write
    }
}

impl fmt::Display for MemoryRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}{} {:08x} {}",
            self.span(),
            self.protection,
            if self.copy_on_write { 'p' } else { 's' },
            self.file_offset,
            self.backing_name
        )
    }
}
