// Tue Jan 13 2026 - Alex

use crate::memory::{Address, MemoryError, MemoryReader, MemoryRegion, Protection};
use memmap2::Mmap;
use std::borrow::Cow;
use std::fs::File;
use std::path::Path;

enum SegmentData {
    Owned(Vec<u8>),
    Mapped(Mmap),
}

impl SegmentData {
    fn bytes(&self) -> &[u8] {
        match self {
            Self::Owned(data) => data,
            Self::Mapped(map) => map,
        }
    }
}

struct Segment {
    region: MemoryRegion,
    data: SegmentData,
}

/// A memory image held in local buffers: dumped regions, a mapped file, or
/// synthetic data. Every region is served in place.
#[derive(Default)]
pub struct BinaryMemory {
    segments: Vec<Segment>,
}

impl BinaryMemory {
    pub fn new() -> Self {
        Self::default()
    }

    /// One readable region at `base` holding `data`.
    pub fn from_bytes(base: Address, data: Vec<u8>) -> Result<Self, MemoryError> {
        let mut memory = Self::new();
        memory.add_segment(base, data, Protection::READ, "")?;
        Ok(memory)
    }

    /// Maps a file read-only and presents it as a single region at address 0.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, MemoryError> {
        let path = path.as_ref();
        let file = File::open(path)?;
        // SAFETY: the mapping is read-only; concurrent truncation of the file
        // by another process is outside what this tool defends against.
        let map = unsafe { Mmap::map(&file)? };
        let region = MemoryRegion::with_size(Address::zero(), map.len() as u64, Protection::READ, path.display().to_string())
            .ok_or(MemoryError::AddressOverflow { base: 0, offset: map.len() as u64 })?
            .with_copy_on_write(false);

        Ok(Self {
            segments: vec![Segment {
                region,
                data: SegmentData::Mapped(map),
            }],
        })
    }

    /// Adds `data` as a region at `base`. Fails when the region would wrap
    /// past the top of the address space.
    pub fn add_segment(&mut self, base: Address, data: Vec<u8>, protection: Protection, name: &str) -> Result<(), MemoryError> {
        let len = data.len() as u64;
        let region = MemoryRegion::with_size(base, len, protection, name.to_string()).ok_or(MemoryError::AddressOverflow {
            base: base.as_u64(),
            offset: len,
        })?;
        self.segments.push(Segment {
            region,
            data: SegmentData::Owned(data),
        });
        Ok(())
    }

    /// The segment holding `addr` and the offset of `addr` within it.
    fn segment_at(&self, addr: Address) -> Option<(&Segment, usize)> {
        self.segments
            .iter()
            .find_map(|s| s.region.offset_of(addr).map(|offset| (s, offset as usize)))
    }
}

impl MemoryReader for BinaryMemory {
    fn regions(&self) -> Vec<MemoryRegion> {
        self.segments.iter().map(|s| s.region.clone()).collect()
    }

    fn read_bytes(&self, addr: Address, len: usize) -> Result<Cow<'_, [u8]>, MemoryError> {
        let (segment, start) = self
            .segment_at(addr)
            .ok_or(MemoryError::ReadFailed(addr.as_u64()))?;
        let bytes = segment.data.bytes();
        let end = start.saturating_add(len).min(bytes.len());
        Ok(Cow::Borrowed(&bytes[start..end]))
    }

    fn read_region(&self, region: &MemoryRegion) -> Result<Cow<'_, [u8]>, MemoryError> {
        match self.segments.iter().find(|s| s.region == *region) {
            Some(segment) => Ok(Cow::Borrowed(segment.data.bytes())),
            None => self.read_bytes(region.start(), region.size() as usize),
        }
    }
}
