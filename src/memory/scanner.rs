// Tue Jan 13 2026 - Alex

use crate::config::ScanningConfig;
use crate::memory::{Address, MemoryReader, MemoryRegion, MemoryWriter};
use crate::pattern::{MaskedMatcher, Pattern, PatternError};
use crate::utils::logging::ScopedTimer;
use rayon::prelude::*;

/// Pseudo-mappings that are listed readable but fault or misbehave when read.
pub const DEFAULT_EXCLUDED_MAPPINGS: &[&str] = &["[vvar]", "[vvar_vclock]"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanOptions {
    pub alignment: usize,
    pub max_results: usize,
    /// Only regions whose backing name contains this substring.
    pub segment: Option<String>,
}

impl ScanOptions {
    pub fn new(max_results: usize) -> Self {
        Self {
            alignment: 1,
            max_results,
            segment: None,
        }
    }

    pub fn with_alignment(mut self, alignment: usize) -> Self {
        self.alignment = alignment;
        self
    }

    pub fn with_segment(mut self, segment: &str) -> Self {
        self.segment = Some(segment.to_string());
        self
    }
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self::new(usize::MAX)
    }
}

/// Walks the regions of a memory source and runs the masked matcher over
/// each one.
///
/// Region lists are never cached: every scan re-enumerates, because the
/// target may map and unmap memory between calls.
pub struct RegionScanner {
    excluded_mappings: Vec<String>,
    max_region_size: Option<u64>,
}

impl RegionScanner {
    pub fn new() -> Self {
        Self {
            excluded_mappings: DEFAULT_EXCLUDED_MAPPINGS.iter().map(|s| s.to_string()).collect(),
            max_region_size: None,
        }
    }

    pub fn from_config(config: &ScanningConfig) -> Self {
        Self {
            excluded_mappings: config.excluded_mappings.clone(),
            max_region_size: config.max_region_size,
        }
    }

    pub fn with_excluded_mapping(mut self, name: &str) -> Self {
        self.excluded_mappings.push(name.to_string());
        self
    }

    pub fn with_max_region_size(mut self, size: u64) -> Self {
        self.max_region_size = Some(size);
        self
    }

    /// Every mapping, scannable or not.
    pub fn enumerate_regions(&self, reader: &dyn MemoryReader) -> Vec<MemoryRegion> {
        reader.regions()
    }

    pub fn is_scannable(&self, region: &MemoryRegion) -> bool {
        region.is_readable()
            && !region.is_empty()
            && !self.excluded_mappings.iter().any(|name| name == region.backing_name())
            && self.max_region_size.map_or(true, |max| region.size() <= max)
    }

    pub fn scan(&self, reader: &dyn MemoryReader, pattern: &Pattern, max_results: usize) -> Vec<Address> {
        self.scan_with(reader, pattern, &ScanOptions::new(max_results))
    }

    /// Addresses of up to `options.max_results` matches, in region order and
    /// increasing address within a region. Overlapping matches all count.
    pub fn scan_with(&self, reader: &dyn MemoryReader, pattern: &Pattern, options: &ScanOptions) -> Vec<Address> {
        let mut results = Vec::new();
        if options.max_results == 0 {
            return results;
        }

        let _timer = ScopedTimer::new("region scan");
        let matcher = MaskedMatcher::new(pattern);
        let own_storage = Address::from_ptr(pattern.bytes().as_ptr());

        for region in reader.regions() {
            if !self.is_scannable(&region) {
                continue;
            }
            if let Some(segment) = &options.segment {
                if !region.backing_name().contains(segment.as_str()) {
                    continue;
                }
            }
            if reader.is_local() && region.contains(own_storage) {
                continue;
            }
            if region.size() < pattern.len() as u64 {
                continue;
            }

            let data = match reader.read_region(&region) {
                Ok(data) => data,
                Err(e) => {
                    log::trace!("Skipping {}: {}", region.span(), e);
                    continue;
                }
            };
            if data.len() < pattern.len() {
                log::trace!("Short read of {} ({} bytes)", region.span(), data.len());
                continue;
            }

            let mut offset = 0;
            while let Some(found) = matcher.search(&data, offset, options.alignment) {
                results.push(region.start() + found as u64);
                if results.len() >= options.max_results {
                    return results;
                }
                offset = found + 1;
            }
        }

        log::debug!("Pattern {} matched {} time(s)", pattern, results.len());
        results
    }

    pub fn find_first(&self, reader: &dyn MemoryReader, pattern: &Pattern) -> Option<Address> {
        self.scan(reader, pattern, 1).into_iter().next()
    }

    /// Parses IDA-style text and returns its first hit inside mappings whose
    /// name contains `segment` (empty means any mapping).
    pub fn find_pattern(
        &self,
        reader: &dyn MemoryReader,
        query: &str,
        segment: &str,
    ) -> Result<Option<Address>, PatternError> {
        let pattern = Pattern::parse(query)?;
        let mut options = ScanOptions::new(1);
        if !segment.is_empty() {
            options = options.with_segment(segment);
        }
        Ok(self.scan_with(reader, &pattern, &options).into_iter().next())
    }

    /// Scans several patterns concurrently; result `i` belongs to `patterns[i]`.
    pub fn scan_batch(
        &self,
        reader: &dyn MemoryReader,
        patterns: &[Pattern],
        options: &ScanOptions,
    ) -> Vec<Vec<Address>> {
        patterns
            .par_iter()
            .map(|pattern| self.scan_with(reader, pattern, options))
            .collect()
    }

    /// Fire-and-forget bulk write; failures are logged, not reported.
    pub fn write(&self, writer: &dyn MemoryWriter, address: Address, bytes: &[u8]) {
        match writer.write_bytes(address, bytes) {
            Ok(written) if written < bytes.len() => {
                log::debug!("Short write at {}: {}/{} bytes", address, written, bytes.len());
            }
            Ok(_) => {}
            Err(e) => log::debug!("Write at {} failed: {}", address, e),
        }
    }
}

impl Default for RegionScanner {
    fn default() -> Self {
        Self::new()
    }
}
