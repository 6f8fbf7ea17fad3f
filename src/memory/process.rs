// Tue Jan 13 2026 - Alex

use crate::memory::{Address, MemoryError, MemoryReader, MemoryRegion, MemoryWriter};
use libc::pid_t;
use std::borrow::Cow;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;

/// A process whose address space is read through `/proc/<pid>/maps` and
/// `process_vm_readv`/`process_vm_writev`.
///
/// The handle never owns the target: nothing here starts, stops or waits
/// on it. If the process exits, enumeration yields no regions and reads
/// fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessMemory {
    pid: pid_t,
    local: bool,
}

impl ProcessMemory {
    pub fn attach(pid: pid_t) -> Result<Self, MemoryError> {
        if !PathBuf::from(format!("/proc/{}", pid)).exists() {
            return Err(MemoryError::ProcessNotFound(pid));
        }
        Ok(Self {
            pid,
            local: pid == current_pid(),
        })
    }

    pub fn current() -> Self {
        Self {
            pid: current_pid(),
            local: true,
        }
    }

    pub fn pid(&self) -> pid_t {
        self.pid
    }

    pub fn maps_path(&self) -> PathBuf {
        PathBuf::from(format!("/proc/{}/maps", self.pid))
    }

    pub fn enumerate_regions(&self) -> Result<Vec<MemoryRegion>, MemoryError> {
        let file = File::open(self.maps_path())?;
        let mut regions = Vec::new();

        for line in BufReader::new(file).lines() {
            let line = line?;
            if line.is_empty() {
                continue;
            }
            match MemoryRegion::parse_maps_line(&line) {
                Ok(region) => regions.push(region),
                Err(e) => log::trace!("pid {}: {}", self.pid, e),
            }
        }

        Ok(regions)
    }

    /// Makes the page holding `address` readable, writable and executable.
    /// Only meaningful for the current process.
    pub fn unprotect(&self, address: Address) -> Result<(), MemoryError> {
        if !self.local {
            return Err(MemoryError::NotSupported(format!(
                "mprotect on foreign process {}",
                self.pid
            )));
        }
        sys::unprotect_page(address)
    }
}

impl MemoryReader for ProcessMemory {
    fn regions(&self) -> Vec<MemoryRegion> {
        match self.enumerate_regions() {
            Ok(regions) => regions,
            Err(e) => {
                log::debug!("Could not enumerate regions of pid {}: {}", self.pid, e);
                Vec::new()
            }
        }
    }

    /// Copies up to `len` bytes out of the target. A buffer that cannot be
    /// allocated is reported as `AllocationFailed` instead of aborting.
    fn read_bytes(&self, addr: Address, len: usize) -> Result<Cow<'_, [u8]>, MemoryError> {
        let mut buffer: Vec<u8> = Vec::new();
        buffer
            .try_reserve_exact(len)
            .map_err(|_| MemoryError::AllocationFailed(len))?;
        let read = sys::read_remote(self.pid, addr, &mut buffer.spare_capacity_mut()[..len])?;
        // SAFETY: the kernel initialized the first `read` bytes of the spare
        // capacity, and `read <= len <= capacity`.
        unsafe { buffer.set_len(read.min(len)) };
        Ok(Cow::Owned(buffer))
    }

    fn read_region(&self, region: &MemoryRegion) -> Result<Cow<'_, [u8]>, MemoryError> {
        if self.local && region.is_readable() {
            // SAFETY: the region comes from this process's own map and is
            // readable. A concurrent munmap by another thread is the caller's
            // hazard, same as for any snapshot of the map.
            let bytes = unsafe { sys::local_slice(region.start(), region.size() as usize) };
            return Ok(Cow::Borrowed(bytes));
        }
        self.read_bytes(region.start(), region.size() as usize)
    }

    fn is_local(&self) -> bool {
        self.local
    }
}

impl MemoryWriter for ProcessMemory {
    fn write_bytes(&self, addr: Address, data: &[u8]) -> Result<usize, MemoryError> {
        sys::write_remote(self.pid, addr, data)
    }
}

pub fn current_pid() -> pid_t {
    std::process::id() as pid_t
}

#[cfg(target_os = "linux")]
mod sys {
    use crate::memory::{Address, MemoryError};
    use libc::{c_void, iovec, pid_t};
    use std::mem::MaybeUninit;

    pub fn read_remote(pid: pid_t, addr: Address, buffer: &mut [MaybeUninit<u8>]) -> Result<usize, MemoryError> {
        if buffer.is_empty() {
            return Ok(0);
        }
        let local = iovec {
            iov_base: buffer.as_mut_ptr() as *mut c_void,
            iov_len: buffer.len(),
        };
        let remote = iovec {
            iov_base: addr.as_usize() as *mut c_void,
            iov_len: buffer.len(),
        };
        let read = unsafe { libc::process_vm_readv(pid, &local, 1, &remote, 1, 0) };
        if read < 0 {
            log::trace!(
                "process_vm_readv({}, {}) failed: {}",
                pid,
                addr,
                std::io::Error::last_os_error()
            );
            return Err(MemoryError::ReadFailed(addr.as_u64()));
        }
        Ok(read as usize)
    }

    pub fn write_remote(pid: pid_t, addr: Address, data: &[u8]) -> Result<usize, MemoryError> {
        if data.is_empty() {
            return Ok(0);
        }
        let local = iovec {
            iov_base: data.as_ptr() as *mut c_void,
            iov_len: data.len(),
        };
        let remote = iovec {
            iov_base: addr.as_usize() as *mut c_void,
            iov_len: data.len(),
        };
        let written = unsafe { libc::process_vm_writev(pid, &local, 1, &remote, 1, 0) };
        if written < 0 {
            return Err(MemoryError::WriteFailed(addr.as_u64()));
        }
        Ok(written as usize)
    }

    /// # Safety
    ///
    /// `[addr, addr + len)` must be mapped readable in this process for the
    /// lifetime of the returned slice.
    pub unsafe fn local_slice<'a>(addr: Address, len: usize) -> &'a [u8] {
        std::slice::from_raw_parts(addr.as_usize() as *const u8, len)
    }

    pub fn unprotect_page(address: Address) -> Result<(), MemoryError> {
        let page_size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
        if page_size <= 0 {
            return Err(MemoryError::Io(std::io::Error::last_os_error()));
        }
        let page = address.align_down(page_size as usize);
        let result = unsafe {
            libc::mprotect(
                page.as_usize() as *mut c_void,
                page_size as usize,
                libc::PROT_READ | libc::PROT_WRITE | libc::PROT_EXEC,
            )
        };
        if result != 0 {
            return Err(MemoryError::PermissionDenied(format!(
                "mprotect({}): {}",
                page,
                std::io::Error::last_os_error()
            )));
        }
        Ok(())
    }
}

#[cfg(not(target_os = "linux"))]
mod sys {
    use crate::memory::{Address, MemoryError};
    use libc::pid_t;
    use std::mem::MaybeUninit;

    pub fn read_remote(_pid: pid_t, addr: Address, _buffer: &mut [MaybeUninit<u8>]) -> Result<usize, MemoryError> {
        Err(MemoryError::ReadFailed(addr.as_u64()))
    }

    pub fn write_remote(_pid: pid_t, addr: Address, _data: &[u8]) -> Result<usize, MemoryError> {
        Err(MemoryError::WriteFailed(addr.as_u64()))
    }

    pub unsafe fn local_slice<'a>(addr: Address, len: usize) -> &'a [u8] {
        std::slice::from_raw_parts(addr.as_usize() as *const u8, len)
    }

    pub fn unprotect_page(_address: Address) -> Result<(), MemoryError> {
        Err(MemoryError::NotSupported("mprotect".to_string()))
    }
}
