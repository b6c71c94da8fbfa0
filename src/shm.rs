//! Low-level POSIX shared memory operations

use crate::error::{ChannelError, Result};
use rustix::fd::OwnedFd;
use rustix::fs::ftruncate;
use rustix::mm::{mmap, munmap, MapFlags, ProtFlags};
use rustix::shm::{shm_open, shm_unlink, Mode, ShmOFlags};
use std::ffi::CString;
use std::ptr::NonNull;

/// Handle to a mapped shared memory segment
///
/// The creating side owns the segment and unlinks it from the OS namespace
/// on drop; an opening side only unmaps its local mapping.
pub struct ShmSegment {
    #[allow(dead_code)]
    fd: OwnedFd,
    addr: NonNull<u8>,
    size: usize,
    name: String,
    is_owner: bool,
}

// SAFETY: ShmSegment can be safely shared between threads
// Access to the mapped region is serialized by the channel's semaphores
unsafe impl Send for ShmSegment {}
unsafe impl Sync for ShmSegment {}

impl ShmSegment {
    /// Create a shared memory segment of the given size
    ///
    /// Tries exclusive creation first and falls back to opening an existing
    /// segment (e.g. left over from a crashed producer), then truncates it
    /// to the requested size either way.
    pub fn create(name: &str, size: usize) -> Result<Self> {
        let c_name = c_name(name);

        let fd = match shm_open(
            c_name.as_c_str(),
            ShmOFlags::CREATE | ShmOFlags::EXCL | ShmOFlags::RDWR,
            Mode::RUSR | Mode::WUSR | Mode::RGRP | Mode::WGRP | Mode::ROTH | Mode::WOTH,
        ) {
            Ok(fd) => fd,
            Err(_) => {
                // Already exists, reuse it
                shm_open(c_name.as_c_str(), ShmOFlags::RDWR, Mode::empty()).map_err(|e| {
                    ChannelError::ShmCreate {
                        name: name.to_string(),
                        source: e.into(),
                    }
                })?
            }
        };

        ftruncate(&fd, size as u64).map_err(|e| ChannelError::Truncate(e.into()))?;

        let addr = map(&fd, size)?;

        // Zero initialize so a reused stale segment never leaks old bytes
        unsafe {
            std::ptr::write_bytes(addr.as_ptr(), 0, size);
        }

        Ok(Self {
            fd,
            addr,
            size,
            name: name.to_string(),
            is_owner: true,
        })
    }

    /// Open an existing segment, taking the size from the OS
    pub fn open(name: &str) -> Result<Self> {
        let c_name = c_name(name);

        let fd = open_rdwr(&c_name, name)?;
        let stat = rustix::fs::fstat(&fd).map_err(|e| ChannelError::ShmOpen {
            name: name.to_string(),
            source: e.into(),
        })?;

        Self::finish_open(fd, stat.st_size as usize, name)
    }

    /// Open an existing segment and map exactly `size` bytes of it
    ///
    /// Fails if the underlying object is smaller than `size`, which would
    /// otherwise fault on access.
    pub fn open_sized(name: &str, size: usize) -> Result<Self> {
        let c_name = c_name(name);

        let fd = open_rdwr(&c_name, name)?;
        let stat = rustix::fs::fstat(&fd).map_err(|e| ChannelError::ShmOpen {
            name: name.to_string(),
            source: e.into(),
        })?;
        if (stat.st_size as usize) < size {
            return Err(ChannelError::FrameSizeMismatch {
                expected: size,
                got: stat.st_size as usize,
            });
        }

        Self::finish_open(fd, size, name)
    }

    fn finish_open(fd: OwnedFd, size: usize, name: &str) -> Result<Self> {
        let addr = map(&fd, size)?;

        Ok(Self {
            fd,
            addr,
            size,
            name: name.to_string(),
            is_owner: false,
        })
    }

    /// View the whole mapping as bytes
    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        unsafe { std::slice::from_raw_parts(self.addr.as_ptr(), self.size) }
    }

    /// View the whole mapping as mutable bytes
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        unsafe { std::slice::from_raw_parts_mut(self.addr.as_ptr(), self.size) }
    }

    /// Size of the mapping in bytes
    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Name of the segment
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Check if this handle owns the segment
    #[inline]
    pub fn is_owner(&self) -> bool {
        self.is_owner
    }
}

impl Drop for ShmSegment {
    fn drop(&mut self) {
        unsafe {
            let _ = munmap(self.addr.as_ptr().cast(), self.size);
        }

        // Only the creating side removes the name from the OS namespace
        if self.is_owner {
            let _ = shm_unlink(c_name(&self.name).as_c_str());
        }
    }
}

fn c_name(name: &str) -> CString {
    CString::new(name).expect("segment name contains NUL")
}

fn open_rdwr(c_name: &CString, name: &str) -> Result<OwnedFd> {
    shm_open(c_name.as_c_str(), ShmOFlags::RDWR, Mode::empty()).map_err(|e| {
        ChannelError::ShmOpen {
            name: name.to_string(),
            source: e.into(),
        }
    })
}

fn map(fd: &OwnedFd, size: usize) -> Result<NonNull<u8>> {
    let addr = unsafe {
        mmap(
            std::ptr::null_mut(),
            size,
            ProtFlags::READ | ProtFlags::WRITE,
            MapFlags::SHARED,
            fd,
            0,
        )
        .map_err(|e| ChannelError::Mmap(e.into()))?
    };

    Ok(NonNull::new(addr.cast::<u8>()).expect("mmap returned null"))
}
