//! Channel naming convention
//!
//! A channel is four OS-global named objects derived from one base name:
//! the frame segment `N`, the metadata segment `N_md`, the read-semaphore
//! `N_rd` and the write-semaphore `N_wr`. These names are the entire wire
//! contract between producer and consumer.

use crate::error::{ChannelError, Result};

/// POSIX object names are limited to NAME_MAX minus the leading slash,
/// and the longest suffix we append is 3 bytes.
const MAX_BASE_LEN: usize = 254 - 3;

const SUFFIX_METADATA: &str = "_md";
const SUFFIX_READ_SEM: &str = "_rd";
const SUFFIX_WRITE_SEM: &str = "_wr";

/// The four resource names of one channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelNames {
    frame: String,
    metadata: String,
    read_sem: String,
    write_sem: String,
}

impl ChannelNames {
    /// Derive the resource names from a base channel name
    ///
    /// The base name may be given with or without the leading slash POSIX
    /// requires; it is normalized either way.
    pub fn derive(base: &str) -> Result<Self> {
        let base = base.strip_prefix('/').unwrap_or(base);
        if base.len() > MAX_BASE_LEN {
            return Err(ChannelError::NameTooLong {
                max: MAX_BASE_LEN,
                got: base.len(),
            });
        }

        Ok(Self {
            frame: format!("/{}", base),
            metadata: format!("/{}{}", base, SUFFIX_METADATA),
            read_sem: format!("/{}{}", base, SUFFIX_READ_SEM),
            write_sem: format!("/{}{}", base, SUFFIX_WRITE_SEM),
        })
    }

    /// Name of the frame segment
    #[inline]
    pub fn frame(&self) -> &str {
        &self.frame
    }

    /// Name of the metadata segment
    #[inline]
    pub fn metadata(&self) -> &str {
        &self.metadata
    }

    /// Name of the read-semaphore
    #[inline]
    pub fn read_sem(&self) -> &str {
        &self.read_sem
    }

    /// Name of the write-semaphore
    #[inline]
    pub fn write_sem(&self) -> &str {
        &self.write_sem
    }
}
