//! Error types for framechan

use std::io;
use thiserror::Error;

/// Result type for framechan operations
pub type Result<T> = std::result::Result<T, ChannelError>;

/// Errors that can occur on a frame channel
#[derive(Debug, Error)]
pub enum ChannelError {
    /// Failed to create a shared memory segment
    #[error("Failed to create shared memory '{name}': {source}")]
    ShmCreate {
        name: String,
        #[source]
        source: io::Error,
    },

    /// Failed to open a shared memory segment
    #[error("Failed to open shared memory '{name}': {source}")]
    ShmOpen {
        name: String,
        #[source]
        source: io::Error,
    },

    /// Failed to map memory
    #[error("Failed to map memory: {0}")]
    Mmap(#[source] io::Error),

    /// Failed to truncate shared memory
    #[error("Failed to set shared memory size: {0}")]
    Truncate(#[source] io::Error),

    /// Failed to create a named semaphore
    #[error("Failed to create semaphore '{name}': {source}")]
    SemCreate {
        name: String,
        #[source]
        source: io::Error,
    },

    /// Failed to open a named semaphore
    #[error("Failed to open semaphore '{name}': {source}")]
    SemOpen {
        name: String,
        #[source]
        source: io::Error,
    },

    /// Semaphore acquire failed
    #[error("Semaphore wait failed: {0}")]
    SemWait(#[source] io::Error),

    /// Semaphore release failed
    #[error("Semaphore post failed: {0}")]
    SemPost(#[source] io::Error),

    /// Timed semaphore acquire expired before the peer signaled
    #[error("Timed out waiting for the peer")]
    AcquireTimeout,

    /// Channel resources did not appear within the retry budget
    #[error("Channel '{name}' not available after {attempts} attempts")]
    ResourceUnavailable { name: String, attempts: u32 },

    /// Read was signaled but the frame segment does not exist yet
    #[error("Frame segment '{name}' does not exist")]
    FrameUnavailable { name: String },

    /// Frame byte length differs from the fixed segment size
    #[error("Frame size mismatch: segment holds {expected} bytes, got {got}")]
    FrameSizeMismatch { expected: usize, got: usize },

    /// Frame dimensions disagree with the buffer length
    #[error("Frame shape {height}x{width}x{channels} does not match {len} bytes")]
    ShapeMismatch {
        height: u32,
        width: u32,
        channels: u32,
        len: usize,
    },

    /// Channel name too long for a POSIX object name
    #[error("Channel name too long: max {max} chars, got {got}")]
    NameTooLong { max: usize, got: usize },
}

impl ChannelError {
    /// True when an open failed only because the named object does not
    /// exist yet, which the consumer treats as "keep polling".
    pub(crate) fn is_not_found(&self) -> bool {
        match self {
            Self::ShmOpen { source, .. } | Self::SemOpen { source, .. } => {
                source.raw_os_error() == Some(libc::ENOENT)
            }
            _ => false,
        }
    }
}
