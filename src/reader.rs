//! Consumer side of the channel
//!
//! The reader attaches to a channel that the producer may not have created
//! yet, blocks until a frame is published, and returns a view borrowing the
//! shared mapping directly. It never unlinks the OS resources; dropping a
//! reader only releases its local mappings and handles.

use crate::error::{ChannelError, Result};
use crate::frame::Frame;
use crate::metadata::{FrameMetadata, METADATA_SIZE};
use crate::names::ChannelNames;
use crate::sem::NamedSemaphore;
use crate::shm::ShmSegment;
use std::time::Duration;
use tracing::{error, info, warn};

/// Poll-and-sleep policy for waiting on resources that do not exist yet
///
/// There is no OS notification for "this name now exists", so discovery is
/// a retry loop. The default matches the channel's historical behavior:
/// poll once a second, forever.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Sleep between existence checks
    pub interval: Duration,
    /// Give up after this many failed checks; `None` retries forever
    pub max_attempts: Option<u32>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            max_attempts: None,
        }
    }
}

/// Frame consumer attached to one named channel
pub struct FrameReader {
    names: ChannelNames,
    metadata: ShmSegment,
    frame: Option<ShmSegment>,
    sem_read: NamedSemaphore,
    sem_write: NamedSemaphore,
}

impl FrameReader {
    /// Attach to a channel, polling forever until its resources exist
    pub fn open(channel: &str) -> Result<Self> {
        Self::open_with(channel, RetryPolicy::default())
    }

    /// Attach to a channel with an explicit discovery policy
    ///
    /// The metadata segment and both semaphores are opened here; the frame
    /// segment is mapped lazily on the first `get`, once its size is known
    /// from the metadata.
    pub fn open_with(channel: &str, retry: RetryPolicy) -> Result<Self> {
        let names = ChannelNames::derive(channel)?;

        let metadata = wait_for(&retry, names.metadata(), || {
            ShmSegment::open_sized(names.metadata(), METADATA_SIZE)
        })?;
        let sem_read = wait_for(&retry, names.read_sem(), || {
            NamedSemaphore::open(names.read_sem())
        })?;
        let sem_write = wait_for(&retry, names.write_sem(), || {
            NamedSemaphore::open(names.write_sem())
        })?;

        info!(channel = names.frame(), "frame reader launched");

        Ok(Self {
            names,
            metadata,
            frame: None,
            sem_read,
            sem_write,
        })
    }

    /// Retrieve the next frame, blocking until the producer publishes one
    ///
    /// The returned view borrows the shared mapping; no bytes are copied.
    /// The write slot is released before returning, so the view may be
    /// overwritten by the next publish — callers that keep a frame around
    /// must copy it out first.
    pub fn get(&mut self) -> Result<Frame<'_>> {
        self.sem_read.wait()?;
        self.finish_get()
    }

    /// Like `get`, but gives up with `AcquireTimeout` if nothing is
    /// published within `timeout`
    pub fn get_timeout(&mut self, timeout: Duration) -> Result<Frame<'_>> {
        self.sem_read.wait_timeout(timeout)?;
        self.finish_get()
    }

    /// Detach from the channel, releasing local mappings and handles
    ///
    /// The shared OS objects are left alone; destroying them is the
    /// producer's job.
    pub fn close(self) {
        info!(channel = self.names.frame(), "frame reader terminated");
    }

    /// Base name of the frame segment
    pub fn channel(&self) -> &str {
        self.names.frame()
    }

    fn finish_get(&mut self) -> Result<Frame<'_>> {
        let mut buf = [0u8; METADATA_SIZE];
        buf.copy_from_slice(self.metadata.as_slice());
        let md = FrameMetadata::decode(&buf);
        let size = md.size as usize;

        if self.frame.is_none() {
            let seg = ShmSegment::open_sized(self.names.frame(), size).map_err(|e| {
                if e.is_not_found() {
                    error!(
                        name = self.names.frame(),
                        "frame segment does not exist yet"
                    );
                    ChannelError::FrameUnavailable {
                        name: self.names.frame().to_string(),
                    }
                } else {
                    e
                }
            })?;
            self.frame = Some(seg);
        }

        let seg = match self.frame.as_ref() {
            Some(seg) => seg,
            None => {
                return Err(ChannelError::FrameUnavailable {
                    name: self.names.frame().to_string(),
                })
            }
        };

        // The segment was mapped at the size first observed; a producer
        // publishing a different size afterwards violates the protocol.
        if seg.size() != size {
            return Err(ChannelError::FrameSizeMismatch {
                expected: seg.size(),
                got: size,
            });
        }

        self.sem_write.post()?;

        Frame::new(
            md.height as u32,
            md.width as u32,
            md.channels as u32,
            seg.as_slice(),
        )
    }
}

fn wait_for<T>(
    retry: &RetryPolicy,
    name: &str,
    mut open: impl FnMut() -> Result<T>,
) -> Result<T> {
    let mut attempts = 0u32;
    loop {
        match open() {
            Ok(resource) => return Ok(resource),
            Err(e) if e.is_not_found() => {
                attempts += 1;
                if let Some(max) = retry.max_attempts {
                    if attempts >= max {
                        return Err(ChannelError::ResourceUnavailable {
                            name: name.to_string(),
                            attempts,
                        });
                    }
                }
                warn!(name, "waiting for channel resource");
                std::thread::sleep(retry.interval);
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::FrameWriter;
    use std::thread;

    fn unique(name: &str) -> String {
        format!("{}_{}", name, std::process::id())
    }

    fn fast_retry() -> RetryPolicy {
        RetryPolicy {
            interval: Duration::from_millis(20),
            max_attempts: Some(100),
        }
    }

    #[test]
    fn test_round_trip() {
        let channel = unique("framechan_rt");
        let mut writer = FrameWriter::open(&channel).unwrap();
        let mut reader = FrameReader::open_with(&channel, fast_retry()).unwrap();

        let data = [1u8, 2, 3, 4, 5, 6];
        writer.publish(Frame::new(2, 3, 1, &data).unwrap()).unwrap();

        let frame = reader.get().unwrap();
        assert_eq!(frame.height(), 2);
        assert_eq!(frame.width(), 3);
        assert_eq!(frame.channels(), 1);
        assert_eq!(frame.data(), &data);
    }

    #[test]
    fn test_strict_alternation() {
        let channel = unique("framechan_alt");
        let mut writer = FrameWriter::open(&channel).unwrap();
        let mut reader = FrameReader::open_with(&channel, fast_retry()).unwrap();

        let first = [1u8; 8];
        let second = [2u8; 8];

        writer.publish(Frame::new(2, 4, 1, &first).unwrap()).unwrap();

        // A second publish must block until the frame is read
        assert!(matches!(
            writer.publish_timeout(
                Frame::new(2, 4, 1, &second).unwrap(),
                Duration::from_millis(100)
            ),
            Err(ChannelError::AcquireTimeout)
        ));

        assert_eq!(reader.get().unwrap().data(), &first);

        // Slot is free again
        writer
            .publish_timeout(
                Frame::new(2, 4, 1, &second).unwrap(),
                Duration::from_millis(500),
            )
            .unwrap();
        assert_eq!(reader.get().unwrap().data(), &second);

        // A further get must block until the next publish
        assert!(matches!(
            reader.get_timeout(Duration::from_millis(100)),
            Err(ChannelError::AcquireTimeout)
        ));
    }

    #[test]
    fn test_reader_starts_before_writer() {
        let channel = unique("framechan_order");

        let opener = {
            let channel = channel.clone();
            thread::spawn(move || FrameReader::open_with(&channel, fast_retry()))
        };

        // Let the reader spin on discovery before the channel exists
        thread::sleep(Duration::from_millis(150));

        let mut writer = FrameWriter::open(&channel).unwrap();
        let mut reader = opener.join().unwrap().unwrap();

        let data = [5u8; 4];
        writer.publish(Frame::new(1, 4, 1, &data).unwrap()).unwrap();
        assert_eq!(reader.get().unwrap().data(), &data);
    }

    #[test]
    fn test_open_gives_up_after_retry_budget() {
        let channel = unique("framechan_absent");
        let retry = RetryPolicy {
            interval: Duration::from_millis(10),
            max_attempts: Some(3),
        };

        assert!(matches!(
            FrameReader::open_with(&channel, retry),
            Err(ChannelError::ResourceUnavailable { attempts: 3, .. })
        ));
    }

    #[test]
    fn test_frame_unavailable_when_segment_missing() {
        let channel = unique("framechan_nofr");
        let writer = FrameWriter::open(&channel).unwrap();
        let mut reader = FrameReader::open_with(&channel, fast_retry()).unwrap();

        // Signal readability without ever publishing: the frame segment
        // does not exist, which the reader must surface as transient.
        let names = ChannelNames::derive(&channel).unwrap();
        let sem = NamedSemaphore::open(names.read_sem()).unwrap();
        sem.post().unwrap();

        assert!(matches!(
            reader.get(),
            Err(ChannelError::FrameUnavailable { .. })
        ));
        drop(writer);
    }

    #[test]
    fn test_reader_close_after_writer_teardown() {
        let channel = unique("framechan_teardown");
        let mut writer = FrameWriter::open(&channel).unwrap();
        let mut reader = FrameReader::open_with(&channel, fast_retry()).unwrap();

        writer.publish(Frame::new(1, 4, 1, &[3u8; 4]).unwrap()).unwrap();
        reader.get().unwrap();

        // Producer unlinks everything; the reader's mappings stay valid and
        // its close must not try to unlink anything.
        writer.close();
        reader.close();

        // The channel name is gone from the OS namespace
        let names = ChannelNames::derive(&channel).unwrap();
        assert!(ShmSegment::open(names.metadata()).is_err());
        assert!(NamedSemaphore::open(names.read_sem()).is_err());
    }
}
