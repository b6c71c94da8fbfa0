//! Producer side of the channel
//!
//! The writer owns all four OS resources of a channel: it creates them on
//! `open` and unlinks them when dropped. Publishing hands exactly one frame
//! to the consumer under mutual exclusion enforced by the semaphore pair.

use crate::error::{ChannelError, Result};
use crate::frame::Frame;
use crate::metadata::{FrameMetadata, METADATA_SIZE};
use crate::names::ChannelNames;
use crate::sem::NamedSemaphore;
use crate::shm::ShmSegment;
use std::time::Duration;
use tracing::info;

/// Frame producer attached to one named channel
pub struct FrameWriter {
    names: ChannelNames,
    metadata: ShmSegment,
    frame: Option<ShmSegment>,
    sem_read: NamedSemaphore,
    sem_write: NamedSemaphore,
}

impl FrameWriter {
    /// Create the channel and attach as its producer
    ///
    /// The metadata segment and both semaphores are created here; the frame
    /// segment is created lazily on the first `publish`, once its size is
    /// known. Stale semaphores from a crashed producer are unlinked and
    /// recreated so the channel always starts from write=1 / read=0.
    pub fn open(channel: &str) -> Result<Self> {
        let names = ChannelNames::derive(channel)?;

        let metadata = ShmSegment::create(names.metadata(), METADATA_SIZE)?;
        let sem_read = NamedSemaphore::create(names.read_sem(), 0)?;
        let sem_write = NamedSemaphore::create(names.write_sem(), 1)?;

        info!(channel = names.frame(), "frame writer launched");

        Ok(Self {
            names,
            metadata,
            frame: None,
            sem_read,
            sem_write,
        })
    }

    /// Publish a frame, blocking while the previous one is still being read
    ///
    /// The first publish fixes the frame segment's size; every later frame
    /// must have the same byte length.
    pub fn publish(&mut self, frame: Frame<'_>) -> Result<()> {
        self.check_size(&frame)?;
        self.sem_write.wait()?;
        self.commit(frame)
    }

    /// Like `publish`, but gives up with `AcquireTimeout` if the consumer
    /// does not release the slot within `timeout`. Nothing is written on
    /// expiry.
    pub fn publish_timeout(&mut self, frame: Frame<'_>, timeout: Duration) -> Result<()> {
        self.check_size(&frame)?;
        self.sem_write.wait_timeout(timeout)?;
        self.commit(frame)
    }

    /// Tear the channel down, unlinking all four OS resources
    ///
    /// After this the channel name may be reused by a new producer.
    pub fn close(self) {
        info!(channel = self.names.frame(), "frame writer terminated");
    }

    /// Base name of the frame segment
    pub fn channel(&self) -> &str {
        self.names.frame()
    }

    // Checked before acquiring the write-semaphore so a rejected publish
    // consumes no signal and leaves the previous frame intact.
    fn check_size(&self, frame: &Frame<'_>) -> Result<()> {
        if let Some(seg) = &self.frame {
            if frame.data().len() != seg.size() {
                return Err(ChannelError::FrameSizeMismatch {
                    expected: seg.size(),
                    got: frame.data().len(),
                });
            }
        }
        Ok(())
    }

    fn commit(&mut self, frame: Frame<'_>) -> Result<()> {
        let data = frame.data();

        if self.frame.is_none() {
            self.frame = Some(ShmSegment::create(self.names.frame(), data.len())?);
        }

        let md = FrameMetadata {
            height: frame.height() as i32,
            width: frame.width() as i32,
            channels: frame.channels() as i32,
            size: data.len() as i64,
        };
        self.metadata.as_mut_slice().copy_from_slice(&md.encode());
        if let Some(seg) = self.frame.as_mut() {
            seg.as_mut_slice().copy_from_slice(data);
        }

        self.sem_read.post()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unique(name: &str) -> String {
        format!("{}_{}", name, std::process::id())
    }

    #[test]
    fn test_first_publish_creates_frame_segment() {
        let channel = unique("framechan_wr_first");
        let mut writer = FrameWriter::open(&channel).unwrap();

        let data = [7u8; 12];
        writer.publish(Frame::new(2, 2, 3, &data).unwrap()).unwrap();

        let names = ChannelNames::derive(&channel).unwrap();
        let seg = ShmSegment::open(names.frame()).unwrap();
        assert_eq!(seg.size(), 12);
        assert_eq!(seg.as_slice(), &data);
    }

    #[test]
    fn test_size_mismatch_rejected_before_write() {
        let channel = unique("framechan_wr_mismatch");
        let mut writer = FrameWriter::open(&channel).unwrap();

        let first = [1u8, 2, 3, 4, 5, 6];
        writer
            .publish(Frame::new(2, 3, 1, &first).unwrap())
            .unwrap();

        let bigger = [9u8; 12];
        let err = writer
            .publish(Frame::new(2, 2, 3, &bigger).unwrap())
            .unwrap_err();
        assert!(matches!(
            err,
            ChannelError::FrameSizeMismatch {
                expected: 6,
                got: 12
            }
        ));

        // Previous frame content is untouched
        let names = ChannelNames::derive(&channel).unwrap();
        let seg = ShmSegment::open(names.frame()).unwrap();
        assert_eq!(seg.as_slice(), &first);
    }

    #[test]
    fn test_reopen_after_crashed_producer() {
        let channel = unique("framechan_wr_crash");

        // First producer publishes once and "crashes" without cleanup:
        // read=1, write=0 at this point.
        let mut crashed = FrameWriter::open(&channel).unwrap();
        crashed
            .publish(Frame::new(1, 4, 1, &[0u8; 4]).unwrap())
            .unwrap();
        std::mem::forget(crashed);

        // A fresh producer must come up with canonical initial values and
        // publish without blocking.
        let mut writer = FrameWriter::open(&channel).unwrap();
        writer
            .publish_timeout(
                Frame::new(1, 4, 1, &[1u8; 4]).unwrap(),
                Duration::from_millis(200),
            )
            .unwrap();
    }
}
