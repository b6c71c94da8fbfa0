//! Borrowed frame view
//!
//! The same shape is used on both sides of the channel: the producer hands
//! one to `publish`, the consumer gets one back from `get`, borrowing the
//! shared mapping directly.

use crate::error::{ChannelError, Result};

/// A `height x width x channels` array of 8-bit samples, borrowed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame<'a> {
    height: u32,
    width: u32,
    channels: u32,
    data: &'a [u8],
}

impl<'a> Frame<'a> {
    /// Build a frame view, validating that the dimensions account for
    /// every byte of the buffer (one byte per sample).
    pub fn new(height: u32, width: u32, channels: u32, data: &'a [u8]) -> Result<Self> {
        let expected = height as usize * width as usize * channels as usize;
        if expected != data.len() || expected == 0 {
            return Err(ChannelError::ShapeMismatch {
                height,
                width,
                channels,
                len: data.len(),
            });
        }

        Ok(Self {
            height,
            width,
            channels,
            data,
        })
    }

    /// Frame rows
    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Frame columns
    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Samples per pixel
    #[inline]
    pub fn channels(&self) -> u32 {
        self.channels
    }

    /// Raw frame bytes, row-major
    #[inline]
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// One row of pixels
    pub fn row(&self, y: u32) -> Option<&'a [u8]> {
        if y >= self.height {
            return None;
        }
        let stride = self.width as usize * self.channels as usize;
        let start = y as usize * stride;
        Some(&self.data[start..start + stride])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_validates_shape() {
        let data = [0u8; 12];
        assert!(Frame::new(2, 2, 3, &data).is_ok());
        assert!(matches!(
            Frame::new(2, 2, 2, &data),
            Err(ChannelError::ShapeMismatch { len: 12, .. })
        ));
        assert!(Frame::new(0, 0, 0, &[]).is_err());
    }

    #[test]
    fn test_row_access() {
        let data: Vec<u8> = (0..12).collect();
        let frame = Frame::new(2, 2, 3, &data).unwrap();
        assert_eq!(frame.row(0).unwrap(), &data[..6]);
        assert_eq!(frame.row(1).unwrap(), &data[6..]);
        assert!(frame.row(2).is_none());
    }
}
