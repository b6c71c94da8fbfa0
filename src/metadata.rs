//! Metadata Record describing the frame currently in shared memory
//!
//! The record is a fixed 24-byte binary layout, interpreted byte-for-byte
//! identically by producer and consumer: three 32-bit signed integers
//! (height, width, channels) at offsets 0/4/8 and one 64-bit signed integer
//! (payload byte length) at offset 16, native endian. The 4 bytes at offset
//! 12 are alignment padding and always zero. This record is the single
//! source of truth for how to reinterpret the frame segment's bytes.

/// Serialized size of one Metadata Record
pub const METADATA_SIZE: usize = 24;

const OFFSET_HEIGHT: usize = 0;
const OFFSET_WIDTH: usize = 4;
const OFFSET_CHANNELS: usize = 8;
const OFFSET_SIZE: usize = 16;

/// Shape and byte length of the current frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameMetadata {
    pub height: i32,
    pub width: i32,
    pub channels: i32,
    pub size: i64,
}

impl FrameMetadata {
    /// Serialize into a stack-local record buffer
    pub fn encode(&self) -> [u8; METADATA_SIZE] {
        let mut buf = [0u8; METADATA_SIZE];
        buf[OFFSET_HEIGHT..OFFSET_HEIGHT + 4].copy_from_slice(&self.height.to_ne_bytes());
        buf[OFFSET_WIDTH..OFFSET_WIDTH + 4].copy_from_slice(&self.width.to_ne_bytes());
        buf[OFFSET_CHANNELS..OFFSET_CHANNELS + 4].copy_from_slice(&self.channels.to_ne_bytes());
        buf[OFFSET_SIZE..OFFSET_SIZE + 8].copy_from_slice(&self.size.to_ne_bytes());
        buf
    }

    /// Deserialize from a record buffer
    pub fn decode(buf: &[u8; METADATA_SIZE]) -> Self {
        let field_i32 = |offset: usize| {
            let mut raw = [0u8; 4];
            raw.copy_from_slice(&buf[offset..offset + 4]);
            i32::from_ne_bytes(raw)
        };
        let mut raw = [0u8; 8];
        raw.copy_from_slice(&buf[OFFSET_SIZE..OFFSET_SIZE + 8]);

        Self {
            height: field_i32(OFFSET_HEIGHT),
            width: field_i32(OFFSET_WIDTH),
            channels: field_i32(OFFSET_CHANNELS),
            size: i64::from_ne_bytes(raw),
        }
    }
}
