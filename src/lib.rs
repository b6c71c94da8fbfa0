//! framechan - Zero-copy shared memory frame channel
//!
//! This library moves image frames between two independent processes
//! through POSIX shared memory, avoiding the per-frame copy-and-serialize
//! cost of a socket or pipe.
//!
//! # Architecture
//!
//! A channel is four OS-global named objects derived from one base name: a
//! fixed metadata segment describing the current frame's shape, a frame
//! segment sized once at the first publish, and a pair of named semaphores
//! that enforce strict alternation between the two roles.
//!
//! - **Producer ([`FrameWriter`])**: creates and later unlinks all four
//!   resources; publishes one frame at a time.
//! - **Consumer ([`FrameReader`])**: attaches by name (polling if the
//!   producer has not started yet) and reads frames without copying.
//!
//! Capacity is exactly one frame: a fast producer blocks until the consumer
//! catches up and vice versa, which is backpressure by construction.

pub mod error;
pub mod frame;
pub mod metadata;
pub mod names;
pub mod reader;
pub mod sem;
pub mod shm;
pub mod writer;

pub use error::{ChannelError, Result};
pub use frame::Frame;
pub use metadata::{FrameMetadata, METADATA_SIZE};
pub use names::ChannelNames;
pub use reader::{FrameReader, RetryPolicy};
pub use writer::FrameWriter;
