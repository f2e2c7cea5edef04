//! Named shared-memory frame channel with single-slot ownership handoff.
//!
//! A channel pairs an integer channel id with one fixed-size shared-memory
//! segment (`ChannelFrame_<id>`) holding a single frame slot. The producer
//! process publishes a frame by filling the slot and storing
//! `status = PRODUCED`; the consumer takes it by copying the payload out and
//! storing `status = CONSUMED`. The slot is never locked — correctness rides
//! on that single-writer/single-reader status handoff.
//!
//! On unix the segment is a POSIX shared-memory object (`shm_open`) mapped
//! with `memmap2`; on Windows it is a named file mapping.

pub mod channel;
pub mod error;
pub mod producer;
pub mod segment;

pub use channel::FrameChannel;
pub use error::{ChannelError, Result};
pub use producer::FrameProducer;
pub use segment::{segment_name, Segment};
