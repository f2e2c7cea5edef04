//! Fixed-offset frame slot layout for shared-memory frame exchange.
//!
//! A frame channel is a single named shared-memory segment holding exactly
//! one slot: sentinel-bracketed header fields followed by a fixed-capacity
//! payload buffer. Producer and consumer take turns owning the payload via
//! the three-state `status` field. This crate defines the byte layout and
//! (de)serializes it by explicit offset and width — never by casting the
//! mapping onto a native struct, so host-language alignment rules cannot
//! skew the wire contract.

pub mod error;
pub mod slot;

pub use error::{Result, SlotError};
pub use slot::{
    decode_frame, encode_frame, read_status, reset_slot, sentinels_valid, write_status,
    FrameSnapshot, SlotStatus, FOOTER_OFFSET, FOOTER_SENTINEL, HEADER_OFFSET, HEADER_SENTINEL,
    HEIGHT_OFFSET, MAX_FRAME_HEIGHT, MAX_FRAME_WIDTH, PAYLOAD_CAPACITY, PAYLOAD_OFFSET,
    SIZE_OFFSET, SLOT_SIZE, STATUS_OFFSET, TIMESTAMP_OFFSET, WIDTH_OFFSET,
};
