/// Errors raised while decoding or encoding a frame slot.
#[derive(Debug, thiserror::Error)]
pub enum SlotError {
    /// The declared payload size exceeds the slot capacity.
    #[error("frame payload too large ({size} bytes, capacity {capacity})")]
    FrameTooLarge { size: usize, capacity: usize },

    /// The declared payload size is zero or negative.
    #[error("frame payload size must be positive (got {size})")]
    EmptyFrame { size: i64 },

    /// Width or height is zero or negative.
    #[error("invalid frame dimensions ({width}x{height})")]
    InvalidDimensions { width: i32, height: i32 },
}

pub type Result<T> = std::result::Result<T, SlotError>;
