use shmframe_codec::SlotError;

/// Errors that can occur on a shared-memory frame channel.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    /// The segment does not exist yet. Retryable: the producer may simply
    /// not have started.
    #[error("shared memory segment {name:?} not yet available")]
    NotYetAvailable { name: String },

    /// Failed to create the segment.
    #[error("failed to create segment {name:?}: {source}")]
    Create {
        name: String,
        source: std::io::Error,
    },

    /// Failed to open or map the segment.
    #[error("failed to map segment {name:?}: {source}")]
    Map {
        name: String,
        source: std::io::Error,
    },

    /// The segment exists but its size does not match the slot layout.
    #[error("segment {name:?} has size {actual} bytes, expected {expected}")]
    SizeMismatch {
        name: String,
        actual: usize,
        expected: usize,
    },

    /// The slot holds a malformed frame (bad size or dimensions).
    #[error("malformed frame slot: {0}")]
    Slot(#[from] SlotError),
}

impl ChannelError {
    /// True for errors that are expected during producer startup and should
    /// be retried rather than reported.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ChannelError::NotYetAvailable { .. })
    }
}

pub type Result<T> = std::result::Result<T, ChannelError>;
