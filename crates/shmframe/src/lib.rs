//! Shared-memory frame exchange with detection callback dispatch.
//!
//! A producer process hands video frames to this crate's poll loop through
//! a named single-slot shared-memory segment; frames that a pluggable
//! detection stage flags are delivered synchronously to the registered host
//! callback. Data flows one direction — channel, poller, detection stage,
//! dispatcher, host — and configuration flows the other way.
//!
//! # Crate Structure
//!
//! - [`codec`] — fixed-offset frame slot layout
//! - [`channel`] — named segment mapping and the ownership handoff
//! - [`detect`] — the pluggable detection stage boundary
//! - [`dispatch`] — callback registration and synchronous delivery
//! - [`poller`] — the fixed-cadence poll/detect/dispatch loop
//! - [`engine`] — lifecycle: start, configure, shut down

pub mod detect;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod poller;
pub mod settings;

/// Re-export slot layout types.
pub mod codec {
    pub use shmframe_codec::*;
}

/// Re-export channel types.
pub mod channel {
    pub use shmframe_channel::*;
}

pub use detect::{DetectionError, DetectionResult, DetectionStage, IntervalStage, Roi};
pub use dispatch::{CallbackDispatcher, FrameEvent, FrameSink};
pub use engine::Engine;
pub use error::EngineError;
pub use poller::DEFAULT_POLL_INTERVAL;
pub use settings::{AnalyticsSettings, SettingsError, TuningPair};
