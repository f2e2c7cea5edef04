use crate::settings::SettingsError;

/// Errors surfaced by the engine lifecycle operations.
///
/// Nothing inside the poll loop is fatal — malformed slots and stage
/// failures are logged and polling continues — so this enum only covers the
/// caller-facing boundary.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// `initialize` was called on an engine whose poller already started.
    #[error("engine already started")]
    AlreadyStarted,

    /// The poll thread could not be spawned.
    #[error("failed to spawn poll thread: {0}")]
    Spawn(#[source] std::io::Error),

    /// The supplied analytics settings are out of range.
    #[error("invalid analytics settings: {0}")]
    Settings(#[from] SettingsError),

    /// The poll thread terminated abnormally during shutdown.
    #[error("poll thread terminated abnormally")]
    ShutdownFailed,
}

pub type Result<T> = std::result::Result<T, EngineError>;
