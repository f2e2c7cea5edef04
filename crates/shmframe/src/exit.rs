use std::fmt;
use std::io;

use shmframe::channel::ChannelError;
use shmframe::EngineError;

// Exit codes kept stable for scripting; 64+ follow BSD sysexits.
pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const CHANNEL_ERROR: i32 = 3;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::PermissionDenied => FAILURE,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        io::ErrorKind::NotFound => FAILURE,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn channel_error(context: &str, err: ChannelError) -> CliError {
    match err {
        ChannelError::Create { source, .. } | ChannelError::Map { source, .. } => {
            io_error(context, source)
        }
        ChannelError::NotYetAvailable { .. } => {
            CliError::new(CHANNEL_ERROR, format!("{context}: {err}"))
        }
        ChannelError::SizeMismatch { .. } | ChannelError::Slot(_) => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
    }
}

pub fn engine_error(context: &str, err: EngineError) -> CliError {
    match err {
        EngineError::Spawn(source) => io_error(context, source),
        EngineError::Settings(_) => CliError::new(DATA_INVALID, format!("{context}: {err}")),
        EngineError::AlreadyStarted => CliError::new(USAGE, format!("{context}: {err}")),
        EngineError::ShutdownFailed => CliError::new(INTERNAL, format!("{context}: {err}")),
    }
}
