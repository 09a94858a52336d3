//! CLI-specific error types and exit-code mapping.

use parlance_core::{ConfigError, PlaybackError};
use thiserror::Error;

/// CLI-specific error type.
#[derive(Debug, Error)]
pub enum CliError {
    /// Playback engine error.
    #[error("{0}")]
    Playback(String),

    /// No audio output could be opened.
    #[error("Audio output unavailable: {0}")]
    Output(String),

    /// Argument validation error.
    #[error("Invalid arguments: {0}")]
    Arguments(String),

    /// IO error (file not found, permission denied, etc.).
    #[error("IO error: {0}")]
    Io(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl CliError {
    /// Map error to a sysexits-style exit code.
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Playback(_) => 1,
            Self::Arguments(_) => 2, // EX_USAGE
            Self::Output(_) => 69,   // EX_UNAVAILABLE
            Self::Io(_) => 74,       // EX_IOERR
            Self::Config(_) => 78,   // EX_CONFIG
        }
    }
}

impl From<PlaybackError> for CliError {
    fn from(err: PlaybackError) -> Self {
        match err {
            PlaybackError::EngineUnavailable(msg) => Self::Output(msg),
            PlaybackError::AudioThreadDied => Self::Output(PlaybackError::AudioThreadDied.to_string()),
            PlaybackError::Io(e) => Self::Io(e.to_string()),
            PlaybackError::Config(e) => e.into(),
            other => Self::Playback(other.to_string()),
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}
