//! Playback engine error types.

/// Errors that can occur in the playback engine.
#[derive(Debug, thiserror::Error)]
pub enum PlaybackError {
    /// The audio output could not be initialised.
    #[error("Audio engine unavailable: {0}")]
    EngineUnavailable(String),

    /// A pause/seek was requested but nothing has been buffered yet.
    #[error("Nothing to play")]
    NothingToPlay,

    /// The audio sink refused a buffer submission.
    #[error("Audio sink rejected buffer: {0}")]
    SinkRejected(String),

    /// The dedicated audio thread exited unexpectedly.
    #[error("Audio thread died unexpectedly")]
    AudioThreadDied,

    /// The engine task has shut down and no longer accepts commands.
    #[error("Playback service is closed")]
    ServiceClosed,

    /// The inbound chunk source failed mid-stream.
    #[error("Chunk source failed: {0}")]
    Source(String),

    /// IO error (chunk readers, export targets).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Configuration validation and loading errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Pre-roll must be between 0 and 5000 ms, got {0}")]
    InvalidPreRoll(u64),

    #[error("Tick interval must be between 10 and 1000 ms, got {0}")]
    InvalidTickInterval(u64),

    #[error("Characters per second must be a positive number, got {0}")]
    InvalidCharsPerSecond(f64),

    #[error("Volume must be between 0.0 and 1.0, got {0}")]
    InvalidVolume(f32),

    #[error("Failed to read config file: {0}")]
    Read(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] serde_json::Error),
}
