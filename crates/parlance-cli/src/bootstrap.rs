//! CLI bootstrap - the composition root.
//!
//! The only place where the playback service is wired to a concrete audio
//! sink. Handlers receive a running [`PlaybackService`].

use std::path::Path;

use parlance_core::{PlaybackConfig, PlaybackService};

use crate::error::CliError;

/// Bootstrap configuration for the CLI.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub playback: PlaybackConfig,
}

impl CliConfig {
    /// Load from `path` if given, otherwise use defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, CliError> {
        let playback = match path {
            Some(path) => {
                tracing::debug!(path = %path.display(), "Loading playback config");
                PlaybackConfig::from_json_file(path)?
            }
            None => PlaybackConfig::with_defaults(),
        };
        Ok(Self { playback })
    }
}

/// Start the playback service on the default output device.
#[cfg(feature = "local-output")]
pub fn bootstrap(config: CliConfig) -> Result<PlaybackService, CliError> {
    let service = PlaybackService::spawn(config.playback, parlance_core::LocalOutput::spawn)?;
    Ok(service)
}

/// Built without an audio backend: playback is unavailable.
#[cfg(not(feature = "local-output"))]
pub fn bootstrap(config: CliConfig) -> Result<PlaybackService, CliError> {
    config.playback.validate()?;
    Err(CliError::Output(
        "built without the `local-output` feature; rebuild with --features local-output".into(),
    ))
}
