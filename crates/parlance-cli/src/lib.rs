//! `parlance` command-line player.
//!
//! Plays a streamed text-to-speech WAV response while it is still being
//! read, or inspects one without an audio device.

pub mod bootstrap;
pub mod commands;
pub mod error;
pub mod handlers;
pub mod parser;
pub mod presentation;

// Re-export primary types for convenient access
pub use bootstrap::{CliConfig, bootstrap};
pub use commands::Commands;
pub use error::CliError;
pub use parser::Cli;
