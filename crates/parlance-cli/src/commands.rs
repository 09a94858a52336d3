//! Available subcommands.

use std::path::PathBuf;

use clap::{Args, Subcommand};
use parlance_core::source::DEFAULT_CHUNK_SIZE;

#[derive(Subcommand)]
pub enum Commands {
    /// Stream a WAV response to the speakers while it is being read
    Play(PlayArgs),

    /// Normalize a WAV response without playing it and report what was found
    Inspect(InspectArgs),

    /// Print the effective playback configuration as JSON
    Config,
}

#[derive(Debug, Args)]
pub struct PlayArgs {
    /// Response file, or `-` to read from stdin
    pub input: String,

    /// Bytes per read from the input
    #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE)]
    pub chunk_size: usize,

    /// Delay between reads, to emulate a slow network
    #[arg(long, default_value_t = 0)]
    pub chunk_delay_ms: u64,

    /// Length of the synthesized text, for the upfront duration estimate
    #[arg(long, default_value_t = 0)]
    pub text_length: usize,

    /// Speech speed multiplier the response was synthesized at
    #[arg(long, default_value_t = 1.0)]
    pub speed: f64,

    /// Output volume (0.0 - 1.0); overrides the config file
    #[arg(long)]
    pub volume: Option<f32>,

    /// Start playback at this fraction of the clip once the stream is in
    #[arg(long)]
    pub start_at: Option<f64>,

    /// Save everything received as a WAV file when playback ends
    #[arg(long)]
    pub export: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct InspectArgs {
    /// Response file, or `-` to read from stdin
    pub input: String,

    /// Bytes per chunk fed to the normalizer
    #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE)]
    pub chunk_size: usize,

    /// Length of the synthesized text, for comparing against the estimate
    #[arg(long)]
    pub text_length: Option<usize>,

    /// Speech speed multiplier for the estimate
    #[arg(long, default_value_t = 1.0)]
    pub speed: f64,

    /// Write a clean WAV (fresh header with real sizes) here
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}
