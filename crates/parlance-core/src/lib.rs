//! Streaming PCM playback for text-to-speech responses.
//!
//! A synthesis response arrives as a WAV byte stream (44-byte header, then
//! mono 16-bit little-endian PCM at 24 kHz) split into arbitrary network
//! chunks. This crate plays it back while it is still arriving:
//!
//! ```text
//! chunks ─▶ ChunkNormalizer ─▶ AccumulationBuffer ─▶ PlaybackScheduler ─▶ AudioSink
//!                                     │                      ▲                 │
//!                                     ▼                      │ seek            │ completions,
//!                               export / seek ───────────────┘                 │ render clock
//!                                                                               ▼
//!                                              StreamEngine ◀── ClockTracker ◀──┘
//! ```
//!
//! [`StreamEngine`] is the synchronous state machine; [`PlaybackService`]
//! runs it on a tokio task and exposes a cloneable [`PlaybackHandle`].

pub mod buffer;
pub mod clock;
pub mod config;
pub mod duration;
pub mod engine;
pub mod error;
pub mod format;
pub mod normalizer;
pub mod scheduler;
pub mod service;
pub mod sink;
pub mod source;

#[cfg(feature = "local-output")]
pub mod audio_thread;
#[cfg(feature = "local-output")]
pub mod output;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use config::PlaybackConfig;
pub use engine::{Phase, PlaybackEvent, PlaybackSnapshot, StreamEngine};
pub use error::{ConfigError, PlaybackError};
pub use service::{PlaybackHandle, PlaybackService};
pub use sink::{AudioSink, BufferHandle, CompletionSender};
pub use source::{ChannelSource, ChunkSource, ReaderSource, stream_into};

#[cfg(feature = "local-output")]
pub use audio_thread::LocalOutput;
