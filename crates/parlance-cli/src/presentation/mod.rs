//! Shared CLI presentation utilities.
//!
//! Format-only: nothing here touches playback state, it only renders
//! snapshots and reports handed to it.

pub mod progress;

pub use progress::{format_clock, progress_bar, status_line};
