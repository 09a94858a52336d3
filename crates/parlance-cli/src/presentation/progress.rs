//! Progress line rendering for the `play` command.

use std::time::Duration;

use parlance_core::{Phase, PlaybackSnapshot};

/// Width of the progress bar in characters.
pub const BAR_WIDTH: usize = 30;

/// `m:ss` clock text.
pub fn format_clock(time: Duration) -> String {
    let secs = time.as_secs();
    format!("{}:{:02}", secs / 60, secs % 60)
}

/// `[#####-----]` bar for `progress` in `[0, 1]`.
pub fn progress_bar(progress: f64, width: usize) -> String {
    let filled = ((progress.clamp(0.0, 1.0) * width as f64).round() as usize).min(width);
    format!("[{}{}]", "#".repeat(filled), "-".repeat(width - filled))
}

const fn phase_label(phase: Phase) -> &'static str {
    match phase {
        Phase::Idle => "idle",
        Phase::Buffering => "buffering",
        Phase::Playing => "playing",
        Phase::Paused => "paused",
        Phase::Seeking => "seeking",
        Phase::Draining => "draining",
        Phase::Finished => "finished",
    }
}

/// One-line summary of a snapshot, e.g.
/// `playing   [######--------] 0:03 / 0:12`.
pub fn status_line(snapshot: &PlaybackSnapshot) -> String {
    let mut line = format!(
        "{:<9} {} {} / {}",
        phase_label(snapshot.phase),
        progress_bar(snapshot.progress, BAR_WIDTH),
        format_clock(snapshot.current_time),
        format_clock(snapshot.duration),
    );
    if let Some(status) = &snapshot.status {
        line.push_str("  ");
        line.push_str(status);
    }
    line
}
