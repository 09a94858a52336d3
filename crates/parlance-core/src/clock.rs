//! Playback position derived from the sink's render clock.
//!
//! Wall-clock timing drifts from what is actually audible whenever the
//! output stalls (buffer underrun, device hiccup, scheduler jitter). The
//! render clock only advances while frames are really pulled by the device,
//! so position is computed against it:
//!
//! ```text
//! current = paused_total + (render_now - anchor)   while running
//! current = paused_total                           while paused
//! ```

use std::time::Duration;

/// Published position values.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ClockReading {
    pub current_time: Duration,
    pub progress: f64,
}

/// Position tracker for one stream.
#[derive(Debug, Default)]
pub struct ClockTracker {
    /// Render-clock reading at the last (re-)anchor.
    anchor: Duration,

    /// Position accumulated before the current anchor.
    paused_total: Duration,

    /// Whether the render clock is currently being followed.
    running: bool,

    /// Set while the user drags a seek control.
    dragging: bool,

    /// Last published values.
    published: ClockReading,
}

impl ClockTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin following the render clock from position zero.
    pub fn start(&mut self, render_now: Duration) {
        self.anchor = render_now;
        self.paused_total = Duration::ZERO;
        self.running = true;
    }

    /// Freeze the position. No-op if not running.
    pub fn pause(&mut self, render_now: Duration) {
        if !self.running {
            return;
        }
        self.paused_total += render_now.saturating_sub(self.anchor);
        self.running = false;
        self.published.current_time = self.paused_total;
    }

    /// Continue from the frozen position.
    pub fn resume(&mut self, render_now: Duration) {
        self.anchor = render_now;
        self.running = true;
    }

    /// Jump to `position` and follow the render clock from there.
    pub fn reanchor(&mut self, position: Duration, render_now: Duration, total: Duration) {
        self.anchor = render_now;
        self.paused_total = position;
        self.running = true;
        self.published.current_time = position;
        if !self.dragging {
            self.published.progress = progress(position, total);
        }
    }

    /// Position right now, without publishing it.
    pub fn position(&self, render_now: Duration) -> Duration {
        if self.running {
            self.paused_total + render_now.saturating_sub(self.anchor)
        } else {
            self.paused_total
        }
    }

    /// Sample the clock and publish the reading.
    ///
    /// Progress is left untouched while dragging so the scrubber does not
    /// fight the user's gesture.
    pub fn sample(&mut self, render_now: Duration, total: Duration) -> ClockReading {
        let current = self.position(render_now).min(total);
        self.published.current_time = current;
        if !self.dragging {
            self.published.progress = progress(current, total);
        }
        self.published
    }

    pub const fn published(&self) -> ClockReading {
        self.published
    }

    pub const fn is_dragging(&self) -> bool {
        self.dragging
    }

    pub const fn set_dragging(&mut self, dragging: bool) {
        self.dragging = dragging;
    }

    /// Stop following the render clock and zero every reading.
    pub fn reset(&mut self) {
        let dragging = self.dragging;
        *self = Self::default();
        self.dragging = dragging;
    }
}

fn progress(current: Duration, total: Duration) -> f64 {
    if total.is_zero() {
        return 0.0;
    }
    (current.as_secs_f64() / total.as_secs_f64()).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOTAL: Duration = Duration::from_secs(10);

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[test]
    fn follows_render_clock_from_anchor() {
        let mut clock = ClockTracker::new();
        clock.start(ms(500));
        let reading = clock.sample(ms(2_500), TOTAL);
        assert_eq!(reading.current_time, ms(2_000));
        assert!((reading.progress - 0.2).abs() < 1e-9);
    }

    #[test]
    fn pause_freezes_and_resume_continues() {
        let mut clock = ClockTracker::new();
        clock.start(ms(0));
        clock.pause(ms(1_000));
        // Render clock keeps moving for other reasons; position must not.
        assert_eq!(clock.sample(ms(4_000), TOTAL).current_time, ms(1_000));

        clock.resume(ms(4_000));
        assert_eq!(clock.sample(ms(4_500), TOTAL).current_time, ms(1_500));
    }

    #[test]
    fn stall_does_not_advance_position() {
        let mut clock = ClockTracker::new();
        clock.start(ms(0));
        // Render clock stuck at 300 ms while wall time passes.
        assert_eq!(clock.sample(ms(300), TOTAL).current_time, ms(300));
        assert_eq!(clock.sample(ms(300), TOTAL).current_time, ms(300));
    }

    #[test]
    fn dragging_suppresses_progress_updates() {
        let mut clock = ClockTracker::new();
        clock.start(ms(0));
        clock.sample(ms(1_000), TOTAL);
        clock.set_dragging(true);
        let reading = clock.sample(ms(5_000), TOTAL);
        assert!((reading.progress - 0.1).abs() < 1e-9);
        assert_eq!(reading.current_time, ms(5_000));

        clock.set_dragging(false);
        assert!((clock.sample(ms(5_000), TOTAL).progress - 0.5).abs() < 1e-9);
    }

    #[test]
    fn progress_is_clamped() {
        let mut clock = ClockTracker::new();
        clock.start(ms(0));
        assert!((clock.sample(ms(20_000), TOTAL).progress - 1.0).abs() < f64::EPSILON);
        assert!(clock.sample(ms(20_000), Duration::ZERO).progress.abs() < f64::EPSILON);
    }

    #[test]
    fn reanchor_jumps_position() {
        let mut clock = ClockTracker::new();
        clock.start(ms(0));
        clock.reanchor(ms(7_000), ms(1_000), TOTAL);
        assert_eq!(clock.sample(ms(1_500), TOTAL).current_time, ms(7_500));
    }
}
