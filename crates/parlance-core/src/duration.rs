//! Upfront duration estimate and the monotonic duration shown to observers.
//!
//! Before any audio exists the only clue to the clip length is the text that
//! was sent for synthesis. The estimate is a rough reading-rate heuristic; it
//! is superseded silently once measured audio outgrows it.

use std::time::Duration;

/// Default average reading rate, in characters per second.
pub const DEFAULT_CHARS_PER_SECOND: f64 = 15.0;

/// Shortest estimate ever produced.
const MIN_ESTIMATE_SECS: f64 = 1.0;

/// Slowest speed multiplier honoured by the estimate.
const MIN_SPEED: f64 = 0.1;

/// Text-length based duration heuristic.
#[derive(Debug, Clone, Copy)]
pub struct DurationEstimator {
    chars_per_second: f64,
}

impl DurationEstimator {
    #[must_use]
    pub const fn new(chars_per_second: f64) -> Self {
        Self { chars_per_second }
    }

    /// `max(1 s, text_len / chars_per_second / speed)`.
    pub fn estimate(&self, text_len: usize, speed: f64) -> Duration {
        let speed = if speed.is_finite() { speed.max(MIN_SPEED) } else { 1.0 };
        let secs = (text_len as f64 / self.chars_per_second) / speed;
        Duration::from_secs_f64(secs.max(MIN_ESTIMATE_SECS))
    }
}

impl Default for DurationEstimator {
    fn default() -> Self {
        Self::new(DEFAULT_CHARS_PER_SECOND)
    }
}

/// Displayed duration for one stream: never moves backwards.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisplayedDuration {
    estimated: Duration,
    displayed: Duration,
}

impl DisplayedDuration {
    /// Start a stream with the given estimate.
    pub const fn with_estimate(estimated: Duration) -> Self {
        Self {
            estimated,
            displayed: estimated,
        }
    }

    /// Reconcile with the measured duration after an append.
    pub fn update(&mut self, measured: Duration) -> Duration {
        self.displayed = self.displayed.max(self.estimated).max(measured);
        self.displayed
    }

    pub const fn get(&self) -> Duration {
        self.displayed
    }
}
