//! Test doubles for the playback engine.
//!
//! [`ManualSink`] is an [`AudioSink`] whose render clock only moves when a
//! test tells it to. Clones share state, so a test can move one clone into
//! the engine (or the service task) and keep another as a controller.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use crate::error::PlaybackError;
use crate::format::SAMPLE_RATE;
use crate::sink::{AudioSink, BufferHandle, CompletionSender};

/// One buffer accepted by a [`ManualSink`].
#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
    pub handle: BufferHandle,
    pub frames: Vec<i16>,
    pub volume: f32,
}

impl Submission {
    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.frames.len() as f64 / f64::from(SAMPLE_RATE))
    }
}

#[derive(Debug)]
struct State {
    queue: VecDeque<Submission>,
    history: Vec<Submission>,
    playing: bool,
    stop_count: usize,
    volume: f32,
    rendered: Duration,
    reject: bool,
}

impl Default for State {
    fn default() -> Self {
        Self {
            queue: VecDeque::new(),
            history: Vec::new(),
            playing: false,
            stop_count: 0,
            volume: 1.0,
            rendered: Duration::ZERO,
            reject: false,
        }
    }
}

/// Hand-driven audio sink.
#[derive(Debug, Clone, Default)]
pub struct ManualSink {
    state: Arc<Mutex<State>>,
    completions: Option<CompletionSender>,
}

impl ManualSink {
    /// A sink that never reports completions on its own; tests feed them to
    /// the engine directly.
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink that reports completions through `completions` when buffers
    /// are rendered with [`render_next`](Self::render_next).
    pub fn with_completions(completions: CompletionSender) -> Self {
        Self {
            state: Arc::default(),
            completions: Some(completions),
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        // A panicking test poisons the lock; the state is still usable.
        self.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Move the render clock forward, as if the device pulled `by` worth of
    /// frames. Ignored while not playing.
    pub fn advance(&self, by: Duration) {
        let mut state = self.lock();
        if state.playing {
            state.rendered += by;
        }
    }

    /// Finish rendering the oldest queued buffer.
    ///
    /// Advances the render clock by the buffer's length and reports its
    /// completion. Returns `None` when paused or the queue is empty.
    pub fn render_next(&self) -> Option<BufferHandle> {
        let submission = {
            let mut state = self.lock();
            if !state.playing {
                return None;
            }
            let submission = state.queue.pop_front()?;
            state.rendered += submission.duration();
            submission
        };
        if let Some(completions) = &self.completions {
            completions.notify(submission.handle);
        }
        Some(submission.handle)
    }

    /// Render everything queued. Returns the handles in render order.
    pub fn render_all(&self) -> Vec<BufferHandle> {
        std::iter::from_fn(|| self.render_next()).collect()
    }

    /// Make subsequent submissions fail.
    pub fn reject_submissions(&self, reject: bool) {
        self.lock().reject = reject;
    }

    /// Handles currently queued, oldest first.
    pub fn queued(&self) -> Vec<BufferHandle> {
        self.lock().queue.iter().map(|s| s.handle).collect()
    }

    /// Every buffer ever accepted, including flushed ones.
    pub fn submissions(&self) -> Vec<Submission> {
        self.lock().history.clone()
    }

    pub fn is_playing(&self) -> bool {
        self.lock().playing
    }

    pub fn stop_count(&self) -> usize {
        self.lock().stop_count
    }

    pub fn volume(&self) -> f32 {
        self.lock().volume
    }

    pub fn rendered(&self) -> Duration {
        self.lock().rendered
    }
}

impl AudioSink for ManualSink {
    fn submit(&mut self, frames: Vec<i16>, volume: f32, handle: BufferHandle) -> Result<(), PlaybackError> {
        let mut state = self.lock();
        if state.reject {
            return Err(PlaybackError::SinkRejected("rejected by test".into()));
        }
        let submission = Submission { handle, frames, volume };
        state.history.push(submission.clone());
        state.queue.push_back(submission);
        Ok(())
    }

    fn start(&mut self) {
        self.lock().playing = true;
    }

    fn pause(&mut self) {
        self.lock().playing = false;
    }

    fn stop(&mut self) {
        let mut state = self.lock();
        state.queue.clear();
        state.playing = false;
        state.stop_count += 1;
    }

    fn set_volume(&mut self, volume: f32) {
        let mut state = self.lock();
        state.volume = volume;
        for queued in &mut state.queue {
            queued.volume = volume;
        }
    }

    fn render_position(&self) -> Duration {
        self.lock().rendered
    }
}
