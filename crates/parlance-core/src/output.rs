//! Speaker output via `rodio`.
//!
//! [`DeviceOutput`] owns the rodio stream and sink and must stay on the
//! thread that created it; [`LocalOutput`](crate::audio_thread::LocalOutput)
//! is the `Send` proxy the engine actually holds.
//!
//! Two things are layered on top of a plain rodio sink:
//!
//! - a frame counter ([`Counted`]) incremented as the device pulls samples,
//!   which is the render clock the engine reads;
//! - an [`EmptyCallback`] appended after every buffer, which reports the
//!   buffer's [`BufferHandle`] once the device has moved past it.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use rodio::source::EmptyCallback;
use rodio::{OutputStream, OutputStreamHandle, Sink, Source};

use crate::error::PlaybackError;
use crate::format::{CHANNELS, SAMPLE_RATE};
use crate::sink::{BufferHandle, CompletionSender};

/// Frames pulled by the output device, shared with the engine side.
#[derive(Debug, Clone, Default)]
pub struct RenderCounter(Arc<AtomicU64>);

impl RenderCounter {
    pub fn position(&self) -> Duration {
        let frames = self.0.load(Ordering::Relaxed);
        Duration::from_secs_f64(frames as f64 / f64::from(SAMPLE_RATE))
    }

    fn add(&self, frames: u64) {
        self.0.fetch_add(frames, Ordering::Relaxed);
    }
}

/// Source wrapper that counts every sample the device pulls.
struct Counted<S> {
    inner: S,
    counter: RenderCounter,
}

impl<S> Iterator for Counted<S>
where
    S: Source,
    S::Item: rodio::Sample,
{
    type Item = S::Item;

    fn next(&mut self) -> Option<Self::Item> {
        let sample = self.inner.next()?;
        self.counter.add(1);
        Some(sample)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<S> Source for Counted<S>
where
    S: Source,
    S::Item: rodio::Sample,
{
    fn current_frame_len(&self) -> Option<usize> {
        self.inner.current_frame_len()
    }

    fn channels(&self) -> u16 {
        self.inner.channels()
    }

    fn sample_rate(&self) -> u32 {
        self.inner.sample_rate()
    }

    fn total_duration(&self) -> Option<Duration> {
        self.inner.total_duration()
    }
}

/// Thread-confined rodio output.
pub struct DeviceOutput {
    /// rodio output stream (must be kept alive).
    _stream: OutputStream,

    /// Handle used to create sinks.
    stream_handle: OutputStreamHandle,

    /// Current sink; replaced wholesale on stop.
    sink: Sink,

    counter: RenderCounter,
    completions: CompletionSender,
    volume: f32,
    playing: bool,
}

impl DeviceOutput {
    /// Open the default output device. The sink starts paused.
    pub fn new(counter: RenderCounter, completions: CompletionSender) -> Result<Self, PlaybackError> {
        let (stream, stream_handle) =
            OutputStream::try_default().map_err(|e| PlaybackError::EngineUnavailable(e.to_string()))?;
        let sink = Self::paused_sink(&stream_handle)?;

        tracing::info!("Audio output initialized on default output device");

        Ok(Self {
            _stream: stream,
            stream_handle,
            sink,
            counter,
            completions,
            volume: 1.0,
            playing: false,
        })
    }

    fn paused_sink(handle: &OutputStreamHandle) -> Result<Sink, PlaybackError> {
        let sink = Sink::try_new(handle).map_err(|e| PlaybackError::EngineUnavailable(e.to_string()))?;
        sink.pause();
        Ok(sink)
    }

    /// Queue one buffer followed by its completion marker.
    pub fn submit(&mut self, frames: Vec<i16>, volume: f32, handle: BufferHandle) -> Result<(), PlaybackError> {
        if frames.is_empty() {
            return Err(PlaybackError::SinkRejected("zero-length buffer".into()));
        }
        if (volume - self.volume).abs() > f32::EPSILON {
            self.set_volume(volume);
        }

        let source = rodio::buffer::SamplesBuffer::new(CHANNELS, SAMPLE_RATE, frames);
        self.sink.append(Counted {
            inner: source,
            counter: self.counter.clone(),
        });

        let completions = self.completions.clone();
        self.sink
            .append(EmptyCallback::<f32>::new(Box::new(move || completions.notify(handle))));
        Ok(())
    }

    pub fn start(&mut self) {
        self.sink.play();
        self.playing = true;
    }

    pub fn pause(&mut self) {
        self.sink.pause();
        self.playing = false;
    }

    /// Drop everything queued. Completion markers of dropped buffers never
    /// fire.
    pub fn stop(&mut self) {
        match Self::paused_sink(&self.stream_handle) {
            Ok(fresh) => {
                fresh.set_volume(self.volume);
                let old = std::mem::replace(&mut self.sink, fresh);
                old.stop();
            }
            Err(e) => {
                tracing::warn!(error = %e, "Could not create replacement sink, stopping in place");
                self.sink.stop();
            }
        }
        self.playing = false;
        tracing::debug!("Audio output flushed");
    }

    pub fn set_volume(&mut self, volume: f32) {
        self.volume = volume.clamp(0.0, 1.0);
        self.sink.set_volume(self.volume);
    }

    pub const fn is_playing(&self) -> bool {
        self.playing
    }
}
