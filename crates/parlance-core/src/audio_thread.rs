//! Dedicated audio thread — keeps `!Send` rodio resources off the runtime.
//!
//! `rodio::OutputStream` is `!Send` on some platforms, so the device lives
//! on one OS thread for its whole life and [`LocalOutput`] proxies every
//! [`AudioSink`] call to it over a channel. The render clock is read
//! directly from a shared counter and never crosses the channel.

use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use crate::error::PlaybackError;
use crate::output::{DeviceOutput, RenderCounter};
use crate::sink::{AudioSink, BufferHandle, CompletionSender};

// ── Commands ───────────────────────────────────────────────────────

enum AudioCommand {
    /// Queue one buffer.
    Submit {
        frames: Vec<i16>,
        volume: f32,
        handle: BufferHandle,
        reply: mpsc::Sender<Result<(), PlaybackError>>,
    },

    Start,
    Pause,

    /// Flush the queue.
    Stop,

    SetVolume(f32),

    /// Shut down the audio thread, releasing the device.
    Shutdown,
}

// ── Handle (Send proxy) ────────────────────────────────────────────

/// [`AudioSink`] that renders to the default output device.
///
/// Control calls are fire-and-forget; only [`submit`](AudioSink::submit)
/// waits for the audio thread so a rejected buffer is never counted as
/// scheduled.
pub struct LocalOutput {
    cmd_tx: mpsc::Sender<AudioCommand>,
    counter: RenderCounter,
    thread: Option<thread::JoinHandle<()>>,
}

impl LocalOutput {
    /// Spawn the audio thread and open the device.
    ///
    /// Initialisation errors are propagated back through a one-shot
    /// channel.
    pub fn spawn(completions: CompletionSender) -> Result<Self, PlaybackError> {
        let (cmd_tx, cmd_rx) = mpsc::channel::<AudioCommand>();
        let (init_tx, init_rx) = mpsc::channel::<Result<(), PlaybackError>>();
        let counter = RenderCounter::default();
        let thread_counter = counter.clone();

        let thread = thread::Builder::new()
            .name("parlance-audio".into())
            .spawn(move || Self::run(thread_counter, completions, cmd_rx, init_tx))
            .map_err(|e| PlaybackError::EngineUnavailable(format!("failed to spawn audio thread: {e}")))?;

        init_rx.recv().map_err(|_| PlaybackError::AudioThreadDied)??;

        Ok(Self {
            cmd_tx,
            counter,
            thread: Some(thread),
        })
    }

    fn send(&self, cmd: AudioCommand) {
        if self.cmd_tx.send(cmd).is_err() {
            tracing::warn!("Audio thread gone, command dropped");
        }
    }

    fn send_and_recv<T>(
        &self,
        build: impl FnOnce(mpsc::Sender<Result<T, PlaybackError>>) -> AudioCommand,
    ) -> Result<T, PlaybackError> {
        let (tx, rx) = mpsc::channel();
        self.cmd_tx
            .send(build(tx))
            .map_err(|_| PlaybackError::AudioThreadDied)?;
        rx.recv().map_err(|_| PlaybackError::AudioThreadDied)?
    }

    // ── Audio thread event loop ────────────────────────────────────

    fn run(
        counter: RenderCounter,
        completions: CompletionSender,
        cmd_rx: mpsc::Receiver<AudioCommand>,
        init_tx: mpsc::Sender<Result<(), PlaybackError>>,
    ) {
        let mut output = match DeviceOutput::new(counter, completions) {
            Ok(output) => output,
            Err(e) => {
                let _ = init_tx.send(Err(e));
                return;
            }
        };
        if init_tx.send(Ok(())).is_err() {
            return;
        }

        while let Ok(cmd) = cmd_rx.recv() {
            match cmd {
                AudioCommand::Submit {
                    frames,
                    volume,
                    handle,
                    reply,
                } => {
                    let _ = reply.send(output.submit(frames, volume, handle));
                }
                AudioCommand::Start => output.start(),
                AudioCommand::Pause => output.pause(),
                AudioCommand::Stop => output.stop(),
                AudioCommand::SetVolume(volume) => output.set_volume(volume),
                AudioCommand::Shutdown => break,
            }
        }

        tracing::debug!(playing = output.is_playing(), "Audio thread shutting down");
    }
}

impl AudioSink for LocalOutput {
    fn submit(&mut self, frames: Vec<i16>, volume: f32, handle: BufferHandle) -> Result<(), PlaybackError> {
        self.send_and_recv(|reply| AudioCommand::Submit {
            frames,
            volume,
            handle,
            reply,
        })
    }

    fn start(&mut self) {
        self.send(AudioCommand::Start);
    }

    fn pause(&mut self) {
        self.send(AudioCommand::Pause);
    }

    fn stop(&mut self) {
        self.send(AudioCommand::Stop);
    }

    fn set_volume(&mut self, volume: f32) {
        self.send(AudioCommand::SetVolume(volume));
    }

    fn render_position(&self) -> Duration {
        self.counter.position()
    }
}

impl Drop for LocalOutput {
    fn drop(&mut self) {
        let _ = self.cmd_tx.send(AudioCommand::Shutdown);
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
    }
}
