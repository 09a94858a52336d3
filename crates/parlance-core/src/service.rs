//! `PlaybackService` — runs a [`StreamEngine`] on its own task.
//!
//! # Ownership
//!
//! The engine is owned by exactly one tokio task. Everything that mutates
//! it arrives as a message on one of three inputs:
//!
//! | Input | Source |
//! |---|---|
//! | commands | [`PlaybackHandle`] clones (UI, network reader) |
//! | completions | the sink, through its [`CompletionSender`] |
//! | timers | the position sampler and the status auto-clear |
//!
//! Observers read state from a `watch` channel of [`PlaybackSnapshot`]s
//! and an event stream of [`PlaybackEvent`]s. No lock is ever taken around
//! engine state.

use bytes::Bytes;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::config::PlaybackConfig;
use crate::engine::{Phase, PlaybackEvent, PlaybackSnapshot, StreamEngine};
use crate::error::PlaybackError;
use crate::sink::{AudioSink, BufferHandle, CompletionSender};

// ── Commands ───────────────────────────────────────────────────────

#[derive(Debug)]
enum Command {
    Prepare { text_len: usize, speed: f64 },
    Chunk(Bytes),
    Finish,
    TogglePause {
        reply: oneshot::Sender<Result<Phase, PlaybackError>>,
    },
    Seek {
        fraction: f64,
        reply: oneshot::Sender<Result<(), PlaybackError>>,
    },
    Stop,
    SetDragging(bool),
    SetVolume(f32),
    Export {
        reply: oneshot::Sender<Vec<u8>>,
    },
    Flush {
        reply: oneshot::Sender<()>,
    },
    Shutdown,
}

// ── Handle ─────────────────────────────────────────────────────────

/// Cheap, cloneable front end to a running [`PlaybackService`].
///
/// Every method fails with [`PlaybackError::ServiceClosed`] once the
/// service task has stopped.
#[derive(Debug, Clone)]
pub struct PlaybackHandle {
    cmd_tx: mpsc::UnboundedSender<Command>,
    snapshots: watch::Receiver<PlaybackSnapshot>,
}

impl PlaybackHandle {
    fn send(&self, cmd: Command) -> Result<(), PlaybackError> {
        self.cmd_tx.send(cmd).map_err(|_| PlaybackError::ServiceClosed)
    }

    async fn request<T>(&self, build: impl FnOnce(oneshot::Sender<T>) -> Command) -> Result<T, PlaybackError> {
        let (tx, rx) = oneshot::channel();
        self.send(build(tx))?;
        rx.await.map_err(|_| PlaybackError::ServiceClosed)
    }

    /// Open a new stream, discarding any previous one.
    pub fn prepare_for_stream(&self, text_len: usize, speed: f64) -> Result<(), PlaybackError> {
        self.send(Command::Prepare { text_len, speed })
    }

    /// Deliver one network chunk.
    pub fn push_chunk(&self, chunk: Bytes) -> Result<(), PlaybackError> {
        self.send(Command::Chunk(chunk))
    }

    /// Signal the end of network data.
    pub fn finish_stream(&self) -> Result<(), PlaybackError> {
        self.send(Command::Finish)
    }

    pub async fn toggle_pause(&self) -> Result<Phase, PlaybackError> {
        self.request(|reply| Command::TogglePause { reply }).await?
    }

    pub async fn seek(&self, fraction: f64) -> Result<(), PlaybackError> {
        self.request(|reply| Command::Seek { fraction, reply }).await?
    }

    pub fn stop(&self) -> Result<(), PlaybackError> {
        self.send(Command::Stop)
    }

    pub fn set_dragging(&self, dragging: bool) -> Result<(), PlaybackError> {
        self.send(Command::SetDragging(dragging))
    }

    pub fn set_volume(&self, volume: f32) -> Result<(), PlaybackError> {
        self.send(Command::SetVolume(volume))
    }

    /// Standalone WAV of everything received so far.
    pub async fn export_snapshot(&self) -> Result<Vec<u8>, PlaybackError> {
        self.request(|reply| Command::Export { reply }).await
    }

    /// Wait until every command sent before this call has been applied and
    /// its state published.
    pub async fn flush(&self) -> Result<(), PlaybackError> {
        self.request(|reply| Command::Flush { reply }).await
    }

    /// Latest published state.
    pub fn snapshot(&self) -> PlaybackSnapshot {
        self.snapshots.borrow().clone()
    }

    /// Watch published state.
    pub fn subscribe(&self) -> watch::Receiver<PlaybackSnapshot> {
        self.snapshots.clone()
    }

    /// Wait until a published snapshot satisfies `done`.
    pub async fn wait_until(
        &self,
        done: impl FnMut(&PlaybackSnapshot) -> bool,
    ) -> Result<PlaybackSnapshot, PlaybackError> {
        let mut rx = self.subscribe();
        let snapshot = rx
            .wait_for(done)
            .await
            .map_err(|_| PlaybackError::ServiceClosed)?;
        Ok(snapshot.clone())
    }
}

// ── Service ────────────────────────────────────────────────────────

/// A running playback engine task.
pub struct PlaybackService {
    handle: PlaybackHandle,
    events: Option<mpsc::UnboundedReceiver<PlaybackEvent>>,
    task: JoinHandle<()>,
}

impl PlaybackService {
    /// Build the sink, then spawn the engine task on the current runtime.
    ///
    /// `make_sink` receives the completion channel the sink must report
    /// finished buffers through.
    pub fn spawn<S, F>(config: PlaybackConfig, make_sink: F) -> Result<Self, PlaybackError>
    where
        S: AudioSink + 'static,
        F: FnOnce(CompletionSender) -> Result<S, PlaybackError>,
    {
        config.validate()?;

        let (completion_tx, completions) = CompletionSender::channel();
        let sink = make_sink(completion_tx)?;

        let (engine, engine_events) = StreamEngine::new(sink, config);
        let (cmd_tx, commands) = mpsc::unbounded_channel();
        let (events_tx, events) = mpsc::unbounded_channel();
        let (snapshot_tx, snapshots) = watch::channel(engine.snapshot());

        let actor = Actor {
            engine,
            commands,
            completions,
            engine_events,
            events_tx,
            snapshot_tx,
            status_deadline: None,
        };
        let task = tokio::spawn(actor.run());
        tracing::debug!("Playback service started");

        Ok(Self {
            handle: PlaybackHandle { cmd_tx, snapshots },
            events: Some(events),
            task,
        })
    }

    pub fn handle(&self) -> PlaybackHandle {
        self.handle.clone()
    }

    /// Take the event stream. Only the first call returns `Some`.
    pub fn take_events(&mut self) -> Option<mpsc::UnboundedReceiver<PlaybackEvent>> {
        self.events.take()
    }

    /// Stop playback and wait for the engine task to exit.
    pub async fn shutdown(self) {
        let _ = self.handle.send(Command::Shutdown);
        if let Err(e) = self.task.await {
            tracing::warn!(error = %e, "Playback task ended abnormally");
        }
    }
}

// ── Actor ──────────────────────────────────────────────────────────

struct Actor<S> {
    engine: StreamEngine<S>,
    commands: mpsc::UnboundedReceiver<Command>,
    completions: mpsc::UnboundedReceiver<BufferHandle>,
    engine_events: mpsc::UnboundedReceiver<PlaybackEvent>,
    events_tx: mpsc::UnboundedSender<PlaybackEvent>,
    snapshot_tx: watch::Sender<PlaybackSnapshot>,
    status_deadline: Option<Instant>,
}

impl<S: AudioSink> Actor<S> {
    async fn run(mut self) {
        let mut ticker = time::interval(self.engine.config().tick_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            let deadline = self.status_deadline;
            let status_expired = async move {
                match deadline {
                    Some(at) => time::sleep_until(at).await,
                    None => std::future::pending().await,
                }
            };

            tokio::select! {
                cmd = self.commands.recv() => match cmd {
                    Some(Command::Shutdown) | None => break,
                    Some(cmd) => self.handle_command(cmd),
                },
                Some(handle) = self.completions.recv() => {
                    self.engine.on_buffer_completed(handle);
                }
                Some(event) = self.engine_events.recv() => self.forward(event),
                _ = ticker.tick(), if self.engine.phase().is_rendering() => {
                    self.engine.tick();
                }
                () = status_expired => {
                    self.status_deadline = None;
                    self.engine.clear_status();
                }
            }

            self.publish();
        }

        self.engine.stop();
        while let Ok(event) = self.engine_events.try_recv() {
            self.forward(event);
        }
        self.publish();
        tracing::debug!("Playback service stopped");
    }

    fn handle_command(&mut self, cmd: Command) {
        match cmd {
            Command::Prepare { text_len, speed } => self.engine.prepare_for_stream(text_len, speed),
            Command::Chunk(chunk) => self.engine.push_chunk(&chunk),
            Command::Finish => self.engine.finish_stream(),
            Command::TogglePause { reply } => {
                let _ = reply.send(self.engine.toggle_pause());
            }
            Command::Seek { fraction, reply } => {
                let _ = reply.send(self.engine.seek(fraction));
            }
            Command::Stop => self.engine.stop(),
            Command::SetDragging(dragging) => self.engine.set_dragging(dragging),
            Command::SetVolume(volume) => self.engine.set_volume(volume),
            Command::Export { reply } => {
                let _ = reply.send(self.engine.export_snapshot());
            }
            Command::Flush { reply } => {
                self.publish();
                let _ = reply.send(());
            }
            Command::Shutdown => {}
        }
    }

    fn forward(&mut self, event: PlaybackEvent) {
        if let PlaybackEvent::Status(Some(_)) = &event {
            self.status_deadline = Some(Instant::now() + self.engine.config().status_clear());
        }
        let _ = self.events_tx.send(event);
    }

    fn publish(&self) {
        let snapshot = self.engine.snapshot();
        self.snapshot_tx.send_if_modified(|current| {
            if *current == snapshot {
                return false;
            }
            *current = snapshot;
            true
        });
    }
}
