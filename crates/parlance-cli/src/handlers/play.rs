//! Play command handler.
//!
//! Streams the input into the playback service as it is read, renders a
//! progress line on stderr, and optionally saves the received audio once
//! playback ends. Ctrl-C stops playback immediately.

use std::future::Future;
use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use parlance_core::{
    ChunkSource, Phase, PlaybackError, PlaybackHandle, PlaybackService, PlaybackSnapshot, ReaderSource, stream_into,
};
use tokio::sync::watch;

use crate::commands::PlayArgs;
use crate::error::CliError;
use crate::handlers::open_input;
use crate::presentation::status_line;

/// Execute the play command against a running service.
pub async fn execute(service: PlaybackService, args: PlayArgs) -> Result<()> {
    run(service, args, ctrl_c()).await
}

async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Could not listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}

/// Play until the stream finishes or `interrupt` resolves.
async fn run(service: PlaybackService, args: PlayArgs, interrupt: impl Future<Output = ()>) -> Result<()> {
    let handle = service.handle();

    if let Some(volume) = args.volume {
        if !(0.0..=1.0).contains(&volume) {
            return Err(CliError::Arguments(format!("volume must be between 0.0 and 1.0, got {volume}")).into());
        }
        handle.set_volume(volume).map_err(CliError::from)?;
    }

    let reader = open_input(&args.input).await.map_err(CliError::from)?;
    let mut source = ReaderSource::with_chunk_size(reader, args.chunk_size);
    if args.chunk_delay_ms > 0 {
        source = source.paced(Duration::from_millis(args.chunk_delay_ms));
    }

    let progress = tokio::spawn(render_progress(handle.subscribe()));

    let (outcome, interrupted) = tokio::select! {
        result = play_to_end(&handle, &mut source, &args) => (result, false),
        () = interrupt => {
            tracing::info!("Interrupted, stopping playback");
            (Ok(()), true)
        }
    };

    // Stopping discards the received audio, so the export comes first.
    let exported = match (&outcome, &args.export) {
        (Ok(()), Some(path)) => export(&handle, path).await,
        _ => Ok(()),
    };
    if interrupted {
        if let Err(e) = handle.stop() {
            tracing::debug!(error = %e, "Service already closed");
        }
    }

    service.shutdown().await;
    if let Err(e) = progress.await {
        tracing::debug!(error = %e, "Progress renderer ended abnormally");
    }
    outcome?;
    exported?;
    Ok(())
}

async fn export(handle: &PlaybackHandle, path: &Path) -> Result<(), CliError> {
    let wav = handle.export_snapshot().await?;
    tokio::fs::write(path, &wav).await?;
    println!("Saved {} ({} bytes)", path.display(), wav.len());
    Ok(())
}

async fn play_to_end<C: ChunkSource>(
    handle: &PlaybackHandle,
    source: &mut C,
    args: &PlayArgs,
) -> Result<(), CliError> {
    match stream_into(handle, source, args.text_length, args.speed).await {
        Ok(bytes) => tracing::debug!(bytes, "Input fully read"),
        // The stream is already closed; play whatever arrived.
        Err(e @ (PlaybackError::Source(_) | PlaybackError::Io(_))) => {
            tracing::warn!(error = %e, "Input ended early");
        }
        Err(e) => return Err(e.into()),
    }

    if let Some(fraction) = args.start_at {
        handle.seek(fraction).await?;
    }

    let end = handle
        .wait_until(|s| matches!(s.phase, Phase::Finished | Phase::Idle))
        .await?;
    tracing::info!(duration_secs = end.duration.as_secs_f64(), "Playback ended");
    Ok(())
}

async fn render_progress(mut snapshots: watch::Receiver<PlaybackSnapshot>) {
    while snapshots.changed().await.is_ok() {
        let snapshot = snapshots.borrow_and_update().clone();
        eprint!("\r{}", status_line(&snapshot));
        if matches!(snapshot.phase, Phase::Finished | Phase::Idle) {
            break;
        }
    }
    eprintln!();
}
