//! Integration tests for the `StreamEngine` lifecycle.
//!
//! The engine is driven synchronously against a `ManualSink`, whose render
//! clock and buffer completions are advanced by hand. No audio hardware or
//! runtime is involved.
//!
//! # What is tested
//!
//! - Header stripping and odd-byte carry across real chunk boundaries
//! - Pre-roll gating, draining and natural finish
//! - Finish in either order: network close first or completions first
//! - Stale completions after seek and stop
//! - Seek idempotence and render-clock driven position
//! - Pause/resume, dragging, replay after finish
//! - Monotonic displayed duration

use std::time::Duration;

use parlance_core::engine::NOTHING_TO_PLAY;
use parlance_core::format::{self, WAV_HEADER_LEN};
use parlance_core::testing::ManualSink;
use parlance_core::{Phase, PlaybackConfig, PlaybackError, PlaybackEvent, StreamEngine};
use tokio::sync::mpsc::UnboundedReceiver;

// ── Helpers ────────────────────────────────────────────────────────

fn new_engine() -> (StreamEngine<ManualSink>, ManualSink, UnboundedReceiver<PlaybackEvent>) {
    let sink = ManualSink::new();
    let (engine, events) = StreamEngine::new(sink.clone(), PlaybackConfig::default());
    (engine, sink, events)
}

/// Drain all pending events from the event receiver and return them.
fn drain_events(rx: &mut UnboundedReceiver<PlaybackEvent>) -> Vec<PlaybackEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

/// Extract just the phase transitions from a list of events.
fn phases_from(events: &[PlaybackEvent]) -> Vec<Phase> {
    events
        .iter()
        .filter_map(|e| match e {
            PlaybackEvent::PhaseChanged(phase) => Some(*phase),
            _ => None,
        })
        .collect()
}

/// Deterministic non-silent payload.
fn pcm(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

fn with_header(payload: &[u8]) -> Vec<u8> {
    let mut chunk = format::wav_header(0).to_vec();
    chunk.extend_from_slice(payload);
    chunk
}

fn complete_all(engine: &mut StreamEngine<ManualSink>, sink: &ManualSink) {
    for handle in sink.render_all() {
        engine.on_buffer_completed(handle);
    }
}

fn frames_submitted(sink: &ManualSink) -> Vec<usize> {
    sink.submissions().iter().map(|s| s.frames.len()).collect()
}

fn last_submission_frames(sink: &ManualSink) -> usize {
    sink.submissions().last().map_or(0, |s| s.frames.len())
}

/// Open a stream and push `secs` seconds of audio in one chunk.
fn playing_engine(secs: usize) -> (StreamEngine<ManualSink>, ManualSink, UnboundedReceiver<PlaybackEvent>) {
    let (mut engine, sink, events) = new_engine();
    engine.prepare_for_stream(0, 1.0);
    engine.push_chunk(&with_header(&pcm(secs * 48_000)));
    assert_eq!(engine.phase(), Phase::Playing);
    (engine, sink, events)
}

// ── Normalization through the engine ───────────────────────────────

#[test]
fn split_chunks_play_to_the_end() {
    let (mut engine, sink, mut events) = new_engine();
    engine.prepare_for_stream(0, 1.0);

    engine.push_chunk(&with_header(&pcm(8_000)));
    assert_eq!(engine.phase(), Phase::Buffering);
    engine.push_chunk(&pcm(8_000));
    assert_eq!(engine.phase(), Phase::Playing);
    engine.push_chunk(&pcm(4_001));

    assert_eq!(frames_submitted(&sink), vec![4_000, 4_000, 2_000]);
    let measured = engine.measured_duration().as_secs_f64();
    assert!((measured - 10_000.0 / 24_000.0).abs() < 1e-6);

    engine.finish_stream();
    assert_eq!(engine.phase(), Phase::Draining);
    // The carried odd byte never reaches the buffer.
    assert_eq!(engine.snapshot().buffered_bytes, 20_000);

    complete_all(&mut engine, &sink);
    assert_eq!(engine.phase(), Phase::Finished);

    let events = drain_events(&mut events);
    assert_eq!(
        phases_from(&events),
        vec![Phase::Buffering, Phase::Playing, Phase::Draining, Phase::Finished]
    );
    assert!(events.contains(&PlaybackEvent::Finished));
}

#[test]
fn header_split_across_chunks() {
    let (mut engine, sink, _events) = new_engine();
    engine.prepare_for_stream(0, 1.0);

    let stream = with_header(&pcm(100));
    engine.push_chunk(&stream[..10]);
    engine.push_chunk(&stream[10..WAV_HEADER_LEN + 3]);
    engine.push_chunk(&stream[WAV_HEADER_LEN + 3..]);

    let samples: Vec<i16> = sink.submissions().into_iter().flat_map(|s| s.frames).collect();
    assert_eq!(samples, format::bytes_to_samples(&pcm(100)));
}

#[test]
fn chunks_outside_a_stream_are_ignored() {
    let (mut engine, sink, _events) = new_engine();
    engine.push_chunk(&pcm(1_000));
    assert!(sink.submissions().is_empty());

    engine.prepare_for_stream(0, 1.0);
    engine.push_chunk(&with_header(&pcm(20_000)));
    engine.finish_stream();
    let submitted = sink.submissions().len();

    engine.push_chunk(&pcm(2_000));
    assert_eq!(sink.submissions().len(), submitted);
    assert_eq!(engine.snapshot().buffered_bytes, 20_000);
}

// ── Finish ordering ────────────────────────────────────────────────

#[test]
fn finish_after_completions_finishes_immediately() {
    let (mut engine, sink, mut events) = new_engine();
    engine.prepare_for_stream(0, 1.0);
    engine.push_chunk(&with_header(&pcm(9_600)));
    assert_eq!(engine.phase(), Phase::Playing);

    // Underrun: everything rendered while the network is still open.
    complete_all(&mut engine, &sink);
    assert_eq!(engine.scheduled_count(), 0);
    assert_eq!(engine.phase(), Phase::Playing);

    engine.finish_stream();
    assert_eq!(engine.phase(), Phase::Finished);
    assert!(drain_events(&mut events).contains(&PlaybackEvent::Finished));
}

#[test]
fn finish_before_completions_waits_for_drain() {
    let (mut engine, sink, _events) = new_engine();
    engine.prepare_for_stream(0, 1.0);
    engine.push_chunk(&with_header(&pcm(9_600)));
    engine.push_chunk(&pcm(9_600));

    engine.finish_stream();
    assert_eq!(engine.phase(), Phase::Draining);

    let first = sink.render_next().unwrap();
    engine.on_buffer_completed(first);
    assert_eq!(engine.phase(), Phase::Draining);
    // A duplicate completion must not count twice.
    engine.on_buffer_completed(first);
    assert_eq!(engine.scheduled_count(), 1);

    complete_all(&mut engine, &sink);
    assert_eq!(engine.phase(), Phase::Finished);
}

#[test]
fn short_stream_below_pre_roll_still_plays() {
    let (mut engine, sink, _events) = new_engine();
    engine.prepare_for_stream(0, 1.0);
    engine.push_chunk(&with_header(&pcm(2_000)));
    assert_eq!(engine.phase(), Phase::Buffering);
    assert!(!sink.is_playing());

    engine.finish_stream();
    assert_eq!(engine.phase(), Phase::Draining);
    assert!(sink.is_playing());

    complete_all(&mut engine, &sink);
    assert_eq!(engine.phase(), Phase::Finished);
}

#[test]
fn empty_stream_finishes_on_close() {
    let (mut engine, _sink, _events) = new_engine();
    engine.prepare_for_stream(40, 1.0);
    engine.push_chunk(&format::wav_header(0));
    engine.finish_stream();
    assert_eq!(engine.phase(), Phase::Finished);
}

#[test]
fn rejected_buffers_do_not_block_finish() {
    let (mut engine, sink, _events) = new_engine();
    sink.reject_submissions(true);
    engine.prepare_for_stream(0, 1.0);
    engine.push_chunk(&with_header(&pcm(20_000)));

    assert_eq!(engine.scheduled_count(), 0);
    engine.finish_stream();
    assert_eq!(engine.phase(), Phase::Finished);
    // Audio is still kept for export.
    assert_eq!(engine.export_snapshot().len(), WAV_HEADER_LEN + 20_000);
}

// ── Stale completions ──────────────────────────────────────────────

#[test]
fn completions_from_before_seek_are_ignored() {
    let (mut engine, sink, _events) = new_engine();
    engine.prepare_for_stream(0, 1.0);
    engine.push_chunk(&with_header(&pcm(9_600)));
    engine.push_chunk(&pcm(9_600));
    engine.finish_stream();

    let stale = sink.queued();
    assert_eq!(stale.len(), 2);

    engine.seek(0.5).unwrap();
    assert_eq!(engine.phase(), Phase::Playing);
    assert_eq!(engine.scheduled_count(), 1);

    for handle in stale {
        engine.on_buffer_completed(handle);
    }
    assert_eq!(engine.scheduled_count(), 1);
    assert_eq!(engine.phase(), Phase::Playing);

    complete_all(&mut engine, &sink);
    assert_eq!(engine.phase(), Phase::Finished);
}

#[test]
fn completions_from_before_stop_are_ignored() {
    let (mut engine, sink, _events) = playing_engine(1);
    let stale = sink.queued();

    engine.stop();
    assert_eq!(engine.phase(), Phase::Idle);
    assert_eq!(engine.snapshot().buffered_bytes, 0);

    engine.prepare_for_stream(0, 1.0);
    engine.push_chunk(&with_header(&pcm(9_600)));
    engine.finish_stream();
    assert_eq!(engine.phase(), Phase::Draining);

    for handle in stale {
        engine.on_buffer_completed(handle);
    }
    assert_eq!(engine.phase(), Phase::Draining);
    assert_eq!(engine.scheduled_count(), 1);
}

// ── Seek ───────────────────────────────────────────────────────────

#[test]
fn seek_resubmits_from_frame_boundary() {
    let (mut engine, sink, _events) = playing_engine(2);

    engine.seek(0.5).unwrap();
    assert_eq!(last_submission_frames(&sink), 24_000);

    let snapshot = engine.snapshot();
    assert_eq!(snapshot.current_time, Duration::from_secs(1));
    assert!((snapshot.progress - 0.5).abs() < 1e-9);
    assert_eq!(snapshot.phase, Phase::Playing);
}

#[test]
fn seeking_to_current_progress_is_idempotent() {
    let (mut engine, sink, _events) = playing_engine(2);

    for fraction in [0.5, 0.3337, 0.999] {
        engine.seek(fraction).unwrap();
        let first = last_submission_frames(&sink);
        let before = engine.snapshot();

        engine.seek(before.progress).unwrap();
        assert_eq!(last_submission_frames(&sink), first, "fraction {fraction}");
        let after = engine.snapshot().current_time;
        assert!(after.abs_diff(before.current_time) <= format::frame_duration(), "fraction {fraction}");
    }
}

#[test]
fn seek_clamps_out_of_range_fractions() {
    let (mut engine, sink, _events) = playing_engine(1);

    engine.seek(1.5).unwrap();
    assert_eq!(last_submission_frames(&sink), 1);

    engine.seek(-3.0).unwrap();
    assert_eq!(last_submission_frames(&sink), 24_000);

    engine.seek(f64::NAN).unwrap();
    assert_eq!(last_submission_frames(&sink), 24_000);
}

#[test]
fn seek_reanchors_render_clock() {
    let (mut engine, sink, _events) = playing_engine(2);
    sink.advance(Duration::from_millis(300));

    engine.seek(0.5).unwrap();
    sink.advance(Duration::from_millis(250));
    let reading = engine.tick();
    assert_eq!(reading.current_time, Duration::from_millis(1_250));
}

// ── Position, pause and dragging ───────────────────────────────────

#[test]
fn position_follows_render_clock_across_pause() {
    let (mut engine, sink, _events) = playing_engine(2);

    sink.advance(Duration::from_millis(500));
    assert_eq!(engine.tick().current_time, Duration::from_millis(500));

    assert_eq!(engine.toggle_pause().unwrap(), Phase::Paused);
    assert!(!sink.is_playing());
    sink.advance(Duration::from_secs(1));
    assert_eq!(engine.tick().current_time, Duration::from_millis(500));

    assert_eq!(engine.toggle_pause().unwrap(), Phase::Playing);
    sink.advance(Duration::from_millis(250));
    assert_eq!(engine.tick().current_time, Duration::from_millis(750));
}

#[test]
fn resume_after_close_continues_draining() {
    let (mut engine, sink, _events) = playing_engine(1);
    engine.finish_stream();
    assert_eq!(engine.phase(), Phase::Draining);

    engine.toggle_pause().unwrap();
    assert_eq!(engine.phase(), Phase::Paused);
    assert_eq!(engine.toggle_pause().unwrap(), Phase::Draining);

    complete_all(&mut engine, &sink);
    assert_eq!(engine.phase(), Phase::Finished);
}

#[test]
fn dragging_freezes_progress_only() {
    let (mut engine, sink, _events) = playing_engine(2);
    sink.advance(Duration::from_millis(200));
    let before = engine.tick().progress;

    engine.set_dragging(true);
    sink.advance(Duration::from_millis(800));
    let reading = engine.tick();
    assert!((reading.progress - before).abs() < f64::EPSILON);
    assert_eq!(reading.current_time, Duration::from_secs(1));
    assert!(engine.snapshot().dragging);

    engine.set_dragging(false);
    assert!((engine.tick().progress - 0.5).abs() < 1e-9);
}

#[test]
fn toggle_after_finish_replays_from_start() {
    let (mut engine, sink, _events) = playing_engine(1);
    engine.finish_stream();
    complete_all(&mut engine, &sink);
    assert_eq!(engine.phase(), Phase::Finished);

    assert_eq!(engine.toggle_pause().unwrap(), Phase::Playing);
    assert_eq!(last_submission_frames(&sink), 24_000);
    assert_eq!(engine.snapshot().current_time, Duration::ZERO);
}

// ── Nothing to play ────────────────────────────────────────────────

#[test]
fn controls_without_audio_report_nothing_to_play() {
    let (mut engine, sink, mut events) = new_engine();

    assert!(matches!(engine.toggle_pause(), Err(PlaybackError::NothingToPlay)));
    assert!(matches!(engine.seek(0.2), Err(PlaybackError::NothingToPlay)));
    assert_eq!(engine.phase(), Phase::Idle);
    assert_eq!(sink.stop_count(), 0);

    let events = drain_events(&mut events);
    assert!(events.contains(&PlaybackEvent::Status(Some(NOTHING_TO_PLAY.to_string()))));
}

#[test]
fn stop_discards_audio() {
    let (mut engine, _sink, _events) = playing_engine(1);
    engine.stop();
    assert!(matches!(engine.toggle_pause(), Err(PlaybackError::NothingToPlay)));
    assert_eq!(engine.export_snapshot().len(), WAV_HEADER_LEN);
}

// ── Duration ───────────────────────────────────────────────────────

#[test]
fn displayed_duration_never_decreases() {
    let (mut engine, _sink, _events) = new_engine();
    engine.prepare_for_stream(300, 1.0);
    assert_eq!(engine.displayed_duration(), Duration::from_secs(20));

    engine.push_chunk(&format::wav_header(0));
    let mut previous = engine.displayed_duration();
    for _ in 0..25 {
        engine.push_chunk(&pcm(48_000));
        let displayed = engine.displayed_duration();
        assert!(displayed >= previous);
        assert!(displayed >= engine.measured_duration());
        previous = displayed;
    }
    assert!(engine.displayed_duration() >= Duration::from_secs(25));
}

#[test]
fn estimate_scales_with_speed() {
    let (mut engine, _sink, _events) = new_engine();
    engine.prepare_for_stream(300, 2.0);
    assert_eq!(engine.displayed_duration(), Duration::from_secs(10));

    engine.prepare_for_stream(3, 1.0);
    assert_eq!(engine.displayed_duration(), Duration::from_secs(1));
}
