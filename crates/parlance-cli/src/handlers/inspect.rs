//! Inspect command handler.
//!
//! Runs a response through the same normalization the player uses, without
//! an audio device, and reports what came out.

use std::time::Duration;

use anyhow::Result;
use parlance_core::buffer::AccumulationBuffer;
use parlance_core::duration::DurationEstimator;
use parlance_core::format;
use parlance_core::normalizer::ChunkNormalizer;
use tokio::io::AsyncReadExt;

use crate::bootstrap::CliConfig;
use crate::commands::InspectArgs;
use crate::error::CliError;
use crate::handlers::open_input;

/// What normalization found in one response.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamReport {
    pub input_bytes: usize,
    pub chunks: usize,
    pub header_found: bool,
    pub payload_bytes: usize,
    pub dropped_trailing_byte: bool,
    pub measured: Duration,
    pub estimated: Option<Duration>,
}

/// Normalize `raw` in `chunk_size` pieces, the way it would arrive over
/// the network.
pub fn analyze(
    raw: &[u8],
    chunk_size: usize,
    estimate: Option<(usize, f64)>,
    estimator: DurationEstimator,
) -> (StreamReport, AccumulationBuffer) {
    let mut normalizer = ChunkNormalizer::new();
    let mut buffer = AccumulationBuffer::new();
    let mut chunks = 0;

    for chunk in raw.chunks(chunk_size.max(1)) {
        chunks += 1;
        buffer.append(&normalizer.normalize(chunk));
    }

    let report = StreamReport {
        input_bytes: raw.len(),
        chunks,
        header_found: normalizer.header_consumed(),
        payload_bytes: buffer.len(),
        dropped_trailing_byte: normalizer.discard_leftover().is_some(),
        measured: buffer.measured_duration(),
        estimated: estimate.map(|(text_len, speed)| estimator.estimate(text_len, speed)),
    };
    (report, buffer)
}

/// Execute the inspect command.
pub async fn execute(config: &CliConfig, args: &InspectArgs) -> Result<()> {
    let mut reader = open_input(&args.input).await.map_err(CliError::from)?;
    let mut raw = Vec::new();
    reader.read_to_end(&mut raw).await.map_err(CliError::from)?;

    let estimator = DurationEstimator::new(config.playback.chars_per_second);
    let estimate = args.text_length.map(|len| (len, args.speed));
    let (report, buffer) = analyze(&raw, args.chunk_size, estimate, estimator);

    print_report(&report);

    if let Some(path) = &args.output {
        let mut wav = format::wav_header(buffer.len()).to_vec();
        wav.extend_from_slice(buffer.as_bytes());
        std::fs::write(path, &wav).map_err(CliError::from)?;
        println!("Wrote {} ({} bytes)", path.display(), wav.len());
    }
    Ok(())
}

fn print_report(report: &StreamReport) {
    println!("Input:     {} bytes in {} chunks", report.input_bytes, report.chunks);
    println!(
        "Header:    {}",
        if report.header_found { "stripped" } else { "incomplete" }
    );
    println!("Payload:   {} bytes", report.payload_bytes);
    if report.dropped_trailing_byte {
        println!("Trailing:  1 odd byte dropped");
    }
    println!("Measured:  {:.3} s", report.measured.as_secs_f64());
    if let Some(estimated) = report.estimated {
        println!("Estimated: {:.3} s", estimated.as_secs_f64());
    }
}
