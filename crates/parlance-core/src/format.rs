//! Wire format of the synthesis stream.
//!
//! The backend emits one 44-byte RIFF/WAVE header followed by raw mono
//! 16-bit little-endian PCM. The sample rate is fixed and must match the
//! backend; a mismatch plays at the wrong pitch and is not detected here.

use std::time::Duration;

/// Sample rate shared with the synthesis backend.
pub const SAMPLE_RATE: u32 = 24_000;

/// Mono output.
pub const CHANNELS: u16 = 1;

/// Bytes per 16-bit sample frame.
pub const BYTES_PER_SAMPLE: usize = 2;

/// Size of the canonical PCM container header.
pub const WAV_HEADER_LEN: usize = 44;

/// Duration of `len` bytes of PCM.
pub fn bytes_to_duration(len: usize) -> Duration {
    let frames = (len / BYTES_PER_SAMPLE) as f64;
    Duration::from_secs_f64(frames / f64::from(SAMPLE_RATE))
}

/// Byte offset of the frame that starts at `time`, always frame-aligned.
pub fn duration_to_byte_offset(time: Duration) -> usize {
    // Nudge before flooring so a time computed from a whole frame count
    // does not land one frame early through float rounding.
    let frames = (time.as_secs_f64() * f64::from(SAMPLE_RATE) + 1e-3).floor();
    frames as usize * BYTES_PER_SAMPLE
}

/// Duration of a single sample frame.
pub fn frame_duration() -> Duration {
    Duration::from_secs_f64(1.0 / f64::from(SAMPLE_RATE))
}

/// Decode little-endian byte pairs into samples. A trailing odd byte is ignored.
pub fn bytes_to_samples(bytes: &[u8]) -> Vec<i16> {
    bytes
        .chunks_exact(BYTES_PER_SAMPLE)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
        .collect()
}

/// Build a 44-byte header describing `data_len` bytes of payload.
///
/// Streaming backends write zero sizes because the length is unknown up
/// front; exports know the final length and fill them in.
pub fn wav_header(data_len: usize) -> [u8; WAV_HEADER_LEN] {
    // RIFF sizes are 32-bit; longer payloads are written as the maximum.
    let data_len = u32::try_from(data_len).unwrap_or(u32::MAX).min(u32::MAX - 36);
    let byte_rate = SAMPLE_RATE * u32::from(CHANNELS) * BYTES_PER_SAMPLE as u32;
    let block_align = CHANNELS * BYTES_PER_SAMPLE as u16;
    let bits_per_sample = (BYTES_PER_SAMPLE * 8) as u16;

    let mut header = [0u8; WAV_HEADER_LEN];
    header[0..4].copy_from_slice(b"RIFF");
    header[4..8].copy_from_slice(&(36 + data_len).to_le_bytes());
    header[8..12].copy_from_slice(b"WAVE");
    header[12..16].copy_from_slice(b"fmt ");
    header[16..20].copy_from_slice(&16u32.to_le_bytes());
    header[20..22].copy_from_slice(&1u16.to_le_bytes()); // PCM
    header[22..24].copy_from_slice(&CHANNELS.to_le_bytes());
    header[24..28].copy_from_slice(&SAMPLE_RATE.to_le_bytes());
    header[28..32].copy_from_slice(&byte_rate.to_le_bytes());
    header[32..34].copy_from_slice(&block_align.to_le_bytes());
    header[34..36].copy_from_slice(&bits_per_sample.to_le_bytes());
    header[36..40].copy_from_slice(b"data");
    header[40..44].copy_from_slice(&data_len.to_le_bytes());
    header
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_second_of_audio() {
        let len = SAMPLE_RATE as usize * BYTES_PER_SAMPLE;
        assert_eq!(bytes_to_duration(len), Duration::from_secs(1));
        assert_eq!(duration_to_byte_offset(Duration::from_secs(1)), len);
    }

    #[test]
    fn byte_offset_is_frame_aligned() {
        let offset = duration_to_byte_offset(Duration::from_millis(333));
        assert_eq!(offset % BYTES_PER_SAMPLE, 0);
    }

    #[test]
    fn samples_decode_little_endian() {
        let samples = bytes_to_samples(&[0x01, 0x00, 0xFF, 0xFF, 0x00, 0x80, 0x7F]);
        assert_eq!(samples, vec![1, -1, i16::MIN]);
    }

    #[test]
    fn header_layout() {
        let header = wav_header(8000);
        assert_eq!(&header[0..4], b"RIFF");
        assert_eq!(&header[8..12], b"WAVE");
        assert_eq!(&header[36..40], b"data");
        assert_eq!(u32::from_le_bytes([header[4], header[5], header[6], header[7]]), 8036);
        assert_eq!(u32::from_le_bytes([header[24], header[25], header[26], header[27]]), 24_000);
        assert_eq!(u32::from_le_bytes([header[40], header[41], header[42], header[43]]), 8000);
    }

    #[test]
    fn header_sizes_saturate_near_u32_max() {
        let header = wav_header(u32::MAX as usize - 10);
        assert_eq!(u32::from_le_bytes([header[4], header[5], header[6], header[7]]), u32::MAX);
        assert_eq!(u32::from_le_bytes([header[40], header[41], header[42], header[43]]), u32::MAX - 36);
    }
}
