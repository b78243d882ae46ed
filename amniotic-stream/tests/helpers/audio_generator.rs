//! Audio Test File Generation Utilities
//!
//! Generates small WAV files with known sample values so tests can check the
//! decode -> resample -> downmix -> volume -> chunk pipeline exactly.

use hound::{SampleFormat, WavSpec, WavWriter};
use std::path::Path;

/// Output rate of the pipeline; fixtures at this rate skip resampling
pub const TEST_SAMPLE_RATE: u32 = 44_100;

fn spec(channels: u16, sample_rate: u32) -> WavSpec {
    WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    }
}

/// Mono WAV holding `value` for `frames` samples
pub fn generate_constant_wav<P: AsRef<Path>>(
    path: P,
    sample_rate: u32,
    frames: usize,
    value: i16,
) -> Result<(), hound::Error> {
    let mut writer = WavWriter::create(path, spec(1, sample_rate))?;
    for _ in 0..frames {
        writer.write_sample(value)?;
    }
    writer.finalize()
}

/// Mono 44.1 kHz WAV whose sample `i` equals `i` (a position marker).
///
/// `frames` must not exceed `i16::MAX + 1`.
pub fn generate_ramp_wav<P: AsRef<Path>>(path: P, frames: usize) -> Result<(), hound::Error> {
    assert!(frames <= i16::MAX as usize + 1, "ramp would overflow i16");
    let mut writer = WavWriter::create(path, spec(1, TEST_SAMPLE_RATE))?;
    for i in 0..frames {
        writer.write_sample(i as i16)?;
    }
    writer.finalize()
}

/// Stereo 44.1 kHz WAV with constant `left` and `right` channels
pub fn generate_stereo_wav<P: AsRef<Path>>(
    path: P,
    frames: usize,
    left: i16,
    right: i16,
) -> Result<(), hound::Error> {
    let mut writer = WavWriter::create(path, spec(2, TEST_SAMPLE_RATE))?;
    for _ in 0..frames {
        writer.write_sample(left)?;
        writer.write_sample(right)?;
    }
    writer.finalize()
}

/// Valid WAV header with no samples
pub fn generate_empty_wav<P: AsRef<Path>>(path: P) -> Result<(), hound::Error> {
    WavWriter::create(path, spec(1, TEST_SAMPLE_RATE))?.finalize()
}

/// A file with an audio extension that is not audio
pub fn write_text_file<P: AsRef<Path>>(path: P) -> std::io::Result<()> {
    std::fs::write(path, "this is not audio\n")
}
