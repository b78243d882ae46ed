//! Core audio data types
//!
//! Every stage of the streaming pipeline exchanges fixed-size chunks of mono,
//! signed 16-bit PCM at a single sample rate.

/// Output sample rate for all audio
pub const TARGET_SAMPLE_RATE: u32 = 44_100;

/// Output channel count (mono)
pub const TARGET_CHANNELS: usize = 1;

/// Samples per chunk
pub const CHUNK_SIZE: usize = 1_024;

/// Emit a progress log line every this many chunks
pub const LOG_THRESHOLD: u64 = 500;

/// One chunk of mono 16-bit PCM at [`TARGET_SAMPLE_RATE`].
///
/// Always holds exactly [`CHUNK_SIZE`] samples.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    samples: Vec<i16>,
}

impl Chunk {
    /// All-zero chunk
    pub fn silence() -> Self {
        Self {
            samples: vec![0; CHUNK_SIZE],
        }
    }

    /// Build a chunk from exactly [`CHUNK_SIZE`] samples.
    ///
    /// Returns `None` for any other length.
    pub fn from_samples(samples: Vec<i16>) -> Option<Self> {
        (samples.len() == CHUNK_SIZE).then_some(Self { samples })
    }

    pub fn samples(&self) -> &[i16] {
        &self.samples
    }

    pub fn is_silent(&self) -> bool {
        self.samples.iter().all(|&s| s == 0)
    }

    /// Duration of one chunk in seconds
    pub fn duration_secs() -> f64 {
        CHUNK_SIZE as f64 / TARGET_SAMPLE_RATE as f64
    }

    /// Root-mean-square level, for diagnostics
    pub fn rms(&self) -> f64 {
        let sum: f64 = self.samples.iter().map(|&s| (s as f64) * (s as f64)).sum();
        (sum / self.samples.len() as f64).sqrt()
    }
}
