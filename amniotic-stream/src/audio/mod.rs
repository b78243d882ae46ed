//! Audio pipeline stages: decode, resample, encode

pub mod decoder;
pub mod encoder;
pub mod resampler;
pub mod types;

pub use decoder::{apply_volume, downmix_to_mono, TrackDecoder};
pub use encoder::{bitrate_from_kbps, Mp3Encoder};
pub use resampler::StreamResampler;
pub use types::{Chunk, CHUNK_SIZE, TARGET_CHANNELS, TARGET_SAMPLE_RATE};
