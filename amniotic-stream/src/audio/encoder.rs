//! Streaming MP3 encoder using LAME
//!
//! Accepts mono chunks at [`TARGET_SAMPLE_RATE`] and returns whatever MP3
//! bytes LAME produced for them. LAME buffers internally, so early calls may
//! return nothing. Sessions never end on their own, so the tail LAME still
//! holds when a client disconnects is discarded rather than flushed.

use crate::audio::types::{Chunk, TARGET_CHANNELS, TARGET_SAMPLE_RATE};
use crate::error::{Error, Result};
use mp3lame_encoder::{Bitrate, Builder, MonoPcm, Quality};
use tracing::debug;

/// Bitrates LAME accepts for CBR output
pub const SUPPORTED_BITRATES_KBPS: [u32; 16] = [
    8, 16, 24, 32, 40, 48, 64, 80, 96, 112, 128, 160, 192, 224, 256, 320,
];

/// Map a kbps value onto LAME's bitrate enum
pub fn bitrate_from_kbps(kbps: u32) -> Result<Bitrate> {
    let bitrate = match kbps {
        8 => Bitrate::Kbps8,
        16 => Bitrate::Kbps16,
        24 => Bitrate::Kbps24,
        32 => Bitrate::Kbps32,
        40 => Bitrate::Kbps40,
        48 => Bitrate::Kbps48,
        64 => Bitrate::Kbps64,
        80 => Bitrate::Kbps80,
        96 => Bitrate::Kbps96,
        112 => Bitrate::Kbps112,
        128 => Bitrate::Kbps128,
        160 => Bitrate::Kbps160,
        192 => Bitrate::Kbps192,
        224 => Bitrate::Kbps224,
        256 => Bitrate::Kbps256,
        320 => Bitrate::Kbps320,
        other => {
            return Err(Error::Config(format!(
                "Unsupported MP3 bitrate {} kbps (expected one of {:?})",
                other, SUPPORTED_BITRATES_KBPS
            )))
        }
    };
    Ok(bitrate)
}

/// LAME's worst-case output size for `samples` input samples
fn output_capacity(samples: usize) -> usize {
    ((samples as f64) * 1.25 + 7200.0) as usize
}

/// Mono MP3 encoder for one stream session
pub struct Mp3Encoder {
    lame: mp3lame_encoder::Encoder,
    bytes_out: u64,
}

impl Mp3Encoder {
    pub fn new(bitrate_kbps: u32) -> Result<Self> {
        let bitrate = bitrate_from_kbps(bitrate_kbps)?;

        let mut builder = Builder::new()
            .ok_or_else(|| Error::Encode("Failed to create LAME encoder builder".to_string()))?;
        builder
            .set_num_channels(TARGET_CHANNELS as u8)
            .map_err(|e| Error::Encode(format!("Failed to set channel count: {:?}", e)))?;
        builder
            .set_sample_rate(TARGET_SAMPLE_RATE)
            .map_err(|e| Error::Encode(format!("Failed to set sample rate: {:?}", e)))?;
        builder
            .set_brate(bitrate)
            .map_err(|e| Error::Encode(format!("Failed to set bitrate: {:?}", e)))?;
        builder
            .set_quality(Quality::Best)
            .map_err(|e| Error::Encode(format!("Failed to set encoding quality: {:?}", e)))?;

        let lame = builder
            .build()
            .map_err(|e| Error::Encode(format!("Failed to build LAME encoder: {:?}", e)))?;

        debug!("MP3 encoder ready: {} kbps mono", bitrate_kbps);
        Ok(Self { lame, bytes_out: 0 })
    }

    /// Total MP3 bytes produced so far
    pub fn bytes_out(&self) -> u64 {
        self.bytes_out
    }

    /// Encode one chunk; the result may be empty while LAME fills a frame
    pub fn encode(&mut self, chunk: &Chunk) -> Result<Vec<u8>> {
        let samples = chunk.samples();
        let mut mp3_buffer: Vec<u8> = Vec::with_capacity(output_capacity(samples.len()));

        let written = self
            .lame
            .encode(MonoPcm(samples), mp3_buffer.spare_capacity_mut())
            .map_err(|e| Error::Encode(format!("LAME encoding error: {:?}", e)))?;

        // SAFETY: LAME initialized exactly `written` bytes of the spare capacity.
        unsafe {
            mp3_buffer.set_len(written);
        }
        self.bytes_out += written as u64;
        Ok(mp3_buffer)
    }
}
