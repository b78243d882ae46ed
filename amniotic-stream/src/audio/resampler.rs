//! Audio resampling using rubato
//!
//! Converts decoded audio to the standard 44.1kHz output rate. Unlike a
//! one-shot converter, [`StreamResampler`] is fed one decoded packet at a time
//! and keeps both rubato's filter state and any input that did not fill a whole
//! resampler chunk, so consecutive packets (and consecutive passes over a
//! looping file) convert without seams.

use crate::audio::types::TARGET_SAMPLE_RATE;
use crate::error::{Error, Result};
use rubato::{FastFixedIn, PolynomialDegree, Resampler as RubatoResampler};
use tracing::debug;

/// Input frames handed to rubato per call
const RESAMPLER_CHUNK_FRAMES: usize = 1024;

/// Stateful sample rate converter for interleaved 16-bit PCM.
pub struct StreamResampler {
    inner: FastFixedIn<f32>,
    input_rate: u32,
    channels: usize,
    /// Planar input waiting for a full rubato chunk
    pending: Vec<Vec<f32>>,
}

impl StreamResampler {
    /// Create a converter from `input_rate` to [`TARGET_SAMPLE_RATE`].
    pub fn new(input_rate: u32, channels: usize) -> Result<Self> {
        if input_rate == 0 || channels == 0 {
            return Err(Error::Resample(format!(
                "Invalid resampler input: rate={} channels={}",
                input_rate, channels
            )));
        }

        debug!(
            "Creating resampler {}Hz -> {}Hz ({} channels)",
            input_rate, TARGET_SAMPLE_RATE, channels
        );

        // FastFixedIn gives a good quality/CPU tradeoff for many concurrent tracks
        let inner = FastFixedIn::<f32>::new(
            TARGET_SAMPLE_RATE as f64 / input_rate as f64,
            1.0, // max_relative_ratio (no runtime changes)
            PolynomialDegree::Septic,
            RESAMPLER_CHUNK_FRAMES,
            channels,
        )
        .map_err(|e| Error::Resample(format!("Failed to create resampler: {}", e)))?;

        Ok(Self {
            inner,
            input_rate,
            channels,
            pending: vec![Vec::with_capacity(RESAMPLER_CHUNK_FRAMES * 2); channels],
        })
    }

    pub fn input_rate(&self) -> u32 {
        self.input_rate
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    /// True if this converter matches the given source layout
    pub fn matches(&self, input_rate: u32, channels: usize) -> bool {
        self.input_rate == input_rate && self.channels == channels
    }

    /// Feed interleaved samples; returns whatever converted output is ready.
    ///
    /// Output is interleaved with the same channel count. It may be empty when
    /// less than one resampler chunk has accumulated.
    pub fn process(&mut self, interleaved: &[i16]) -> Result<Vec<i16>> {
        let planar = Self::deinterleave(interleaved, self.channels);
        for (pending, incoming) in self.pending.iter_mut().zip(planar) {
            pending.extend(incoming.into_iter().map(|s| s as f32 / 32768.0));
        }

        let mut output: Vec<Vec<f32>> = vec![Vec::new(); self.channels];

        loop {
            let needed = self.inner.input_frames_next();
            if self.pending[0].len() < needed {
                break;
            }

            let slices: Vec<&[f32]> = self.pending.iter().map(|c| &c[..needed]).collect();
            let converted = self
                .inner
                .process(&slices, None)
                .map_err(|e| Error::Resample(format!("Resampling failed: {}", e)))?;

            for (out, chunk) in output.iter_mut().zip(converted) {
                out.extend(chunk);
            }
            for pending in self.pending.iter_mut() {
                pending.drain(..needed);
            }
        }

        Ok(Self::interleave(output)
            .into_iter()
            .map(|s| (s * 32768.0).round() as i16)
            .collect())
    }

    /// Convert interleaved samples to planar format.
    ///
    /// Input:  [L, R, L, R, L, R, ...]
    /// Output: [[L, L, L, ...], [R, R, R, ...]]
    fn deinterleave(samples: &[i16], channels: usize) -> Vec<Vec<i16>> {
        let num_frames = samples.len() / channels;
        let mut planar = vec![Vec::with_capacity(num_frames); channels];

        for frame in samples.chunks_exact(channels) {
            for (ch_idx, &sample) in frame.iter().enumerate() {
                planar[ch_idx].push(sample);
            }
        }

        planar
    }

    /// Convert planar samples to interleaved format.
    ///
    /// Input:  [[L, L, L, ...], [R, R, R, ...]]
    /// Output: [L, R, L, R, L, R, ...]
    fn interleave(planar: Vec<Vec<f32>>) -> Vec<f32> {
        if planar.is_empty() {
            return Vec::new();
        }

        let num_channels = planar.len();
        let num_frames = planar[0].len();
        let mut interleaved = Vec::with_capacity(num_frames * num_channels);

        for frame_idx in 0..num_frames {
            for channel in &planar {
                interleaved.push(channel[frame_idx]);
            }
        }

        interleaved
    }
}
