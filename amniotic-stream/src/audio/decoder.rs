//! Looping track decoder using symphonia
//!
//! A [`TrackDecoder`] turns one recording into an endless sequence of
//! [`Chunk`]s. Each call to [`TrackDecoder::next_chunk`] pulls packets
//! through demux -> decode -> resample -> downmix -> volume until a full chunk
//! is buffered. Leftover samples stay buffered for the next call, and at end of
//! file the source is reopened so the output loops without a gap.

use crate::audio::resampler::StreamResampler;
use crate::audio::types::{Chunk, CHUNK_SIZE, LOG_THRESHOLD, TARGET_SAMPLE_RATE};
use crate::error::{Error, Result};
use crate::theme::TrackBinding;
use std::collections::VecDeque;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{Decoder, DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, warn};

/// One decoded packet, interleaved at the source's native layout
struct DecodedPacket {
    samples: Vec<i16>,
    sample_rate: u32,
    channels: usize,
}

/// Open container + codec for a single pass over a file.
///
/// Dropping it closes the file and frees the codec.
struct SourceReader {
    format: Box<dyn FormatReader>,
    decoder: Box<dyn Decoder>,
    track_id: u32,
}

impl SourceReader {
    fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .map_err(|e| Error::Decode(format!("Failed to open {}: {}", path.display(), e)))?;
        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        // Create a hint to help the format registry guess the format
        let mut hint = Hint::new();
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            hint.with_extension(ext);
        }

        let probed = symphonia::default::get_probe()
            .format(
                &hint,
                mss,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|e| {
                Error::Decode(format!("Failed to probe {}: {}", path.display(), e))
            })?;
        let format = probed.format;

        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| Error::NoAudioStream(path.to_path_buf()))?;
        let track_id = track.id;

        let codecs = symphonia::default::get_codecs();
        let decoder = codecs
            .make(&track.codec_params, &DecoderOptions::default())
            .map_err(|e| {
                Error::Decode(format!(
                    "Failed to create decoder for {}: {}",
                    path.display(),
                    e
                ))
            })?;

        debug!(
            "Opened {}: codec={}, rate={:?}, channels={:?}",
            path.display(),
            codecs
                .get_codec(track.codec_params.codec)
                .map(|d| d.short_name)
                .unwrap_or("unknown"),
            track.codec_params.sample_rate,
            track.codec_params.channels.map(|c| c.count()),
        );

        Ok(Self {
            format,
            decoder,
            track_id,
        })
    }

    /// Next decoded packet of our track, or `None` at end of file
    fn next_packet(&mut self) -> Result<Option<DecodedPacket>> {
        loop {
            let packet = match self.format.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(ref e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    return Ok(None);
                }
                // Chained streams; treat the boundary as end of pass
                Err(SymphoniaError::ResetRequired) => return Ok(None),
                Err(e) => return Err(Error::Decode(format!("Failed to read packet: {}", e))),
            };

            // Skip packets for other tracks
            if packet.track_id() != self.track_id {
                continue;
            }

            match self.decoder.decode(&packet) {
                Ok(decoded) => {
                    let spec = *decoded.spec();
                    let mut buf = SampleBuffer::<i16>::new(decoded.capacity() as u64, spec);
                    buf.copy_interleaved_ref(decoded);
                    return Ok(Some(DecodedPacket {
                        samples: buf.samples().to_vec(),
                        sample_rate: spec.rate,
                        channels: spec.channels.count(),
                    }));
                }
                Err(SymphoniaError::DecodeError(e)) => {
                    // Corrupt frame; skip it and keep going
                    warn!("Decode error (skipping packet): {}", e);
                    continue;
                }
                Err(e) => return Err(Error::Decode(format!("Decoder failed: {}", e))),
            }
        }
    }
}

/// Endless chunk source for one binding within one session
pub struct TrackDecoder {
    binding: Arc<TrackBinding>,
    path: PathBuf,
    /// `None` between passes; reopened lazily
    source: Option<SourceReader>,
    /// Persists across passes so the loop point has no filter discontinuity
    resampler: Option<StreamResampler>,
    /// Mono, volume-scaled samples waiting to be sliced into chunks
    pending: VecDeque<i16>,
    chunks_emitted: u64,
    passes_completed: u64,
    samples_this_pass: usize,
}

impl TrackDecoder {
    /// Open the binding's recording.
    ///
    /// Fails if the file is missing, unreadable or has no audio stream.
    pub fn open(binding: Arc<TrackBinding>) -> Result<Self> {
        let path = binding.recording().path().to_path_buf();
        let source = SourceReader::open(&path)?;
        Ok(Self {
            binding,
            path,
            source: Some(source),
            resampler: None,
            pending: VecDeque::with_capacity(CHUNK_SIZE * 4),
            chunks_emitted: 0,
            passes_completed: 0,
            samples_this_pass: 0,
        })
    }

    pub fn chunks_emitted(&self) -> u64 {
        self.chunks_emitted
    }

    /// Number of times the file has been decoded to its end
    pub fn passes_completed(&self) -> u64 {
        self.passes_completed
    }

    /// Produce the next chunk, looping the file as needed
    pub fn next_chunk(&mut self) -> Result<Chunk> {
        while self.pending.len() < CHUNK_SIZE {
            self.fill()?;
        }

        let samples: Vec<i16> = self.pending.drain(..CHUNK_SIZE).collect();
        let chunk = Chunk::from_samples(samples)
            .ok_or_else(|| Error::Internal("Chunk slicing produced a short chunk".to_string()))?;

        self.chunks_emitted += 1;
        if self.chunks_emitted % LOG_THRESHOLD == 0 {
            debug!(
                recording = %self.binding.name(),
                chunk = self.chunks_emitted,
                pending = self.pending.len(),
                passes = self.passes_completed,
                rms = format_args!("{:.1}", chunk.rms()),
                "Decoder progress"
            );
        }
        Ok(chunk)
    }

    /// Decode one packet into `pending`, or finish the current pass
    fn fill(&mut self) -> Result<()> {
        let mut source = match self.source.take() {
            Some(source) => source,
            None => {
                self.samples_this_pass = 0;
                SourceReader::open(&self.path)?
            }
        };

        match source.next_packet()? {
            Some(packet) => {
                self.source = Some(source);
                self.samples_this_pass += packet.samples.len();
                self.push_packet(packet)
            }
            None => {
                drop(source);
                if self.samples_this_pass == 0 {
                    return Err(Error::Decode(format!(
                        "No audio decoded from {}",
                        self.path.display()
                    )));
                }
                self.passes_completed += 1;
                debug!(
                    "\"{}\" reached end of file; looping (pass {})",
                    self.binding.name(),
                    self.passes_completed + 1
                );
                Ok(())
            }
        }
    }

    fn push_packet(&mut self, packet: DecodedPacket) -> Result<()> {
        let channels = packet.channels.max(1);
        let interleaved = match self.resampler_for(packet.sample_rate, channels)? {
            Some(resampler) => resampler.process(&packet.samples)?,
            None => packet.samples,
        };

        let mut mono = downmix_to_mono(&interleaved, channels);
        // Read per packet so volume changes apply promptly
        apply_volume(&mut mono, self.binding.volume());
        self.pending.extend(mono);
        Ok(())
    }

    fn resampler_for(
        &mut self,
        sample_rate: u32,
        channels: usize,
    ) -> Result<Option<&mut StreamResampler>> {
        if sample_rate == TARGET_SAMPLE_RATE {
            return Ok(None);
        }
        let reusable = self
            .resampler
            .as_ref()
            .is_some_and(|r| r.matches(sample_rate, channels));
        if !reusable {
            self.resampler = Some(StreamResampler::new(sample_rate, channels)?);
        }
        Ok(self.resampler.as_mut())
    }
}

impl Drop for TrackDecoder {
    fn drop(&mut self) {
        debug!(
            "Closing decoder for \"{}\" after {} chunks",
            self.binding.name(),
            self.chunks_emitted
        );
    }
}

/// Average interleaved frames down to one channel.
///
/// The mean is truncated back to `i16`.
pub fn downmix_to_mono(samples: &[i16], channels: usize) -> Vec<i16> {
    if channels <= 1 {
        return samples.to_vec();
    }
    samples
        .chunks_exact(channels)
        .map(|frame| {
            let sum: f64 = frame.iter().map(|&s| s as f64).sum();
            (sum / channels as f64) as i16
        })
        .collect()
}

/// Scale samples by a linear gain, truncating toward zero.
///
/// The cast saturates at the `i16` range.
pub fn apply_volume(samples: &mut [i16], volume: f32) {
    for sample in samples.iter_mut() {
        *sample = (*sample as f32 * volume) as i16;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_downmix_averages_and_truncates() {
        assert_eq!(downmix_to_mono(&[100, 200, -3, 0], 2), vec![150, -1]);
        assert_eq!(downmix_to_mono(&[1, 2, 3], 1), vec![1, 2, 3]);
        // Incomplete trailing frame is dropped
        assert_eq!(downmix_to_mono(&[10, 20, 30], 2), vec![15]);
    }

    #[test]
    fn test_downmix_extremes_do_not_overflow() {
        assert_eq!(downmix_to_mono(&[i16::MAX, i16::MAX], 2), vec![i16::MAX]);
        assert_eq!(downmix_to_mono(&[i16::MIN, i16::MIN], 2), vec![i16::MIN]);
    }

    #[test]
    fn test_apply_volume() {
        let mut samples = vec![10_000, -10_000, 3, i16::MAX];
        apply_volume(&mut samples, 0.5);
        assert_eq!(samples, vec![5_000, -5_000, 1, 16_383]);

        let mut loud = vec![30_000];
        apply_volume(&mut loud, 2.0);
        assert_eq!(loud, vec![i16::MAX]);
    }

    #[test]
    fn test_open_missing_file() {
        let binding = Arc::new(TrackBinding::new(Arc::new(
            crate::library::Recording::new("/nonexistent/nothing.wav"),
        )));
        assert!(matches!(TrackDecoder::open(binding), Err(Error::Decode(_))));
    }
}
