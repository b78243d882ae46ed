//! Stream session: mixer -> MP3 encoder -> pacer
//!
//! A [`StreamSession`] is a single-use, unbounded byte source. It is an
//! [`Iterator`] over encoded MP3 buffers and never ends on its own; the caller
//! stops pulling when the client goes away and drops the session, which closes
//! every decoder and the encoder.

use crate::audio::types::{Chunk, LOG_THRESHOLD};
use crate::audio::Mp3Encoder;
use crate::error::Result;
use crate::stream::metrics::{Resource, ResourceGuard, StreamMetrics};
use crate::stream::mixer::ThemeMixer;
use crate::stream::pacer::Pacer;
use crate::theme::Theme;
use amniotic_common::config::DEFAULT_BITRATE_KBPS;
use bytes::Bytes;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Per-session settings
#[derive(Debug, Clone, Copy)]
pub struct SessionConfig {
    pub bitrate_kbps: u32,
    /// Sleep to hold output to playback speed
    pub realtime: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            bitrate_kbps: DEFAULT_BITRATE_KBPS,
            realtime: true,
        }
    }
}

/// Result of one mixing tick
#[derive(Debug)]
pub struct Frame {
    /// Mixed PCM that was fed to the encoder
    pub pcm: Chunk,
    /// MP3 bytes LAME produced for it (may be empty)
    pub mp3: Vec<u8>,
}

pub struct StreamSession {
    theme_id: String,
    mixer: ThemeMixer,
    // Field order matters: the encoder guard must drop after the encoder
    encoder: Mp3Encoder,
    pacer: Pacer,
    ticks: u64,
    _encoder_guard: ResourceGuard,
    _session_guard: ResourceGuard,
}

impl StreamSession {
    pub fn new(theme: Arc<Theme>, config: SessionConfig, metrics: Arc<StreamMetrics>) -> Result<Self> {
        let theme_id = theme.id();
        let session_guard = metrics.acquire(Resource::Session);
        let encoder = Mp3Encoder::new(config.bitrate_kbps)?;
        let encoder_guard = metrics.acquire(Resource::Encoder);

        if !theme.has_enabled() {
            warn!(
                theme = %theme_id,
                "Theme has no enabled recordings; streaming silence"
            );
        }
        info!(
            theme = %theme_id,
            bitrate_kbps = config.bitrate_kbps,
            realtime = config.realtime,
            "Stream session started"
        );

        Ok(Self {
            theme_id,
            mixer: ThemeMixer::new(theme, metrics),
            encoder,
            pacer: Pacer::new(config.realtime),
            ticks: 0,
            _encoder_guard: encoder_guard,
            _session_guard: session_guard,
        })
    }

    pub fn theme_id(&self) -> &str {
        &self.theme_id
    }

    /// Seconds of audio produced so far
    pub fn audio_time(&self) -> f64 {
        self.pacer.audio_time()
    }

    /// Run one tick: mix, encode, then pace
    pub fn next_frame(&mut self) -> Result<Frame> {
        let pcm = self.mixer.next_chunk();
        let mp3 = self.encoder.encode(&pcm)?;
        let slept = self.pacer.advance(Chunk::duration_secs());

        self.ticks += 1;
        if self.ticks % LOG_THRESHOLD == 0 {
            debug!(
                theme = %self.theme_id,
                chunk = self.ticks,
                audio_time = format_args!("{:.2}", self.pacer.audio_time()),
                lead_ms = slept.as_millis() as u64,
                rms = format_args!("{:.1}", pcm.rms()),
                bytes_out = self.encoder.bytes_out(),
                "Stream progress"
            );
        }

        Ok(Frame { pcm, mp3 })
    }
}

impl Iterator for StreamSession {
    type Item = Bytes;

    /// Next non-empty MP3 buffer. `None` only after an encoder failure.
    fn next(&mut self) -> Option<Bytes> {
        loop {
            match self.next_frame() {
                Ok(frame) if frame.mp3.is_empty() => continue,
                Ok(frame) => return Some(Bytes::from(frame.mp3)),
                Err(e) => {
                    error!(theme = %self.theme_id, "Stream session aborted: {}", e);
                    return None;
                }
            }
        }
    }
}

impl Drop for StreamSession {
    fn drop(&mut self) {
        info!(
            theme = %self.theme_id,
            chunks = self.ticks,
            audio_secs = format_args!("{:.1}", self.pacer.audio_time()),
            bytes_out = self.encoder.bytes_out(),
            "Stream session closed"
        );
    }
}
