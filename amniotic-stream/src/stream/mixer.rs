//! Per-session theme mixer
//!
//! Each tick the mixer snapshots the theme's enabled bindings, pulls one chunk
//! from each binding's decoder and averages them into a single chunk.
//!
//! Decoders are created the first time a binding is seen enabled and kept
//! while the binding stays in the theme, even when it is disabled. This is
//! what makes disable/enable behave like pause/resume. A decoder that fails is
//! replaced by a silent slot and reopened after [`DECODER_RETRY_TICKS`].

use crate::audio::{Chunk, TrackDecoder, CHUNK_SIZE};
use crate::stream::metrics::{Resource, ResourceGuard, StreamMetrics};
use crate::theme::{BindingId, Theme, TrackBinding};
use std::collections::{HashMap, HashSet};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Ticks to wait before reopening a failed decoder (about five seconds)
pub const DECODER_RETRY_TICKS: u64 = 215;

enum DecoderSlot {
    Active {
        decoder: TrackDecoder,
        _guard: ResourceGuard,
    },
    /// Contributes silence until `retry_at_tick`
    Failed { retry_at_tick: u64 },
}

/// Average chunks sample by sample, rounding to nearest.
///
/// An empty input yields silence.
pub fn mix(chunks: &[Chunk]) -> Chunk {
    match chunks {
        [] => Chunk::silence(),
        [single] => single.clone(),
        _ => {
            let count = chunks.len() as f64;
            let samples: Vec<i16> = (0..CHUNK_SIZE)
                .map(|i| {
                    let sum: i64 = chunks.iter().map(|c| c.samples()[i] as i64).sum();
                    (sum as f64 / count).round() as i16
                })
                .collect();
            Chunk::from_samples(samples).unwrap_or_else(Chunk::silence)
        }
    }
}

/// Mixes the enabled bindings of one theme
pub struct ThemeMixer {
    theme: Arc<Theme>,
    slots: HashMap<BindingId, DecoderSlot>,
    metrics: Arc<StreamMetrics>,
    tick: u64,
}

impl ThemeMixer {
    pub fn new(theme: Arc<Theme>, metrics: Arc<StreamMetrics>) -> Self {
        Self {
            theme,
            slots: HashMap::new(),
            metrics,
            tick: 0,
        }
    }

    pub fn theme(&self) -> &Arc<Theme> {
        &self.theme
    }

    /// Ticks mixed so far
    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Decoders currently open (failed slots excluded)
    pub fn open_decoders(&self) -> usize {
        self.slots
            .values()
            .filter(|s| matches!(s, DecoderSlot::Active { .. }))
            .count()
    }

    /// Chunks produced so far by a binding's decoder, if it has one
    pub fn decoder_chunks(&self, id: BindingId) -> Option<u64> {
        match self.slots.get(&id)? {
            DecoderSlot::Active { decoder, .. } => Some(decoder.chunks_emitted()),
            DecoderSlot::Failed { .. } => None,
        }
    }

    /// Mix the next chunk
    pub fn next_chunk(&mut self) -> Chunk {
        self.tick += 1;
        self.prune_removed();

        let enabled = self.theme.enabled_bindings();
        if enabled.is_empty() {
            return Chunk::silence();
        }

        let chunks: Vec<Chunk> = enabled.iter().map(|b| self.pull(b)).collect();
        mix(&chunks)
    }

    /// Close decoders whose binding left the theme
    fn prune_removed(&mut self) {
        if self.slots.is_empty() {
            return;
        }
        let live: HashSet<BindingId> = self.theme.bindings().iter().map(|b| b.id()).collect();
        self.slots.retain(|id, _| {
            let keep = live.contains(id);
            if !keep {
                debug!("Binding {} removed from theme; closing its decoder", id);
            }
            keep
        });
    }

    fn pull(&mut self, binding: &Arc<TrackBinding>) -> Chunk {
        let tick = self.tick;
        let id = binding.id();

        let needs_open = match self.slots.get(&id) {
            None => true,
            Some(DecoderSlot::Failed { retry_at_tick }) => tick >= *retry_at_tick,
            Some(DecoderSlot::Active { .. }) => false,
        };
        if needs_open {
            let slot = open_slot(binding, &self.metrics, tick);
            self.slots.insert(id, slot);
        }

        let Some(slot) = self.slots.get_mut(&id) else {
            return Chunk::silence();
        };
        let result = match slot {
            DecoderSlot::Failed { .. } => return Chunk::silence(),
            DecoderSlot::Active { decoder, .. } => {
                catch_unwind(AssertUnwindSafe(|| decoder.next_chunk()))
            }
        };

        match result {
            Ok(Ok(chunk)) => chunk,
            Ok(Err(e)) => {
                warn!(
                    "Track \"{}\" failed mid-stream: {}; substituting silence",
                    binding.name(),
                    e
                );
                self.metrics.record_decoder_failure();
                *slot = DecoderSlot::Failed {
                    retry_at_tick: tick + DECODER_RETRY_TICKS,
                };
                Chunk::silence()
            }
            Err(_) => {
                error!(
                    "Decoder for \"{}\" panicked; substituting silence",
                    binding.name()
                );
                self.metrics.record_decoder_failure();
                *slot = DecoderSlot::Failed {
                    retry_at_tick: tick + DECODER_RETRY_TICKS,
                };
                Chunk::silence()
            }
        }
    }
}

fn open_slot(binding: &Arc<TrackBinding>, metrics: &Arc<StreamMetrics>, tick: u64) -> DecoderSlot {
    match TrackDecoder::open(Arc::clone(binding)) {
        Ok(decoder) => {
            debug!("Opened decoder for \"{}\"", binding.name());
            DecoderSlot::Active {
                decoder,
                _guard: metrics.acquire(Resource::Decoder),
            }
        }
        Err(e) => {
            warn!(
                "Unable to open \"{}\": {}; substituting silence",
                binding.name(),
                e
            );
            metrics.record_decoder_failure();
            DecoderSlot::Failed {
                retry_at_tick: tick + DECODER_RETRY_TICKS,
            }
        }
    }
}
