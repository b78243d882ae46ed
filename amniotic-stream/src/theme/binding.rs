//! Per-theme, per-recording mix state

use crate::error::{Error, Result};
use crate::library::Recording;
use crate::sync::{read, write};
use serde::Serialize;
use std::fmt;
use std::sync::{Arc, RwLock};
use uuid::Uuid;

/// Volume given to a recording when it is first added to a theme
pub const DEFAULT_VOLUME: f32 = 0.2;

/// Stable identity of a binding, used to key per-session decoders
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct BindingId(Uuid);

impl BindingId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for BindingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Snapshot of a binding's mutable state
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BindingState {
    /// Linear gain, 0.0-1.0
    pub volume: f32,
    pub is_enabled: bool,
}

impl Default for BindingState {
    fn default() -> Self {
        Self {
            volume: DEFAULT_VOLUME,
            is_enabled: false,
        }
    }
}

/// A recording as configured within one theme.
///
/// Volume and enabled flag live behind a single lock so readers always see a
/// consistent pair.
#[derive(Debug)]
pub struct TrackBinding {
    id: BindingId,
    recording: Arc<Recording>,
    state: RwLock<BindingState>,
}

impl TrackBinding {
    /// New binding with default volume, disabled
    pub fn new(recording: Arc<Recording>) -> Self {
        Self::with_state(recording, BindingState::default())
    }

    pub fn with_state(recording: Arc<Recording>, state: BindingState) -> Self {
        Self {
            id: BindingId::new(),
            recording,
            state: RwLock::new(BindingState {
                volume: clamp_volume(state.volume),
                is_enabled: state.is_enabled,
            }),
        }
    }

    pub fn id(&self) -> BindingId {
        self.id
    }

    pub fn recording(&self) -> &Arc<Recording> {
        &self.recording
    }

    /// Display name of the bound recording
    pub fn name(&self) -> &str {
        self.recording.name()
    }

    pub fn snapshot(&self) -> BindingState {
        *read(&self.state)
    }

    pub fn volume(&self) -> f32 {
        read(&self.state).volume
    }

    pub fn is_enabled(&self) -> bool {
        read(&self.state).is_enabled
    }

    /// Set linear volume; values outside 0.0-1.0 are clamped
    pub fn set_volume(&self, volume: f32) {
        write(&self.state).volume = clamp_volume(volume);
    }

    /// Set volume from the 0-100 control scale
    pub fn set_volume_percent(&self, percent: u8) -> Result<()> {
        if percent > 100 {
            return Err(Error::BadRequest(format!(
                "Volume must be between 0 and 100, got {}",
                percent
            )));
        }
        self.set_volume(percent as f32 / 100.0);
        Ok(())
    }

    /// Volume on the 0-100 control scale
    pub fn volume_percent(&self) -> u8 {
        (self.volume() * 100.0).round() as u8
    }

    pub fn set_enabled(&self, enabled: bool) {
        write(&self.state).is_enabled = enabled;
    }
}

fn clamp_volume(volume: f32) -> f32 {
    if volume.is_nan() {
        DEFAULT_VOLUME
    } else {
        volume.clamp(0.0, 1.0)
    }
}
