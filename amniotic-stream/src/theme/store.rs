//! JSON persistence for themes
//!
//! File format:
//!
//! ```json
//! [
//!   { "name": "Rainy Day",
//!     "instances": [ { "path": "/data/audio/rain.mp3", "volume": 0.2, "is_enabled": true } ] }
//! ]
//! ```
//!
//! Loading is lenient: malformed entries and recordings that no longer exist
//! are skipped with a warning. Saving writes a temporary file and renames it
//! over the old one; saves are serialized so the last snapshot taken is the
//! one left on disk.

use super::{BindingState, Theme, TrackBinding, DEFAULT_VOLUME};
use crate::error::{Error, Result};
use crate::library::{Recording, RecordingLibrary};
use crate::sync::lock;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

fn default_volume() -> f32 {
    DEFAULT_VOLUME
}

/// Persisted binding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstanceRecord {
    pub path: String,
    #[serde(default = "default_volume")]
    pub volume: f32,
    #[serde(default)]
    pub is_enabled: bool,
}

/// Persisted theme
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThemeRecord {
    pub name: String,
    #[serde(default)]
    pub instances: Vec<InstanceRecord>,
}

impl ThemeRecord {
    pub fn from_theme(theme: &Theme) -> Self {
        Self {
            name: theme.name(),
            instances: theme
                .bindings()
                .iter()
                .map(|b| {
                    let state = b.snapshot();
                    InstanceRecord {
                        path: b.recording().path_str(),
                        volume: state.volume,
                        is_enabled: state.is_enabled,
                    }
                })
                .collect(),
        }
    }
}

/// Themes file on disk
#[derive(Debug)]
pub struct ThemeStore {
    path: PathBuf,
    // Held from snapshot to rename
    save_lock: Mutex<()>,
}

impl ThemeStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            save_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read raw records.
    ///
    /// A missing file yields no records. A file that is not a JSON array is an
    /// error so that a later save does not clobber it.
    pub fn load_records(&self) -> Result<Vec<ThemeRecord>> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(
                    "Themes file \"{}\" does not exist; starting with no themes",
                    self.path.display()
                );
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };

        let entries: Vec<serde_json::Value> = serde_json::from_str(&content).map_err(|e| {
            Error::Persistence(format!(
                "Failed to parse themes file \"{}\": {}",
                self.path.display(),
                e
            ))
        })?;

        let mut records = Vec::with_capacity(entries.len());
        for (index, entry) in entries.into_iter().enumerate() {
            match serde_json::from_value::<ThemeRecord>(entry) {
                Ok(record) => records.push(record),
                Err(e) => warn!("Skipping malformed theme entry #{}: {}", index, e),
            }
        }
        Ok(records)
    }

    /// Load themes, resolving each instance path against the library
    pub fn load(&self, library: &RecordingLibrary) -> Result<Vec<Theme>> {
        let records = self.load_records()?;
        let mut themes = Vec::with_capacity(records.len());

        for record in records {
            let theme = match Theme::new(&record.name) {
                Ok(theme) => theme,
                Err(e) => {
                    warn!("Skipping theme \"{}\": {}", record.name, e);
                    continue;
                }
            };

            for instance in record.instances {
                let Some(recording) = resolve(library, &instance.path) else {
                    warn!(
                        "Recording \"{}\" in theme \"{}\" no longer exists; skipping",
                        instance.path,
                        theme.name()
                    );
                    continue;
                };
                let binding = TrackBinding::with_state(
                    recording,
                    BindingState {
                        volume: instance.volume,
                        is_enabled: instance.is_enabled,
                    },
                );
                if !theme.insert_binding(Arc::new(binding)) {
                    debug!(
                        "Duplicate instance \"{}\" in theme \"{}\" ignored",
                        instance.path,
                        theme.name()
                    );
                }
            }

            themes.push(theme);
        }

        info!(
            "Loaded {} themes from \"{}\"",
            themes.len(),
            self.path.display()
        );
        Ok(themes)
    }

    /// Write all themes, replacing the file atomically
    pub fn save(&self, themes: &[Arc<Theme>]) -> Result<()> {
        self.save_snapshot(|| themes.to_vec())
    }

    /// Take the theme list with `snapshot` and write it.
    ///
    /// `snapshot` runs under the save lock, so concurrent callers write in the
    /// order their snapshots were taken.
    pub fn save_snapshot<F>(&self, snapshot: F) -> Result<()>
    where
        F: FnOnce() -> Vec<Arc<Theme>>,
    {
        let _guard = lock(&self.save_lock);
        let records: Vec<ThemeRecord> = snapshot()
            .iter()
            .map(|t| ThemeRecord::from_theme(t))
            .collect();
        let json = serde_json::to_string_pretty(&records)
            .map_err(|e| Error::Persistence(format!("Failed to serialize themes: {}", e)))?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json).map_err(|e| {
            Error::Persistence(format!("Failed to write \"{}\": {}", tmp.display(), e))
        })?;
        std::fs::rename(&tmp, &self.path).map_err(|e| {
            Error::Persistence(format!(
                "Failed to replace \"{}\": {}",
                self.path.display(),
                e
            ))
        })?;

        debug!("Saved {} themes to \"{}\"", records.len(), self.path.display());
        Ok(())
    }
}

/// Match a stored path exactly, then by file name inside the library root
fn resolve(library: &RecordingLibrary, stored: &str) -> Option<Arc<Recording>> {
    let stored = Path::new(stored);
    library.by_path(stored).or_else(|| {
        let file_name = stored.file_name()?;
        library.by_path(&library.root().join(file_name))
    })
}
