//! Recording library
//!
//! A [`Recording`] is an immutable reference to one audio file on disk. The
//! [`RecordingLibrary`] holds every recording found directly inside the audio
//! directory and can be rescanned to pick up files that were added or removed.

use crate::error::{Error, Result};
use crate::sync::{read, write};
use std::collections::HashSet;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use tracing::{info, warn};

/// One audio file on disk plus its display name (the file stem)
#[derive(Debug, Clone)]
pub struct Recording {
    path: PathBuf,
    name: String,
}

impl Recording {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.to_string_lossy().into_owned());
        Self { path, name }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Path as persisted in the themes file
    pub fn path_str(&self) -> String {
        self.path.to_string_lossy().into_owned()
    }
}

impl PartialEq for Recording {
    fn eq(&self, other: &Self) -> bool {
        self.path == other.path
    }
}

impl Eq for Recording {}

impl Hash for Recording {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.path.hash(state);
    }
}

impl fmt::Display for Recording {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Result of a library rescan
#[derive(Debug, Default)]
pub struct LibraryChanges {
    pub added: Vec<Arc<Recording>>,
    pub removed: Vec<Arc<Recording>>,
}

impl LibraryChanges {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// All recordings available in the audio directory
pub struct RecordingLibrary {
    root: PathBuf,
    recordings: RwLock<Vec<Arc<Recording>>>,
}

impl RecordingLibrary {
    /// Scan `root` for recordings.
    pub fn scan(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        let recordings: Vec<Arc<Recording>> =
            read_recordings(&root)?.into_iter().map(Arc::new).collect();

        if recordings.is_empty() {
            warn!(
                "No audio files found in \"{}\". You will need to add some before you can stream anything.",
                root.display()
            );
        } else {
            info!(
                "Found {} recordings in \"{}\"",
                recordings.len(),
                root.display()
            );
        }

        for (kept, shadowed) in name_collisions(&recordings) {
            warn_collision(&kept, &shadowed);
        }

        Ok(Self {
            root,
            recordings: RwLock::new(recordings),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Snapshot of all recordings, sorted by name
    pub fn list(&self) -> Vec<Arc<Recording>> {
        read(&self.recordings).clone()
    }

    pub fn len(&self) -> usize {
        read(&self.recordings).len()
    }

    pub fn is_empty(&self) -> bool {
        read(&self.recordings).is_empty()
    }

    pub fn first(&self) -> Option<Arc<Recording>> {
        read(&self.recordings).first().cloned()
    }

    pub fn by_name(&self, name: &str) -> Option<Arc<Recording>> {
        read(&self.recordings)
            .iter()
            .find(|r| r.name() == name)
            .cloned()
    }

    pub fn by_path(&self, path: &Path) -> Option<Arc<Recording>> {
        read(&self.recordings)
            .iter()
            .find(|r| r.path() == path)
            .cloned()
    }

    /// Recordings that [`RecordingLibrary::by_name`] never returns because an
    /// earlier file has the same stem
    pub fn shadowed(&self) -> Vec<Arc<Recording>> {
        name_collisions(&read(&self.recordings))
            .into_iter()
            .map(|(_, shadowed)| shadowed)
            .collect()
    }

    /// Look up a recording by name, failing with `RecordingNotFound`
    pub fn require(&self, name: &str) -> Result<Arc<Recording>> {
        self.by_name(name)
            .ok_or_else(|| Error::RecordingNotFound(name.to_string()))
    }

    /// Re-read the audio directory.
    ///
    /// Recordings that are still present keep their existing `Arc`, so
    /// bindings that reference them stay valid.
    pub fn rescan(&self) -> Result<LibraryChanges> {
        let on_disk = read_recordings(&self.root)?;
        let mut recordings = write(&self.recordings);

        let present: HashSet<&Path> = on_disk.iter().map(|r| r.path()).collect();
        let known: HashSet<PathBuf> = recordings.iter().map(|r| r.path().to_path_buf()).collect();

        let mut changes = LibraryChanges::default();
        let (kept, removed): (Vec<_>, Vec<_>) = recordings
            .drain(..)
            .partition(|r| present.contains(r.path()));
        changes.removed = removed;

        let mut updated = kept;
        for recording in on_disk.iter().filter(|r| !known.contains(r.path())) {
            let recording = Arc::new(recording.clone());
            changes.added.push(Arc::clone(&recording));
            updated.push(recording);
        }
        updated.sort_by(|a, b| by_name_then_path(a, b));
        let collisions = name_collisions(&updated);
        *recordings = updated;
        drop(recordings);

        // Collisions among files that were already known were reported earlier
        for (kept, shadowed) in collisions {
            if changes
                .added
                .iter()
                .any(|r| Arc::ptr_eq(r, &kept) || Arc::ptr_eq(r, &shadowed))
            {
                warn_collision(&kept, &shadowed);
            }
        }

        for recording in &changes.added {
            info!("Recording added: \"{}\"", recording.name());
        }
        for recording in &changes.removed {
            warn!("Recording removed from disk: \"{}\"", recording.name());
        }

        Ok(changes)
    }
}

/// Every regular, non-hidden file directly inside `root`, sorted by name
fn read_recordings(root: &Path) -> Result<Vec<Recording>> {
    let entries = std::fs::read_dir(root).map_err(|e| {
        Error::Config(format!(
            "Failed to read audio directory \"{}\": {}",
            root.display(),
            e
        ))
    })?;

    let mut recordings = Vec::new();
    for entry in entries {
        let entry = entry?;
        let path = entry.path();
        let hidden = entry.file_name().to_string_lossy().starts_with('.');
        if hidden || !path.is_file() {
            continue;
        }
        recordings.push(Recording::new(path));
    }

    recordings.sort_by(by_name_then_path);
    Ok(recordings)
}

fn by_name_then_path(a: &Recording, b: &Recording) -> std::cmp::Ordering {
    a.name().cmp(b.name()).then_with(|| a.path().cmp(b.path()))
}

/// Pairs of (reachable, shadowed) recordings sharing a name; input is sorted
fn name_collisions(recordings: &[Arc<Recording>]) -> Vec<(Arc<Recording>, Arc<Recording>)> {
    let mut collisions = Vec::new();
    let mut first: Option<&Arc<Recording>> = None;
    for recording in recordings {
        match first {
            Some(kept) if kept.name() == recording.name() => {
                collisions.push((Arc::clone(kept), Arc::clone(recording)));
            }
            _ => first = Some(recording),
        }
    }
    collisions
}

fn warn_collision(kept: &Recording, shadowed: &Recording) {
    warn!(
        "\"{}\" and \"{}\" share the name \"{}\"; only the first can be bound. Rename one of them.",
        kept.path().display(),
        shadowed.path().display(),
        kept.name()
    );
}
