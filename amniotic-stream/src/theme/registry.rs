//! Application-wide theme registry
//!
//! The registry is the control plane's entry point: it owns every [`Theme`],
//! resolves recordings through the [`RecordingLibrary`] and exposes the
//! operations the control surface needs (create/rename/delete themes, bind
//! recordings, set volume and enabled state, select the current items).

use super::{BindingId, Theme, TrackBinding};
use crate::error::{Error, Result};
use crate::library::{LibraryChanges, Recording, RecordingLibrary};
use crate::sync::{read, write};
use amniotic_common::slugify;
use serde::Serialize;
use std::sync::{Arc, RwLock};
use tracing::{info, warn};

/// Name given to the theme synthesized when none exist
pub const DEFAULT_THEME_NAME: &str = "Default";

/// Control-surface view of one binding
#[derive(Debug, Clone, Serialize)]
pub struct BindingInfo {
    pub id: BindingId,
    pub name: String,
    pub path: String,
    /// Volume on the 0-100 control scale
    pub volume: u8,
    pub is_enabled: bool,
    pub is_current: bool,
}

/// Owner of all themes
pub struct ThemeRegistry {
    library: Arc<RecordingLibrary>,
    themes: RwLock<Vec<Arc<Theme>>>,
    /// Id of the theme selected in the control surface
    current: RwLock<Option<String>>,
}

impl ThemeRegistry {
    pub fn new(library: Arc<RecordingLibrary>) -> Self {
        Self::with_themes(library, Vec::new())
    }

    /// Build a registry from loaded themes; later duplicates of an id are dropped
    pub fn with_themes(library: Arc<RecordingLibrary>, themes: Vec<Theme>) -> Self {
        let mut unique: Vec<Arc<Theme>> = Vec::with_capacity(themes.len());
        for theme in themes {
            let id = theme.id();
            if unique.iter().any(|t| t.id() == id) {
                warn!(
                    "Duplicate theme id \"{}\" (\"{}\"); keeping the first one",
                    id,
                    theme.name()
                );
                continue;
            }
            unique.push(Arc::new(theme));
        }

        Self {
            library,
            themes: RwLock::new(unique),
            current: RwLock::new(None),
        }
    }

    pub fn library(&self) -> &Arc<RecordingLibrary> {
        &self.library
    }

    // ------------------------------------------------------------------
    // Themes
    // ------------------------------------------------------------------

    pub fn list_themes(&self) -> Vec<Arc<Theme>> {
        read(&self.themes).clone()
    }

    pub fn theme_count(&self) -> usize {
        read(&self.themes).len()
    }

    pub fn theme(&self, id: &str) -> Result<Arc<Theme>> {
        read(&self.themes)
            .iter()
            .find(|t| t.id() == id)
            .cloned()
            .ok_or_else(|| Error::ThemeNotFound(id.to_string()))
    }

    pub fn create_theme(&self, name: &str) -> Result<Arc<Theme>> {
        let theme = Theme::new(name)?;
        let id = theme.id();

        let mut themes = write(&self.themes);
        if themes.iter().any(|t| t.id() == id) {
            return Err(Error::Conflict(format!("Theme \"{}\" already exists", id)));
        }
        let theme = Arc::new(theme);
        themes.push(Arc::clone(&theme));
        drop(themes);

        info!("Created theme \"{}\" ({})", theme.name(), id);
        Ok(theme)
    }

    pub fn rename_theme(&self, id: &str, new_name: &str) -> Result<Arc<Theme>> {
        let new_id = slugify(new_name);
        let themes = write(&self.themes);
        let theme = themes
            .iter()
            .find(|t| t.id() == id)
            .cloned()
            .ok_or_else(|| Error::ThemeNotFound(id.to_string()))?;
        if !new_id.is_empty() && new_id != id && themes.iter().any(|t| t.id() == new_id) {
            return Err(Error::Conflict(format!("Theme \"{}\" already exists", new_id)));
        }
        theme.set_name(new_name)?;
        drop(themes);

        let mut current = write(&self.current);
        if current.as_deref() == Some(id) {
            *current = Some(new_id.clone());
        }

        info!("Renamed theme \"{}\" to \"{}\" ({})", id, theme.name(), new_id);
        Ok(theme)
    }

    /// Remove a theme. Live sessions keep streaming their own handle to it.
    pub fn delete_theme(&self, id: &str) -> Result<Arc<Theme>> {
        let removed = {
            let mut themes = write(&self.themes);
            let index = themes
                .iter()
                .position(|t| t.id() == id)
                .ok_or_else(|| Error::ThemeNotFound(id.to_string()))?;
            themes.remove(index)
        };

        let mut current = write(&self.current);
        if current.as_deref() == Some(id) {
            *current = None;
        }

        info!("Deleted theme \"{}\"", removed.name());
        Ok(removed)
    }

    pub fn select_theme(&self, id: &str) -> Result<Arc<Theme>> {
        let theme = self.theme(id)?;
        *write(&self.current) = Some(theme.id());
        Ok(theme)
    }

    /// The selected theme, falling back to the first one
    pub fn current_theme(&self) -> Option<Arc<Theme>> {
        let selected = read(&self.current).clone();
        selected
            .and_then(|id| self.theme(&id).ok())
            .or_else(|| read(&self.themes).first().cloned())
    }

    /// Create the default theme if no theme exists.
    ///
    /// The default theme binds the first recording in the library (disabled).
    pub fn ensure_default_theme(&self) -> Result<Option<Arc<Theme>>> {
        if self.theme_count() > 0 {
            return Ok(None);
        }

        warn!("No themes exist. Creating default...");
        let theme = self.create_theme(DEFAULT_THEME_NAME)?;
        if let Some(recording) = self.library.first() {
            let binding = theme.add_binding(recording);
            theme.select(binding.id())?;
        }
        Ok(Some(theme))
    }

    // ------------------------------------------------------------------
    // Bindings
    // ------------------------------------------------------------------

    pub fn recording(&self, name: &str) -> Result<Arc<Recording>> {
        self.library.require(name)
    }

    fn binding(&self, theme_id: &str, recording_name: &str) -> Result<Arc<TrackBinding>> {
        let theme = self.theme(theme_id)?;
        theme
            .binding(recording_name)
            .ok_or_else(|| Error::BindingNotFound {
                theme: theme_id.to_string(),
                recording: recording_name.to_string(),
            })
    }

    pub fn add_binding(&self, theme_id: &str, recording_name: &str) -> Result<Arc<TrackBinding>> {
        let theme = self.theme(theme_id)?;
        let recording = self.recording(recording_name)?;
        let binding = theme.add_binding(recording);
        info!(
            "Theme \"{}\" now includes recording \"{}\"",
            theme.name(),
            binding.name()
        );
        Ok(binding)
    }

    pub fn remove_binding(
        &self,
        theme_id: &str,
        recording_name: &str,
    ) -> Result<Arc<TrackBinding>> {
        let theme = self.theme(theme_id)?;
        let removed = theme
            .remove_binding(recording_name)
            .ok_or_else(|| Error::BindingNotFound {
                theme: theme_id.to_string(),
                recording: recording_name.to_string(),
            })?;
        info!(
            "Removed recording \"{}\" from theme \"{}\"",
            removed.name(),
            theme.name()
        );
        Ok(removed)
    }

    /// Set volume on the 0-100 control scale
    pub fn set_volume(
        &self,
        theme_id: &str,
        recording_name: &str,
        percent: u8,
    ) -> Result<Arc<TrackBinding>> {
        let binding = self.binding(theme_id, recording_name)?;
        binding.set_volume_percent(percent)?;
        info!(
            "Setting volume to {} for recording \"{}\" in theme \"{}\"",
            percent, recording_name, theme_id
        );
        Ok(binding)
    }

    pub fn set_enabled(
        &self,
        theme_id: &str,
        recording_name: &str,
        enabled: bool,
    ) -> Result<Arc<TrackBinding>> {
        let binding = self.binding(theme_id, recording_name)?;
        binding.set_enabled(enabled);
        info!(
            "Toggling enabled={} for recording \"{}\" in theme \"{}\"",
            enabled, recording_name, theme_id
        );
        Ok(binding)
    }

    /// Make a recording the theme's current binding, binding it first if needed
    pub fn select_binding(
        &self,
        theme_id: &str,
        recording_name: &str,
    ) -> Result<Arc<TrackBinding>> {
        let theme = self.theme(theme_id)?;
        let binding = match theme.binding(recording_name) {
            Some(binding) => binding,
            None => {
                info!(
                    "Creating new binding for recording \"{}\" in theme \"{}\"",
                    recording_name,
                    theme.name()
                );
                theme.add_binding(self.recording(recording_name)?)
            }
        };
        theme.select(binding.id())?;
        Ok(binding)
    }

    pub fn clear_selection(&self, theme_id: &str) -> Result<()> {
        self.theme(theme_id)?.clear_selection();
        Ok(())
    }

    pub fn list_bindings(&self, theme_id: &str) -> Result<Vec<BindingInfo>> {
        let theme = self.theme(theme_id)?;
        let current = theme.current().map(|b| b.id());
        Ok(theme
            .bindings()
            .iter()
            .map(|b| {
                let state = b.snapshot();
                BindingInfo {
                    id: b.id(),
                    name: b.name().to_string(),
                    path: b.recording().path_str(),
                    volume: (state.volume * 100.0).round() as u8,
                    is_enabled: state.is_enabled,
                    is_current: current == Some(b.id()),
                }
            })
            .collect())
    }

    // ------------------------------------------------------------------
    // Library reconciliation
    // ------------------------------------------------------------------

    /// Rescan the library and drop bindings whose recordings vanished
    pub fn reconcile_library(&self) -> Result<LibraryChanges> {
        let changes = self.library.rescan()?;
        if !changes.removed.is_empty() {
            self.drop_bindings_for(&changes.removed);
        }
        Ok(changes)
    }

    fn drop_bindings_for(&self, removed: &[Arc<Recording>]) -> usize {
        let mut dropped = 0;
        for theme in self.list_themes() {
            let gone = theme.retain_bindings(|b| !removed.iter().any(|r| r == b.recording()));
            for binding in &gone {
                warn!(
                    "Dropping recording \"{}\" from theme \"{}\": file no longer exists",
                    binding.name(),
                    theme.name()
                );
            }
            dropped += gone.len();
        }
        dropped
    }
}
