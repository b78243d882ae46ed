//! Themes: named, user-editable mixes of recordings
//!
//! A [`Theme`] owns an ordered list of [`TrackBinding`]s. Themes are shared
//! between the control plane, which mutates them, and any number of stream
//! sessions, which take a snapshot of the enabled bindings on every tick.

pub mod binding;
pub mod registry;
pub mod store;

pub use binding::{BindingId, BindingState, TrackBinding, DEFAULT_VOLUME};
pub use registry::{BindingInfo, ThemeRegistry};
pub use store::{InstanceRecord, ThemeRecord, ThemeStore};

use crate::error::{Error, Result};
use crate::library::Recording;
use crate::sync::{read, write};
use amniotic_common::slugify;
use std::sync::{Arc, RwLock};

/// Named mix of recordings
#[derive(Debug)]
pub struct Theme {
    name: RwLock<String>,
    bindings: RwLock<Vec<Arc<TrackBinding>>>,
    /// Binding selected in the control surface; not used for mixing
    current: RwLock<Option<BindingId>>,
}

impl Theme {
    /// Create an empty theme. The name must produce a non-empty slug.
    pub fn new(name: &str) -> Result<Self> {
        let name = validate_name(name)?;
        Ok(Self {
            name: RwLock::new(name),
            bindings: RwLock::new(Vec::new()),
            current: RwLock::new(None),
        })
    }

    pub fn name(&self) -> String {
        read(&self.name).clone()
    }

    /// URL-safe identifier derived from the name
    pub fn id(&self) -> String {
        slugify(&read(&self.name))
    }

    pub(crate) fn set_name(&self, name: &str) -> Result<()> {
        *write(&self.name) = validate_name(name)?;
        Ok(())
    }

    /// Snapshot of all bindings, in order
    pub fn bindings(&self) -> Vec<Arc<TrackBinding>> {
        read(&self.bindings).clone()
    }

    /// Snapshot of the currently enabled bindings, in order
    pub fn enabled_bindings(&self) -> Vec<Arc<TrackBinding>> {
        read(&self.bindings)
            .iter()
            .filter(|b| b.is_enabled())
            .cloned()
            .collect()
    }

    pub fn has_enabled(&self) -> bool {
        read(&self.bindings).iter().any(|b| b.is_enabled())
    }

    pub fn binding_count(&self) -> usize {
        read(&self.bindings).len()
    }

    pub fn contains_binding(&self, id: BindingId) -> bool {
        read(&self.bindings).iter().any(|b| b.id() == id)
    }

    /// Find a binding by recording display name
    pub fn binding(&self, recording_name: &str) -> Option<Arc<TrackBinding>> {
        read(&self.bindings)
            .iter()
            .find(|b| b.name() == recording_name)
            .cloned()
    }

    /// Bind a recording, returning the existing binding if already present
    pub fn add_binding(&self, recording: Arc<Recording>) -> Arc<TrackBinding> {
        let mut bindings = write(&self.bindings);
        if let Some(existing) = bindings.iter().find(|b| **b.recording() == *recording) {
            return Arc::clone(existing);
        }
        let binding = Arc::new(TrackBinding::new(recording));
        bindings.push(Arc::clone(&binding));
        binding
    }

    /// Insert a fully configured binding (used when loading persisted themes).
    ///
    /// Returns `false` if the recording is already bound.
    pub fn insert_binding(&self, binding: Arc<TrackBinding>) -> bool {
        let mut bindings = write(&self.bindings);
        if bindings.iter().any(|b| b.recording() == binding.recording()) {
            return false;
        }
        bindings.push(binding);
        true
    }

    /// Remove a binding by recording name
    pub fn remove_binding(&self, recording_name: &str) -> Option<Arc<TrackBinding>> {
        let removed = {
            let mut bindings = write(&self.bindings);
            let index = bindings.iter().position(|b| b.name() == recording_name)?;
            bindings.remove(index)
        };
        self.forget_selection(removed.id());
        Some(removed)
    }

    /// Drop every binding for which `keep` returns false; returns the dropped ones
    pub fn retain_bindings<F>(&self, keep: F) -> Vec<Arc<TrackBinding>>
    where
        F: Fn(&TrackBinding) -> bool,
    {
        let removed: Vec<Arc<TrackBinding>> = {
            let mut bindings = write(&self.bindings);
            let (kept, removed): (Vec<_>, Vec<_>) = bindings.drain(..).partition(|b| keep(b));
            *bindings = kept;
            removed
        };
        for binding in &removed {
            self.forget_selection(binding.id());
        }
        removed
    }

    /// Mark a binding as the control surface's current one
    pub fn select(&self, id: BindingId) -> Result<()> {
        if !self.contains_binding(id) {
            return Err(Error::Internal(format!(
                "Binding {} does not belong to theme \"{}\"",
                id,
                self.name()
            )));
        }
        *write(&self.current) = Some(id);
        Ok(())
    }

    pub fn clear_selection(&self) {
        *write(&self.current) = None;
    }

    pub fn current(&self) -> Option<Arc<TrackBinding>> {
        let id = (*read(&self.current))?;
        read(&self.bindings).iter().find(|b| b.id() == id).cloned()
    }

    fn forget_selection(&self, id: BindingId) {
        let mut current = write(&self.current);
        if *current == Some(id) {
            *current = None;
        }
    }
}

fn validate_name(name: &str) -> Result<String> {
    let trimmed = name.trim();
    if slugify(trimmed).is_empty() {
        return Err(Error::BadRequest(format!(
            "Theme name \"{}\" must contain at least one letter or digit",
            name
        )));
    }
    Ok(trimmed.to_string())
}
