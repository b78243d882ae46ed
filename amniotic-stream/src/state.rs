//! Shared application state
//!
//! Everything the control plane and stream handlers need, behind one `Arc`.

use crate::library::RecordingLibrary;
use crate::stream::StreamMetrics;
use crate::theme::{ThemeRegistry, ThemeStore};
use std::sync::Arc;
use tracing::error;

/// Shared state accessible by all components
pub struct SharedState {
    pub registry: ThemeRegistry,
    pub store: ThemeStore,
    pub metrics: Arc<StreamMetrics>,
}

impl SharedState {
    pub fn new(registry: ThemeRegistry, store: ThemeStore) -> Self {
        Self {
            registry,
            store,
            metrics: StreamMetrics::new(),
        }
    }

    pub fn library(&self) -> &Arc<RecordingLibrary> {
        self.registry.library()
    }

    /// Write all themes to disk.
    ///
    /// Failures are logged only: the in-memory change has already happened
    /// and the next successful save will catch up. This does file I/O; async
    /// callers use [`SharedState::persist_async`].
    pub fn persist(&self) {
        if let Err(e) = self.store.save_snapshot(|| self.registry.list_themes()) {
            error!("Failed to save themes to \"{}\": {}", self.store.path().display(), e);
        }
    }

    /// [`SharedState::persist`] on the blocking thread pool
    pub async fn persist_async(self: &Arc<Self>) {
        let state = Arc::clone(self);
        if let Err(e) = tokio::task::spawn_blocking(move || state.persist()).await {
            error!("Theme save task failed: {}", e);
        }
    }
}
