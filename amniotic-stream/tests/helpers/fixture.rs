//! Temporary audio library + app state for integration tests

use super::audio_generator::{generate_constant_wav, generate_ramp_wav, TEST_SAMPLE_RATE};
use amniotic_stream::api::AppContext;
use amniotic_stream::library::RecordingLibrary;
use amniotic_stream::stream::SessionConfig;
use amniotic_stream::theme::{ThemeRegistry, ThemeStore};
use amniotic_stream::SharedState;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

pub struct TestLibrary {
    _dir: TempDir,
    pub audio_dir: PathBuf,
    pub themes_path: PathBuf,
}

impl TestLibrary {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        let audio_dir = dir.path().join("audio");
        std::fs::create_dir(&audio_dir).expect("create audio dir");
        let themes_path = dir.path().join("config").join("themes.json");
        Self {
            _dir: dir,
            audio_dir,
            themes_path,
        }
    }

    pub fn path(&self, file_name: &str) -> PathBuf {
        self.audio_dir.join(file_name)
    }

    /// Add `<name>.wav`: mono 44.1 kHz, `secs` long, every sample `value`
    pub fn add_constant(&self, name: &str, value: i16, secs: f64) -> PathBuf {
        let path = self.path(&format!("{}.wav", name));
        let frames = (TEST_SAMPLE_RATE as f64 * secs) as usize;
        generate_constant_wav(&path, TEST_SAMPLE_RATE, frames, value).expect("write wav");
        path
    }

    /// Add `<name>.wav` whose sample `i` is `i`
    pub fn add_ramp(&self, name: &str, frames: usize) -> PathBuf {
        let path = self.path(&format!("{}.wav", name));
        generate_ramp_wav(&path, frames).expect("write wav");
        path
    }

    pub fn library(&self) -> Arc<RecordingLibrary> {
        Arc::new(RecordingLibrary::scan(&self.audio_dir).expect("scan library"))
    }

    pub fn store(&self) -> ThemeStore {
        ThemeStore::new(&self.themes_path)
    }

    pub fn state(&self) -> Arc<SharedState> {
        let registry = ThemeRegistry::new(self.library());
        Arc::new(SharedState::new(registry, self.store()))
    }

    /// Router context with pacing off so tests run at full speed
    pub fn context(&self, state: Arc<SharedState>) -> AppContext {
        AppContext {
            state,
            session: SessionConfig {
                bitrate_kbps: 128,
                realtime: false,
            },
            stream_url: "http://speaker.test:8080".to_string(),
        }
    }
}
