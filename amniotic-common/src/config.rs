//! Bootstrap configuration loading and data directory resolution
//!
//! Configuration sources in priority order:
//! 1. Command-line arguments (highest priority, applied by the service binary)
//! 2. Environment variables (applied by the service binary via clap)
//! 3. TOML config file
//! 4. OS-dependent compiled defaults (fallback)
//!
//! A missing TOML file is never fatal: a warning is logged and compiled
//! defaults are used.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Application directory name used under the platform data/config dirs
pub const APP_DIR_NAME: &str = "amniotic";

/// Default HTTP port
pub const DEFAULT_PORT: u16 = 8080;

/// Default MP3 bitrate (kbps)
pub const DEFAULT_BITRATE_KBPS: u32 = 128;

/// Default library rescan interval (seconds, 0 disables)
pub const DEFAULT_LIBRARY_POLL_SECS: u64 = 30;

/// Bootstrap configuration loaded from TOML file
///
/// Every field is optional; unset fields fall back to [`CompiledDefaults`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    /// Interface to bind the HTTP server to
    pub bind_address: Option<String>,

    /// HTTP server port
    pub port: Option<u16>,

    /// Directory holding the recording files
    pub audio_dir: Option<PathBuf>,

    /// JSON file holding the persisted themes
    pub themes_path: Option<PathBuf>,

    /// Base URL advertised for theme stream links
    pub stream_url: Option<String>,

    /// MP3 output bitrate in kbps
    pub bitrate_kbps: Option<u32>,

    /// Interval between recording library rescans (0 disables)
    pub library_poll_secs: Option<u64>,

    /// Pace output at playback speed
    pub realtime: Option<bool>,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// OS-dependent compiled defaults
#[derive(Debug, Clone)]
pub struct CompiledDefaults {
    /// Root data directory
    pub data_dir: PathBuf,
    /// Directory holding recordings
    pub audio_dir: PathBuf,
    /// Persisted themes file
    pub themes_path: PathBuf,
    /// Default log level
    pub log_level: String,
}

impl CompiledDefaults {
    /// Defaults for the platform this binary runs on
    pub fn for_current_platform() -> Self {
        Self::for_data_dir(default_data_dir())
    }

    /// Defaults rooted at an explicit data directory
    pub fn for_data_dir(data_dir: PathBuf) -> Self {
        Self {
            audio_dir: data_dir.join("audio"),
            themes_path: data_dir.join("config").join("themes.json"),
            data_dir,
            log_level: default_log_level(),
        }
    }
}

/// Get OS-dependent default data directory
pub fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join(APP_DIR_NAME))
        .unwrap_or_else(|| PathBuf::from("./amniotic_data"))
}

/// Default configuration file location (`<config dir>/amniotic/config.toml`)
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .map(|d| d.join(APP_DIR_NAME).join("config.toml"))
        .unwrap_or_else(|| PathBuf::from("./config.toml"))
}

/// Load the bootstrap TOML configuration.
///
/// A missing file yields `TomlConfig::default()` with a warning. A file that
/// exists but cannot be read or parsed is a configuration error.
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    if !path.exists() {
        warn!(
            "No config file found at \"{}\"; using compiled defaults",
            path.display()
        );
        return Ok(TomlConfig::default());
    }

    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
    })?;

    let config: TomlConfig = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Failed to parse {}: {}", path.display(), e)))?;

    info!("Loaded TOML configuration from {}", path.display());
    Ok(config)
}

/// Create a directory (and parents) if it does not exist yet.
///
/// Returns `true` when the directory had to be created.
pub fn ensure_directory(path: &Path) -> Result<bool> {
    if path.is_dir() {
        return Ok(false);
    }
    warn!("Directory \"{}\" does not exist. Creating it.", path.display());
    std::fs::create_dir_all(path)?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_log_level() {
        assert_eq!(default_log_level(), "info");
        assert_eq!(LoggingConfig::default().level, "info");
    }

    #[test]
    fn test_defaults_layout() {
        let defaults = CompiledDefaults::for_data_dir(PathBuf::from("/srv/amniotic"));
        assert_eq!(defaults.audio_dir, PathBuf::from("/srv/amniotic/audio"));
        assert_eq!(
            defaults.themes_path,
            PathBuf::from("/srv/amniotic/config/themes.json")
        );
    }

    #[test]
    fn test_partial_toml_parses() {
        let config: TomlConfig = toml::from_str("port = 9000\n[logging]\nlevel = \"debug\"\n").unwrap();
        assert_eq!(config.port, Some(9000));
        assert_eq!(config.logging.level, "debug");
        assert!(config.audio_dir.is_none());
        assert!(config.realtime.is_none());
    }
}
