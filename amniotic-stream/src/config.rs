//! amniotic-stream service configuration
//!
//! Resolution priority: CLI argument > environment variable > TOML file >
//! compiled default. clap already folds the first two together, so
//! [`ConfigOverrides`] carries whatever the command line (or its env
//! fallbacks) provided.

use crate::audio::bitrate_from_kbps;
use crate::error::{Error, Result};
use crate::stream::SessionConfig;
use amniotic_common::config::{
    CompiledDefaults, TomlConfig, DEFAULT_BITRATE_KBPS, DEFAULT_LIBRARY_POLL_SECS, DEFAULT_PORT,
};
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0";

/// Values supplied on the command line or through the environment
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub bind_address: Option<String>,
    pub port: Option<u16>,
    pub audio_dir: Option<PathBuf>,
    pub themes_path: Option<PathBuf>,
    pub stream_url: Option<String>,
    pub bitrate_kbps: Option<u32>,
    pub log_level: Option<String>,
}

/// Command-line arguments for amniotic-stream
#[derive(Parser, Debug)]
#[command(name = "amniotic-stream")]
#[command(about = "Ambient sound theme streaming server")]
#[command(version)]
pub struct CliArgs {
    /// Bootstrap configuration file
    #[arg(short, long, env = "AMNIOTIC_CONFIG")]
    pub config: Option<PathBuf>,

    /// Port to listen on
    #[arg(short, long, env = "AMNIOTIC_PORT")]
    pub port: Option<u16>,

    /// Interface to bind to
    #[arg(long)]
    pub bind_address: Option<String>,

    /// Directory containing recordings
    #[arg(short, long, env = "AMNIOTIC_AUDIO_DIR")]
    pub audio_dir: Option<PathBuf>,

    /// Themes JSON file
    #[arg(short, long, env = "AMNIOTIC_THEMES_PATH")]
    pub themes_path: Option<PathBuf>,

    /// Base URL advertised for theme streams
    #[arg(long, env = "AMNIOTIC_STREAM_URL")]
    pub stream_url: Option<String>,

    /// MP3 bitrate in kbps
    #[arg(long)]
    pub bitrate: Option<u32>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    pub log_level: Option<String>,
}

impl CliArgs {
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            bind_address: self.bind_address.clone(),
            port: self.port,
            audio_dir: self.audio_dir.clone(),
            themes_path: self.themes_path.clone(),
            stream_url: self.stream_url.clone(),
            bitrate_kbps: self.bitrate,
            log_level: self.log_level.clone(),
        }
    }
}

/// Fully resolved service configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub bind_address: String,
    pub port: u16,
    pub audio_dir: PathBuf,
    pub themes_path: PathBuf,
    /// Base URL advertised in theme stream links, without trailing slash
    pub stream_url: String,
    pub bitrate_kbps: u32,
    /// Library rescan interval; zero disables polling
    pub library_poll_secs: u64,
    pub realtime: bool,
    pub log_level: String,
}

impl Config {
    pub fn resolve(
        overrides: ConfigOverrides,
        toml: TomlConfig,
        defaults: CompiledDefaults,
    ) -> Result<Self> {
        let bind_address = overrides
            .bind_address
            .or(toml.bind_address)
            .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());
        let port = overrides.port.or(toml.port).unwrap_or(DEFAULT_PORT);

        let bitrate_kbps = overrides
            .bitrate_kbps
            .or(toml.bitrate_kbps)
            .unwrap_or(DEFAULT_BITRATE_KBPS);
        bitrate_from_kbps(bitrate_kbps)?;

        let stream_url = overrides
            .stream_url
            .or(toml.stream_url)
            .unwrap_or_else(|| default_stream_url(&bind_address, port));

        Ok(Self {
            audio_dir: overrides
                .audio_dir
                .or(toml.audio_dir)
                .unwrap_or(defaults.audio_dir),
            themes_path: overrides
                .themes_path
                .or(toml.themes_path)
                .unwrap_or(defaults.themes_path),
            stream_url: stream_url.trim_end_matches('/').to_string(),
            bitrate_kbps,
            library_poll_secs: toml
                .library_poll_secs
                .unwrap_or(DEFAULT_LIBRARY_POLL_SECS),
            realtime: toml.realtime.unwrap_or(true),
            log_level: overrides.log_level.unwrap_or(toml.logging.level),
            bind_address,
            port,
        })
    }

    pub fn socket_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.bind_address, self.port)
            .parse()
            .map_err(|e| {
                Error::Config(format!(
                    "Invalid bind address {}:{}: {}",
                    self.bind_address, self.port, e
                ))
            })
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            bitrate_kbps: self.bitrate_kbps,
            realtime: self.realtime,
        }
    }

    pub fn library_poll_interval(&self) -> Option<Duration> {
        (self.library_poll_secs > 0).then(|| Duration::from_secs(self.library_poll_secs))
    }

    /// True when the advertised stream URL only resolves on this machine
    pub fn stream_url_is_local(&self) -> bool {
        let authority = self
            .stream_url
            .split_once("://")
            .map_or(self.stream_url.as_str(), |(_, rest)| rest);
        let authority = authority.split('/').next().unwrap_or_default();
        let host = match authority.strip_prefix('[') {
            Some(v6) => v6.split(']').next().unwrap_or_default(),
            None => authority.rsplit_once(':').map_or(authority, |(host, _)| host),
        };
        matches!(host, "localhost" | "0.0.0.0" | "::" | "::1" | "") || host.starts_with("127.")
    }
}

fn default_stream_url(bind_address: &str, port: u16) -> String {
    let host = match bind_address {
        "0.0.0.0" | "::" | "" => "localhost",
        other => other,
    };
    format!("http://{}:{}", host, port)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn defaults() -> CompiledDefaults {
        CompiledDefaults::for_data_dir(PathBuf::from("/data/amniotic"))
    }

    #[test]
    fn test_compiled_defaults() {
        let config =
            Config::resolve(ConfigOverrides::default(), TomlConfig::default(), defaults()).unwrap();
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.bind_address, "0.0.0.0");
        assert_eq!(config.audio_dir, PathBuf::from("/data/amniotic/audio"));
        assert_eq!(
            config.themes_path,
            PathBuf::from("/data/amniotic/config/themes.json")
        );
        assert_eq!(config.stream_url, "http://localhost:8080");
        assert_eq!(config.bitrate_kbps, 128);
        assert!(config.realtime);
        assert_eq!(config.log_level, "info");
        assert_eq!(config.library_poll_interval(), Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_override_beats_toml() {
        let toml = TomlConfig {
            port: Some(9000),
            audio_dir: Some(PathBuf::from("/toml/audio")),
            stream_url: Some("http://toml:1/".to_string()),
            library_poll_secs: Some(0),
            ..Default::default()
        };
        let overrides = ConfigOverrides {
            port: Some(7000),
            ..Default::default()
        };

        let config = Config::resolve(overrides, toml, defaults()).unwrap();
        assert_eq!(config.port, 7000);
        assert_eq!(config.audio_dir, PathBuf::from("/toml/audio"));
        assert_eq!(config.stream_url, "http://toml:1");
        assert_eq!(config.library_poll_interval(), None);
        assert_eq!(config.socket_addr().unwrap().port(), 7000);
    }

    #[test]
    fn test_invalid_bitrate_rejected() {
        let toml = TomlConfig {
            bitrate_kbps: Some(100),
            ..Default::default()
        };
        assert!(matches!(
            Config::resolve(ConfigOverrides::default(), toml, defaults()),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_local_stream_url_detected() {
        let resolve = |stream_url: Option<&str>, bind_address: Option<&str>| {
            let overrides = ConfigOverrides {
                stream_url: stream_url.map(str::to_string),
                bind_address: bind_address.map(str::to_string),
                ..Default::default()
            };
            Config::resolve(overrides, TomlConfig::default(), defaults()).unwrap()
        };

        // Wildcard bind with no explicit URL advertises localhost
        assert!(resolve(None, None).stream_url_is_local());
        assert!(resolve(None, Some("::")).stream_url_is_local());
        assert!(resolve(Some("http://127.0.0.1:8080"), None).stream_url_is_local());
        assert!(resolve(Some("http://[::1]:8080/"), None).stream_url_is_local());

        assert!(!resolve(None, Some("192.168.1.20")).stream_url_is_local());
        assert!(!resolve(Some("http://nas.local:8080"), None).stream_url_is_local());
        assert!(!resolve(Some("http://[fd00::2]:8080"), None).stream_url_is_local());
    }

    #[test]
    fn test_invalid_bind_address() {
        let overrides = ConfigOverrides {
            bind_address: Some("not an address".to_string()),
            ..Default::default()
        };
        let config = Config::resolve(overrides, TomlConfig::default(), defaults()).unwrap();
        assert!(config.socket_addr().is_err());
    }
}
