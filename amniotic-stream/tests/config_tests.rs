//! Command-line and environment configuration tests
//!
//! These touch process environment variables and therefore run serially.

use amniotic_common::config::{CompiledDefaults, TomlConfig};
use amniotic_stream::config::{CliArgs, Config};
use clap::Parser;
use serial_test::serial;
use std::path::PathBuf;

const ENV_VARS: [&str; 5] = [
    "AMNIOTIC_CONFIG",
    "AMNIOTIC_PORT",
    "AMNIOTIC_AUDIO_DIR",
    "AMNIOTIC_THEMES_PATH",
    "AMNIOTIC_STREAM_URL",
];

fn clear_env() {
    for var in ENV_VARS {
        std::env::remove_var(var);
    }
}

fn defaults() -> CompiledDefaults {
    CompiledDefaults::for_data_dir(PathBuf::from("/var/lib/amniotic"))
}

#[test]
#[serial]
fn test_env_vars_feed_config() {
    clear_env();
    std::env::set_var("AMNIOTIC_PORT", "9123");
    std::env::set_var("AMNIOTIC_AUDIO_DIR", "/srv/sounds");
    std::env::set_var("AMNIOTIC_STREAM_URL", "http://nas.local:9123/");

    let args = CliArgs::try_parse_from(["amniotic-stream"]).unwrap();
    let config = Config::resolve(args.overrides(), TomlConfig::default(), defaults()).unwrap();

    assert_eq!(config.port, 9123);
    assert_eq!(config.audio_dir, PathBuf::from("/srv/sounds"));
    assert_eq!(config.stream_url, "http://nas.local:9123");
    assert_eq!(
        config.themes_path,
        PathBuf::from("/var/lib/amniotic/config/themes.json")
    );
    clear_env();
}

#[test]
#[serial]
fn test_cli_beats_env_beats_toml() {
    clear_env();
    std::env::set_var("AMNIOTIC_PORT", "9000");
    std::env::set_var("AMNIOTIC_THEMES_PATH", "/env/themes.json");

    let args = CliArgs::try_parse_from(["amniotic-stream", "--port", "7000"]).unwrap();
    let toml = TomlConfig {
        port: Some(6000),
        themes_path: Some(PathBuf::from("/toml/themes.json")),
        bitrate_kbps: Some(192),
        ..Default::default()
    };
    let config = Config::resolve(args.overrides(), toml, defaults()).unwrap();

    assert_eq!(config.port, 7000);
    assert_eq!(config.themes_path, PathBuf::from("/env/themes.json"));
    assert_eq!(config.bitrate_kbps, 192);
    clear_env();
}

#[test]
#[serial]
fn test_bad_port_in_env_is_rejected() {
    clear_env();
    std::env::set_var("AMNIOTIC_PORT", "not-a-port");
    assert!(CliArgs::try_parse_from(["amniotic-stream"]).is_err());
    clear_env();
}
