//! Amniotic Stream (amniotic-stream) - Main entry point
//!
//! Loads configuration, scans the recording library, restores persisted
//! themes and serves live theme streams plus the REST control plane.

use std::sync::Arc;
use std::time::Duration;

use amniotic_common::config::{
    default_config_path, ensure_directory, load_toml_config, CompiledDefaults,
};
use amniotic_stream::api::{self, AppContext};
use amniotic_stream::config::{CliArgs, Config};
use amniotic_stream::library::RecordingLibrary;
use amniotic_stream::theme::{ThemeRegistry, ThemeStore};
use amniotic_stream::SharedState;
use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tokio::sync::oneshot;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// How long open streams get to finish after a shutdown signal
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

fn init_tracing(level: &str) {
    let default_filter = format!(
        "amniotic_stream={level},amniotic_common={level},tower_http={level}",
        level = level
    );
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse();

    // Config is resolved before logging starts so the TOML log level applies
    let config_path = args.config.clone().unwrap_or_else(default_config_path);
    let toml = load_toml_config(&config_path).context("Failed to load configuration file")?;
    let config = Config::resolve(args.overrides(), toml, CompiledDefaults::for_current_platform())
        .context("Invalid configuration")?;

    init_tracing(&config.log_level);

    info!(
        "Starting Amniotic Stream v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );
    if config_path.exists() {
        info!("Configuration file: {}", config_path.display());
    } else {
        warn!(
            "No configuration file at {}; using defaults",
            config_path.display()
        );
    }
    info!("Audio directory: {}", config.audio_dir.display());
    info!("Themes file: {}", config.themes_path.display());
    if config.stream_url_is_local() {
        warn!(
            "Advertised stream URL {} is only reachable from this machine; \
             set stream_url or AMNIOTIC_STREAM_URL so speakers on the network can connect",
            config.stream_url
        );
    }

    ensure_directory(&config.audio_dir).context("Failed to create audio directory")?;
    if let Some(parent) = config.themes_path.parent() {
        ensure_directory(parent).context("Failed to create themes directory")?;
    }

    let library = Arc::new(
        RecordingLibrary::scan(&config.audio_dir).context("Failed to scan audio directory")?,
    );

    let store = ThemeStore::new(&config.themes_path);
    let themes = store
        .load(&library)
        .context("Failed to load themes; fix or remove the themes file")?;
    let registry = ThemeRegistry::with_themes(Arc::clone(&library), themes);
    let created_default = registry
        .ensure_default_theme()
        .context("Failed to create default theme")?
        .is_some();

    let state = Arc::new(SharedState::new(registry, store));
    if created_default {
        state.persist_async().await;
    }

    let ctx = AppContext::new(Arc::clone(&state), &config);
    for theme in state.registry.list_themes() {
        info!(
            "Theme \"{}\" streams at {}",
            theme.name(),
            ctx.stream_url_for(&theme.id())
        );
    }

    if let Some(interval) = config.library_poll_interval() {
        spawn_library_poll(Arc::clone(&state), interval);
    }

    // Run the server until a signal arrives or it fails on its own
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let server_state = Arc::clone(&state);
    let server_config = config.clone();
    let mut server = tokio::spawn(async move {
        api::run(&server_config, server_state, async {
            let _ = shutdown_rx.await;
        })
        .await
    });

    tokio::select! {
        result = &mut server => {
            result.context("Server task panicked")?.context("Server error")?;
            return Ok(());
        }
        _ = shutdown_signal() => {}
    }

    let _ = shutdown_tx.send(());
    match tokio::time::timeout(SHUTDOWN_GRACE, server).await {
        Ok(result) => {
            result.context("Server task panicked")?.context("Server error")?;
        }
        Err(_) => warn!(
            "{} stream(s) still open after {}s; exiting anyway",
            state.metrics.active_sessions(),
            SHUTDOWN_GRACE.as_secs()
        ),
    }

    info!("Server shutdown complete");
    Ok(())
}

/// Rescan the audio directory periodically and drop vanished recordings
fn spawn_library_poll(state: Arc<SharedState>, interval: Duration) {
    info!("Polling audio directory every {}s", interval.as_secs());
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // First tick completes immediately; the startup scan already ran
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let poll_state = Arc::clone(&state);
            let result =
                tokio::task::spawn_blocking(move || poll_state.registry.reconcile_library()).await;
            match result {
                Ok(Ok(changes)) if !changes.removed.is_empty() => state.persist_async().await,
                Ok(Ok(_)) => {}
                Ok(Err(e)) => error!("Library rescan failed: {}", e),
                Err(e) => error!("Library rescan task failed: {}", e),
            }
        }
    });
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
