//! HTTP server setup and routing

use crate::config::Config;
use crate::error::{Error, Result};
use crate::state::SharedState;
use crate::stream::SessionConfig;
use axum::{
    routing::{get, post},
    Router,
};
use std::future::Future;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Shared application context passed to all handlers
#[derive(Clone)]
pub struct AppContext {
    pub state: Arc<SharedState>,
    pub session: SessionConfig,
    /// Base URL for advertised stream links
    pub stream_url: String,
}

impl AppContext {
    pub fn new(state: Arc<SharedState>, config: &Config) -> Self {
        Self {
            state,
            session: config.session_config(),
            stream_url: config.stream_url.clone(),
        }
    }

    /// Public URL of a theme's stream
    pub fn stream_url_for(&self, theme_id: &str) -> String {
        format!("{}/stream/{}", self.stream_url, theme_id)
    }
}

/// Build the full router
pub fn build_router(ctx: AppContext) -> Router {
    use super::handlers;

    let api = Router::new()
        // Recording library
        .route("/recordings", get(handlers::list_recordings))
        .route("/recordings/rescan", post(handlers::rescan_recordings))

        // Themes
        .route(
            "/themes",
            get(handlers::list_themes).post(handlers::create_theme),
        )
        .route(
            "/themes/:id",
            get(handlers::get_theme).delete(handlers::delete_theme),
        )
        .route("/themes/:id/rename", post(handlers::rename_theme))
        .route("/themes/:id/select", post(handlers::select_theme))

        // Bindings within a theme
        .route(
            "/themes/:id/bindings",
            get(handlers::list_bindings).post(handlers::add_binding),
        )
        .route(
            "/themes/:id/bindings/:recording",
            axum::routing::delete(handlers::remove_binding),
        )
        .route(
            "/themes/:id/bindings/:recording/volume",
            post(handlers::set_volume),
        )
        .route(
            "/themes/:id/bindings/:recording/enabled",
            post(handlers::set_enabled),
        )
        .route(
            "/themes/:id/bindings/:recording/select",
            post(handlers::select_binding),
        )
        .route("/themes/:id/selection/clear", post(handlers::clear_selection))

        // Diagnostics
        .route("/stats", get(handlers::stats));

    Router::new()
        .route("/health", get(handlers::health))
        .route("/stream/:theme_id", get(super::stream::stream_theme))
        .nest("/api/v1", api)
        .with_state(ctx)
        .layer(TraceLayer::new_for_http())
        // Enable CORS for local access
        .layer(CorsLayer::permissive())
}

/// Run HTTP server until `shutdown` resolves
pub async fn run<F>(config: &Config, state: Arc<SharedState>, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = config.socket_addr()?;
    let app = build_router(AppContext::new(state, config));

    info!("Starting HTTP server on {}", addr);
    info!("Streams advertised under {}/stream/<theme>", config.stream_url);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| Error::Http(format!("Failed to bind to {}: {}", addr, e)))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| Error::Http(format!("Server error: {}", e)))?;

    Ok(())
}
