//! REST control-plane handlers
//!
//! Every mutating handler persists the theme store before answering.

use crate::api::server::AppContext;
use crate::error::{Error, Result};
use crate::stream::MetricsSnapshot;
use crate::theme::{BindingInfo, Theme};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: String,
    module: String,
    version: String,
    git_hash: String,
    build_timestamp: String,
    build_profile: String,
    active_sessions: usize,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    status: String,
}

impl StatusResponse {
    fn ok() -> Json<Self> {
        Json(Self {
            status: "ok".to_string(),
        })
    }
}

#[derive(Debug, Serialize)]
pub struct RecordingInfo {
    name: String,
    path: String,
}

#[derive(Debug, Serialize)]
pub struct RescanResponse {
    added: Vec<String>,
    removed: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct ThemeSummary {
    id: String,
    name: String,
    stream_url: String,
    bindings: usize,
    enabled: usize,
    is_current: bool,
}

#[derive(Debug, Serialize)]
pub struct ThemeDetail {
    id: String,
    name: String,
    stream_url: String,
    is_current: bool,
    bindings: Vec<BindingInfo>,
}

#[derive(Debug, Deserialize)]
pub struct ThemeNameRequest {
    name: String,
}

#[derive(Debug, Deserialize)]
pub struct AddBindingRequest {
    recording: String,
}

#[derive(Debug, Deserialize)]
pub struct VolumeRequest {
    volume: u8, // 0-100 user-facing scale
}

#[derive(Debug, Deserialize)]
pub struct EnabledRequest {
    enabled: bool,
}

fn is_current(ctx: &AppContext, theme: &Theme) -> bool {
    ctx.state
        .registry
        .current_theme()
        .is_some_and(|current| current.id() == theme.id())
}

fn theme_detail(ctx: &AppContext, theme: &Theme) -> Result<ThemeDetail> {
    let id = theme.id();
    Ok(ThemeDetail {
        bindings: ctx.state.registry.list_bindings(&id)?,
        stream_url: ctx.stream_url_for(&id),
        is_current: is_current(ctx, theme),
        name: theme.name(),
        id,
    })
}

fn binding_info(ctx: &AppContext, theme_id: &str, recording: &str) -> Result<BindingInfo> {
    ctx.state
        .registry
        .list_bindings(theme_id)?
        .into_iter()
        .find(|b| b.name == recording)
        .ok_or_else(|| Error::BindingNotFound {
            theme: theme_id.to_string(),
            recording: recording.to_string(),
        })
}

// ============================================================================
// Health & Diagnostics
// ============================================================================

/// GET /health
pub async fn health(State(ctx): State<AppContext>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        module: "amniotic-stream".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        git_hash: env!("GIT_HASH").to_string(),
        build_timestamp: env!("BUILD_TIMESTAMP").to_string(),
        build_profile: env!("BUILD_PROFILE").to_string(),
        active_sessions: ctx.state.metrics.active_sessions(),
    })
}

/// GET /api/v1/stats
pub async fn stats(State(ctx): State<AppContext>) -> Json<MetricsSnapshot> {
    Json(ctx.state.metrics.snapshot())
}

// ============================================================================
// Recording Library
// ============================================================================

/// GET /api/v1/recordings
pub async fn list_recordings(State(ctx): State<AppContext>) -> Json<Vec<RecordingInfo>> {
    Json(
        ctx.state
            .library()
            .list()
            .iter()
            .map(|r| RecordingInfo {
                name: r.name().to_string(),
                path: r.path_str(),
            })
            .collect(),
    )
}

/// POST /api/v1/recordings/rescan
pub async fn rescan_recordings(State(ctx): State<AppContext>) -> Result<Json<RescanResponse>> {
    let state = Arc::clone(&ctx.state);
    let changes = tokio::task::spawn_blocking(move || state.registry.reconcile_library())
        .await
        .map_err(|e| Error::Internal(format!("Library rescan task failed: {}", e)))??;
    if !changes.removed.is_empty() {
        ctx.state.persist_async().await;
    }
    Ok(Json(RescanResponse {
        added: changes.added.iter().map(|r| r.name().to_string()).collect(),
        removed: changes.removed.iter().map(|r| r.name().to_string()).collect(),
    }))
}

// ============================================================================
// Themes
// ============================================================================

/// GET /api/v1/themes
pub async fn list_themes(State(ctx): State<AppContext>) -> Json<Vec<ThemeSummary>> {
    let current = ctx.state.registry.current_theme().map(|t| t.id());
    Json(
        ctx.state
            .registry
            .list_themes()
            .iter()
            .map(|theme| {
                let id = theme.id();
                ThemeSummary {
                    name: theme.name(),
                    stream_url: ctx.stream_url_for(&id),
                    bindings: theme.binding_count(),
                    enabled: theme.enabled_bindings().len(),
                    is_current: current.as_deref() == Some(id.as_str()),
                    id,
                }
            })
            .collect(),
    )
}

/// POST /api/v1/themes
pub async fn create_theme(
    State(ctx): State<AppContext>,
    Json(req): Json<ThemeNameRequest>,
) -> Result<(StatusCode, Json<ThemeDetail>)> {
    let theme = ctx.state.registry.create_theme(&req.name)?;
    ctx.state.persist_async().await;
    Ok((StatusCode::CREATED, Json(theme_detail(&ctx, &theme)?)))
}

/// GET /api/v1/themes/:id
pub async fn get_theme(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
) -> Result<Json<ThemeDetail>> {
    let theme = ctx.state.registry.theme(&id)?;
    Ok(Json(theme_detail(&ctx, &theme)?))
}

/// DELETE /api/v1/themes/:id
pub async fn delete_theme(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
) -> Result<Json<StatusResponse>> {
    ctx.state.registry.delete_theme(&id)?;
    ctx.state.persist_async().await;
    Ok(StatusResponse::ok())
}

/// POST /api/v1/themes/:id/rename
pub async fn rename_theme(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
    Json(req): Json<ThemeNameRequest>,
) -> Result<Json<ThemeDetail>> {
    let theme = ctx.state.registry.rename_theme(&id, &req.name)?;
    ctx.state.persist_async().await;
    Ok(Json(theme_detail(&ctx, &theme)?))
}

/// POST /api/v1/themes/:id/select
pub async fn select_theme(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
) -> Result<Json<ThemeDetail>> {
    let theme = ctx.state.registry.select_theme(&id)?;
    info!("Selected theme \"{}\"", theme.name());
    Ok(Json(theme_detail(&ctx, &theme)?))
}

// ============================================================================
// Bindings
// ============================================================================

/// GET /api/v1/themes/:id/bindings
pub async fn list_bindings(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
) -> Result<Json<Vec<BindingInfo>>> {
    Ok(Json(ctx.state.registry.list_bindings(&id)?))
}

/// POST /api/v1/themes/:id/bindings
pub async fn add_binding(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
    Json(req): Json<AddBindingRequest>,
) -> Result<(StatusCode, Json<BindingInfo>)> {
    let binding = ctx.state.registry.add_binding(&id, &req.recording)?;
    ctx.state.persist_async().await;
    Ok((
        StatusCode::CREATED,
        Json(binding_info(&ctx, &id, binding.name())?),
    ))
}

/// DELETE /api/v1/themes/:id/bindings/:recording
pub async fn remove_binding(
    State(ctx): State<AppContext>,
    Path((id, recording)): Path<(String, String)>,
) -> Result<Json<StatusResponse>> {
    ctx.state.registry.remove_binding(&id, &recording)?;
    ctx.state.persist_async().await;
    Ok(StatusResponse::ok())
}

/// POST /api/v1/themes/:id/bindings/:recording/volume
pub async fn set_volume(
    State(ctx): State<AppContext>,
    Path((id, recording)): Path<(String, String)>,
    Json(req): Json<VolumeRequest>,
) -> Result<Json<BindingInfo>> {
    ctx.state.registry.set_volume(&id, &recording, req.volume)?;
    ctx.state.persist_async().await;
    Ok(Json(binding_info(&ctx, &id, &recording)?))
}

/// POST /api/v1/themes/:id/bindings/:recording/enabled
pub async fn set_enabled(
    State(ctx): State<AppContext>,
    Path((id, recording)): Path<(String, String)>,
    Json(req): Json<EnabledRequest>,
) -> Result<Json<BindingInfo>> {
    ctx.state.registry.set_enabled(&id, &recording, req.enabled)?;
    ctx.state.persist_async().await;
    Ok(Json(binding_info(&ctx, &id, &recording)?))
}

/// POST /api/v1/themes/:id/bindings/:recording/select
pub async fn select_binding(
    State(ctx): State<AppContext>,
    Path((id, recording)): Path<(String, String)>,
) -> Result<Json<BindingInfo>> {
    ctx.state.registry.select_binding(&id, &recording)?;
    ctx.state.persist_async().await;
    Ok(Json(binding_info(&ctx, &id, &recording)?))
}

/// POST /api/v1/themes/:id/selection/clear
pub async fn clear_selection(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
) -> Result<Json<StatusResponse>> {
    ctx.state.registry.clear_selection(&id)?;
    Ok(StatusResponse::ok())
}
