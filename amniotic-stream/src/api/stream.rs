//! Live MP3 endpoint
//!
//! GET /stream/:theme_id spawns a fresh session for the request and forwards
//! its output as a chunked `audio/mpeg` body. When the client disconnects axum
//! drops the body, the channel closes and the session thread tears down.

use crate::api::server::AppContext;
use crate::error::{Error, Result};
use crate::stream::spawn_session;
use axum::{
    body::Body,
    extract::{Path, State},
    http::header,
    response::Response,
};
use futures::StreamExt;
use std::convert::Infallible;
use std::sync::Arc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::info;

pub async fn stream_theme(
    State(ctx): State<AppContext>,
    Path(theme_id): Path<String>,
) -> Result<Response> {
    let theme = ctx.state.registry.theme(&theme_id)?;
    info!(
        theme = %theme_id,
        enabled = theme.enabled_bindings().len(),
        "Stream requested"
    );

    let rx = spawn_session(theme, ctx.session, Arc::clone(&ctx.state.metrics)).await?;
    let body = Body::from_stream(ReceiverStream::new(rx).map(Ok::<_, Infallible>));

    Response::builder()
        .header(header::CONTENT_TYPE, "audio/mpeg")
        .header(header::CACHE_CONTROL, "no-cache, no-store")
        .body(body)
        .map_err(|e| Error::Http(format!("Failed to build stream response: {}", e)))
}
