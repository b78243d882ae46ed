//! Error types for amniotic-stream
//!
//! Defines module-specific error types using thiserror for clear error propagation.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for amniotic-stream
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration loading or validation errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Errors bubbled up from the common crate
    #[error(transparent)]
    Common(#[from] amniotic_common::Error),

    /// Audio demux/decode errors
    #[error("Audio decode error: {0}")]
    Decode(String),

    /// Source file carries no decodable audio stream
    #[error("No audio stream in {}", .0.display())]
    NoAudioStream(PathBuf),

    /// Sample rate conversion errors
    #[error("Resampling error: {0}")]
    Resample(String),

    /// MP3 encoder errors
    #[error("Audio encode error: {0}")]
    Encode(String),

    /// Theme store read/write errors
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Unknown theme identifier
    #[error("Theme not found: {0}")]
    ThemeNotFound(String),

    /// Unknown recording name or path
    #[error("Recording not found: {0}")]
    RecordingNotFound(String),

    /// Recording exists but is not bound in the theme
    #[error("Recording \"{recording}\" is not part of theme \"{theme}\"")]
    BindingNotFound { theme: String, recording: String },

    /// Identifier collision
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Invalid request
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// HTTP server errors
    #[error("HTTP server error: {0}")]
    Http(String),

    /// Other errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Convenience Result type using amniotic-stream Error
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// HTTP status this error maps to at the API boundary
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::ThemeNotFound(_)
            | Error::RecordingNotFound(_)
            | Error::BindingNotFound { .. } => StatusCode::NOT_FOUND,
            Error::Conflict(_) => StatusCode::CONFLICT,
            Error::BadRequest(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        }
        (
            status,
            Json(json!({
                "status": "error",
                "message": self.to_string(),
            })),
        )
            .into_response()
    }
}
