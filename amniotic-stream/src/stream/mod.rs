//! Per-connection streaming
//!
//! [`spawn_session`] builds a [`StreamSession`] on a dedicated thread and
//! hands its output to async code through a bounded channel. Pacing sleeps and
//! decode I/O therefore never block the tokio runtime, and one slow session
//! cannot stall another.

pub mod metrics;
pub mod mixer;
pub mod pacer;
pub mod session;

pub use metrics::{MetricsSnapshot, Resource, ResourceGuard, StreamMetrics};
pub use mixer::{mix, ThemeMixer};
pub use pacer::Pacer;
pub use session::{Frame, SessionConfig, StreamSession};

use crate::error::{Error, Result};
use crate::theme::Theme;
use bytes::Bytes;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

/// MP3 buffers queued between the session thread and the HTTP body
pub const OUTPUT_QUEUE_DEPTH: usize = 16;

/// Start a session for `theme` and return the receiving end of its output.
///
/// Resolves once the session is constructed, so encoder setup errors reach
/// the caller. Dropping the receiver stops the session thread.
pub async fn spawn_session(
    theme: Arc<Theme>,
    config: SessionConfig,
    metrics: Arc<StreamMetrics>,
) -> Result<mpsc::Receiver<Bytes>> {
    let (ready_tx, ready_rx) = oneshot::channel::<Result<()>>();
    let (tx, rx) = mpsc::channel::<Bytes>(OUTPUT_QUEUE_DEPTH);
    let thread_name = format!("stream-{}", theme.id());

    std::thread::Builder::new()
        .name(thread_name)
        .spawn(move || {
            let session = match StreamSession::new(theme, config, metrics) {
                Ok(session) => {
                    let _ = ready_tx.send(Ok(()));
                    session
                }
                Err(e) => {
                    let _ = ready_tx.send(Err(e));
                    return;
                }
            };
            pump(session, tx);
        })
        .map_err(|e| Error::Internal(format!("Failed to spawn session thread: {}", e)))?;

    ready_rx
        .await
        .map_err(|_| Error::Internal("Session thread exited during startup".to_string()))??;

    Ok(rx)
}

/// Forward session output until the receiver goes away
fn pump(session: StreamSession, tx: mpsc::Sender<Bytes>) {
    let theme_id = session.theme_id().to_string();
    for bytes in session {
        if tx.blocking_send(bytes).is_err() {
            info!(theme = %theme_id, "Client disconnected");
            return;
        }
    }
    debug!(theme = %theme_id, "Session output ended");
}
