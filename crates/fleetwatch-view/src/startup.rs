//! View server startup helper for embedding in the viewer binary.
//!
//! Provides [`spawn_view_server`] which binds eagerly and then runs the
//! HTTP + `WebSocket` server on a background Tokio task, so bind failures
//! surface to the caller instead of inside the task.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::server::{self, ServerConfig, ServerError};
use crate::state::AppState;

/// Bind and spawn the view server.
///
/// Returns the bound address (useful with port `0`) and the server task.
/// The task ends once `shutdown` resolves and in-flight requests drain.
///
/// # Errors
///
/// Returns [`ServerError::Bind`] if the address cannot be bound.
pub async fn spawn_view_server<F>(
    config: &ServerConfig,
    state: Arc<AppState>,
    shutdown: F,
) -> Result<(SocketAddr, JoinHandle<()>), ServerError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let listener = server::bind(config).await?;
    let addr = listener
        .local_addr()
        .map_err(|e| ServerError::Bind(format!("no local address: {e}")))?;

    let handle = tokio::spawn(async move {
        if let Err(e) = server::serve(listener, state, shutdown).await {
            tracing::error!(error = %e, "view server exited with error");
        }
    });

    tracing::info!(%addr, "view server spawned on background task");

    Ok((addr, handle))
}
