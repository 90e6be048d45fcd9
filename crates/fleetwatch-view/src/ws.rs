//! `WebSocket` handler for live frame streaming.
//!
//! Clients connect to `GET /ws/frames` and receive every published
//! [`FleetFrame`](fleetwatch_types::FleetFrame) as a JSON text message,
//! starting with the latest one. A client that falls behind skips ahead
//! to the newest frame.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use fleetwatch_types::FleetFrame;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, warn};

use crate::state::AppState;

/// Upgrade an HTTP request to a `WebSocket` connection and begin
/// streaming frames.
///
/// # Route
///
/// `GET /ws/frames`
pub async fn ws_frames(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_ws(socket, state))
}

/// Send one frame; `false` once the client is gone.
async fn send_frame(socket: &mut WebSocket, frame: &FleetFrame) -> bool {
    let json = match serde_json::to_string(frame) {
        Ok(j) => j,
        Err(e) => {
            warn!(error = %e, "failed to serialize frame");
            return true;
        }
    };
    socket.send(Message::Text(json.into())).await.is_ok()
}

async fn handle_ws(mut socket: WebSocket, state: Arc<AppState>) {
    debug!("WebSocket client connected");

    let mut rx = state.session.subscribe();
    if !send_frame(&mut socket, &state.session.latest_frame()).await {
        return;
    }

    loop {
        tokio::select! {
            () = state.session.closed() => {
                debug!("view session closed, shutting down WebSocket");
                let _ = socket.send(Message::Close(None)).await;
                return;
            }
            result = rx.recv() => {
                match result {
                    Ok(frame) => {
                        if !send_frame(&mut socket, &frame).await {
                            debug!("WebSocket client disconnected (send failed)");
                            return;
                        }
                    }
                    Err(RecvError::Lagged(n)) => {
                        debug!(skipped = n, "WebSocket client lagged, skipping ahead");
                    }
                    Err(RecvError::Closed) => {
                        debug!("frame channel closed, shutting down WebSocket");
                        return;
                    }
                }
            }
            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Close(_))) | None => {
                        debug!("WebSocket client disconnected");
                        return;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if socket.send(Message::Pong(data)).await.is_err() {
                            return;
                        }
                    }
                    Some(Err(e)) => {
                        debug!(error = %e, "WebSocket error");
                        return;
                    }
                    // Clients drive the session over REST; other frames are ignored.
                    _ => {}
                }
            }
        }
    }
}
