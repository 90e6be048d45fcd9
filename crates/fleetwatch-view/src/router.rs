//! Axum router construction for the view binding.
//!
//! Assembles all routes (REST + `WebSocket`) into a single [`Router`]
//! with CORS enabled so a map front end on another origin can use it.

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;
use crate::ws;

/// Build the complete Axum router.
///
/// The router includes:
/// - `GET /` -- minimal HTML status page
/// - `GET /ws/frames` -- `WebSocket` frame stream
/// - `GET /api/frame` -- latest rendered frame
/// - `GET /api/vehicles/{id}` -- vehicle detail
/// - `POST /api/vehicles/{id}/click` -- marker click
/// - `POST /api/vehicles/{id}/pause` -- toggle pause
/// - `POST /api/date` -- switch date context
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(handlers::index))
        .route("/ws/frames", get(ws::ws_frames))
        .route("/api/frame", get(handlers::get_frame))
        .route("/api/vehicles/{id}", get(handlers::get_vehicle))
        .route("/api/vehicles/{id}/click", post(handlers::click_vehicle))
        .route("/api/vehicles/{id}/pause", post(handlers::toggle_pause))
        .route("/api/date", post(handlers::change_date))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
