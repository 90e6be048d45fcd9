//! REST API endpoint handlers for the view binding.
//!
//! Reads come from the latest published frame; mutations are sent to the
//! view session as commands and answered once the session applied them.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/` | Minimal HTML status page |
//! | `GET` | `/api/frame` | Latest rendered frame |
//! | `GET` | `/api/vehicles/{id}` | Detail panel data |
//! | `POST` | `/api/vehicles/{id}/click` | Marker click |
//! | `POST` | `/api/vehicles/{id}/pause` | Toggle pause only |
//! | `POST` | `/api/date` | Switch date context |

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::response::{Html, IntoResponse};
use fleetwatch_types::{DateContext, VehicleId};
use serde::Deserialize;
use tracing::debug;

use crate::error::ViewError;
use crate::state::AppState;

/// Body of `POST /api/date`.
#[derive(Debug, Deserialize)]
pub struct DateRequest {
    /// `today` or `tomorrow`, case-insensitive.
    pub date: String,
}

// ---------------------------------------------------------------------------
// GET / -- minimal HTML status page
// ---------------------------------------------------------------------------

/// Serve a minimal HTML page showing fleet status and API links.
pub async fn index(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let frame = state.session.latest_frame();
    let vehicles = frame.vehicles.len();
    let paused = frame
        .vehicles
        .iter()
        .filter(|v| v.status == fleetwatch_types::VehicleStatus::Paused)
        .count();
    let selected = frame
        .selected
        .as_ref()
        .map_or_else(|| "none".to_owned(), ToString::to_string);
    let date = frame.date;
    let source = &state.source_name;
    let started = state.started_at.format("%Y-%m-%d %H:%M:%S UTC");

    Html(format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="utf-8">
    <title>Fleetwatch</title>
    <style>
        body {{ background: #10151c; color: #d0d7de; font-family: monospace; padding: 2rem; max-width: 760px; margin: 0 auto; }}
        h1 {{ color: #f0883e; margin-bottom: 0.25rem; }}
        .metric {{ display: inline-block; border: 1px solid #30363d; border-radius: 6px; padding: 0.8rem 1.2rem; margin: 0.4rem 0.4rem 0.4rem 0; }}
        .label {{ color: #8b949e; font-size: 0.85rem; }}
        .value {{ color: #f0883e; font-size: 1.4rem; font-weight: bold; }}
        a {{ color: #58a6ff; }}
        li {{ padding: 0.25rem 0; }}
    </style>
</head>
<body>
    <h1>Fleetwatch</h1>
    <p>Source <b>{source}</b>, up since {started}</p>
    <div>
        <div class="metric"><div class="label">Vehicles</div><div class="value">{vehicles}</div></div>
        <div class="metric"><div class="label">Paused</div><div class="value">{paused}</div></div>
        <div class="metric"><div class="label">Selected</div><div class="value">{selected}</div></div>
        <div class="metric"><div class="label">Date</div><div class="value">{date}</div></div>
    </div>
    <h2>API</h2>
    <ul>
        <li>GET <a href="/api/frame">/api/frame</a> -- latest rendered frame</li>
        <li>GET /api/vehicles/{{id}} -- vehicle detail</li>
        <li>POST /api/vehicles/{{id}}/click -- marker click</li>
        <li>POST /api/vehicles/{{id}}/pause -- toggle pause</li>
        <li>POST /api/date -- <code>{{"date": "today"}}</code> or <code>"tomorrow"</code></li>
        <li>WS <code>/ws/frames</code> -- live frame stream</li>
    </ul>
</body>
</html>"#
    ))
}

// ---------------------------------------------------------------------------
// GET /api/frame
// ---------------------------------------------------------------------------

/// Return the latest rendered frame.
pub async fn get_frame(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.session.latest_frame())
}

// ---------------------------------------------------------------------------
// GET /api/vehicles/{id}
// ---------------------------------------------------------------------------

/// Return detail panel data for one vehicle.
pub async fn get_vehicle(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ViewError> {
    let id = parse_vehicle_id(id)?;
    let detail = state
        .session
        .detail(id.clone())
        .await?
        .ok_or_else(|| ViewError::NotFound(format!("vehicle {id}")))?;
    Ok(Json(detail))
}

// ---------------------------------------------------------------------------
// POST /api/vehicles/{id}/click
// ---------------------------------------------------------------------------

/// Apply a marker click.
///
/// An unknown id is not an error: the reply carries `known: false` and the
/// unchanged selection.
pub async fn click_vehicle(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ViewError> {
    let id = parse_vehicle_id(id)?;
    debug!(vehicle_id = %id, "marker clicked");
    let reply = state.session.click(id).await?;
    Ok(Json(reply))
}

// ---------------------------------------------------------------------------
// POST /api/vehicles/{id}/pause
// ---------------------------------------------------------------------------

/// Toggle a vehicle's pause flag without changing the selection.
pub async fn toggle_pause(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ViewError> {
    let id = parse_vehicle_id(id)?;
    let reply = state.session.toggle_pause(id).await?;
    Ok(Json(reply))
}

// ---------------------------------------------------------------------------
// POST /api/date
// ---------------------------------------------------------------------------

/// Switch the date context, clearing the selection and every pause.
pub async fn change_date(
    State(state): State<Arc<AppState>>,
    Json(body): Json<DateRequest>,
) -> Result<impl IntoResponse, ViewError> {
    let date: DateContext = body.date.parse().map_err(ViewError::BadRequest)?;
    let frame = state.session.change_date(date).await?;
    Ok(Json(frame))
}

fn parse_vehicle_id(raw: String) -> Result<VehicleId, ViewError> {
    if raw.trim().is_empty() {
        return Err(ViewError::BadRequest("vehicle id must not be empty".to_owned()));
    }
    Ok(VehicleId::new(raw))
}
