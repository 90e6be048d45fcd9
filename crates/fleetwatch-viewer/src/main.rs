//! Viewer binary for the Fleetwatch live vehicle tracker.
//!
//! Polls the fleet position backend, animates every vehicle marker between
//! polls, and serves the rendered frames over HTTP and `WebSocket`.
//!
//! # Startup Sequence
//!
//! 1. Initialize structured logging (tracing)
//! 2. Load configuration from `fleetwatch-config.yaml` (or
//!    `$FLEETWATCH_CONFIG`)
//! 3. Build the position source (HTTP backend or scripted replay)
//! 4. Spawn the view session with its poll and frame drivers
//! 5. Bind and spawn the view server
//! 6. Wait for Ctrl-C, then tear everything down

mod error;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use fleetwatch_core::config::{SourceConfig, ViewerConfig};
use fleetwatch_source::{HttpSnapshotSource, ScriptedSource, SnapshotSource};
use fleetwatch_view::{AppState, ServerConfig, SessionConfig, spawn_session, spawn_view_server};
use tokio::sync::oneshot;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::error::ViewerError;

/// Environment variable naming the config file.
const ENV_CONFIG_PATH: &str = "FLEETWATCH_CONFIG";

/// Config file used when `FLEETWATCH_CONFIG` is unset.
const DEFAULT_CONFIG_PATH: &str = "fleetwatch-config.yaml";

/// Application entry point for the viewer.
///
/// # Errors
///
/// Returns an error if configuration, the source, or the server cannot be
/// set up.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Initialize structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    info!("fleetwatch-viewer starting");

    // 2. Load configuration.
    let config = load_config()?;
    info!(
        endpoint = config.source.endpoint_url,
        poll_interval_ms = config.source.poll_interval_ms,
        frame_interval_ms = config.animation.frame_interval_ms,
        policy = ?config.selection.policy,
        camera_follow = config.view.camera_follow,
        "configuration loaded"
    );

    // 3. Build the position source.
    let source = build_source(&config.source)?;
    let source_name = source.name();

    // 4. Spawn the view session.
    let (session, session_task) = spawn_session(SessionConfig::from(&config), source);

    // 5. Spawn the view server.
    let state = Arc::new(AppState::new(session, source_name));
    let (stop_server, server_stopped) = oneshot::channel::<()>();
    let (addr, server) = spawn_view_server(&ServerConfig::from(&config.view), state, async {
        let _ = server_stopped.await;
    })
    .await
    .map_err(ViewerError::from)?;
    info!(%addr, source = source_name, "fleetwatch-viewer ready");

    // 6. Run until Ctrl-C.
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for Ctrl-C, shutting down");
    }
    info!("shutdown requested");

    // Session first, so WebSocket streams end and the server can drain.
    let summary = session_task.shutdown().await;
    let _ = stop_server.send(());
    if let Err(e) = server.await {
        warn!(error = %e, "view server task ended abnormally");
    }

    info!(
        batches = summary.batches,
        frames = summary.frames,
        dropped_records = summary.dropped_records,
        "fleetwatch-viewer shutdown complete"
    );

    Ok(())
}

/// Load configuration from `$FLEETWATCH_CONFIG` or `fleetwatch-config.yaml`.
///
/// A missing file means defaults, still subject to env overrides.
fn load_config() -> Result<ViewerConfig, ViewerError> {
    let path = std::env::var(ENV_CONFIG_PATH)
        .map_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from);

    if path.exists() {
        info!(path = %path.display(), "loading config file");
        Ok(ViewerConfig::from_file(&path)?)
    } else {
        info!(path = %path.display(), "config file not found, using defaults");
        let mut config = ViewerConfig::default();
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }
}

/// Build the HTTP source, or the scripted one when a script is configured.
fn build_source(config: &SourceConfig) -> Result<SnapshotSource, ViewerError> {
    if let Some(script) = &config.script_path {
        info!(script, "replaying scripted fleet");
        return Ok(ScriptedSource::from_json_file(Path::new(script))?.into());
    }

    let http = HttpSnapshotSource::new(
        config.endpoint_url.clone(),
        Duration::from_millis(config.request_timeout_ms),
    )?;
    Ok(http.into())
}
