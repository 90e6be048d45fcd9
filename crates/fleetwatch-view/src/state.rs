//! Shared application state for the view binding.

use chrono::{DateTime, Utc};

use crate::session::SessionHandle;

/// Shared state for the Axum application.
///
/// Wrapped in [`Arc`](std::sync::Arc) and injected via Axum's `State`
/// extractor. Handlers never touch animation state directly; they go
/// through the session handle.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Client side of the running view session.
    pub session: SessionHandle,
    /// Name of the position source, shown on the status page.
    pub source_name: String,
    /// Wall-clock time the view started.
    pub started_at: DateTime<Utc>,
}

impl AppState {
    /// Create application state around a session.
    pub fn new(session: SessionHandle, source_name: impl Into<String>) -> Self {
        Self {
            session,
            source_name: source_name.into(),
            started_at: Utc::now(),
        }
    }
}
