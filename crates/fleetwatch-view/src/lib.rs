//! View session and HTTP binding for the Fleetwatch tracker.
//!
//! This crate wires the animation core to the outside world:
//!
//! - **View session** ([`session`]) -- one task owning the position store
//!   and selection controller, fed by the poll and frame drivers
//!   ([`drivers`]) and by view commands
//! - **REST endpoints** for the latest frame, vehicle detail, marker
//!   clicks, pause toggles, and date changes
//! - **`WebSocket` endpoint** (`/ws/frames`) streaming every frame via
//!   [`tokio::sync::broadcast`]
//! - **Minimal HTML status page** (`GET /`)

pub mod drivers;
pub mod error;
pub mod handlers;
pub mod router;
pub mod server;
pub mod session;
pub mod startup;
pub mod state;
pub mod ws;

// Re-export primary types for convenience.
pub use error::ViewError;
pub use router::build_router;
pub use server::{ServerConfig, ServerError};
pub use session::{
    DEFAULT_CENTER, SelectionReply, SessionConfig, SessionError, SessionHandle, SessionSummary,
    SessionTask, spawn_session,
};
pub use startup::spawn_view_server;
pub use state::AppState;
