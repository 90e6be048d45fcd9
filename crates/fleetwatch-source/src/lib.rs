//! Fleet position sources for the Fleetwatch tracker.
//!
//! A source answers one question per poll: what does the fleet look like
//! right now? It returns structurally decoded records; validating and
//! merging them is the position store's job.
//!
//! # Modules
//!
//! - [`batch`] -- Response body decoding into [`FleetBatch`].
//! - [`http`] -- [`HttpSnapshotSource`] polling the backend with `reqwest`.
//! - [`scripted`] -- [`ScriptedSource`] replaying canned batches.
//! - [`error`] -- [`SourceError`].

pub mod batch;
pub mod error;
pub mod http;
pub mod scripted;

pub use batch::{FleetBatch, decode_batch};
pub use error::SourceError;
pub use http::HttpSnapshotSource;
pub use scripted::{ScriptStep, ScriptedSource};

/// A fleet position source.
///
/// Uses enum dispatch instead of trait objects because async methods
/// are not dyn-compatible.
#[derive(Debug, Clone)]
pub enum SnapshotSource {
    /// Live backend over HTTP.
    Http(HttpSnapshotSource),
    /// Canned replay.
    Scripted(ScriptedSource),
}

impl SnapshotSource {
    /// Fetch the next fleet batch.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] when the poll yields nothing usable.
    pub async fn fetch(&mut self) -> Result<FleetBatch, SourceError> {
        match self {
            Self::Http(source) => source.fetch().await,
            Self::Scripted(source) => source.fetch(),
        }
    }

    /// Human-readable name for logging.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Http(_) => "http",
            Self::Scripted(_) => "scripted",
        }
    }
}

impl From<HttpSnapshotSource> for SnapshotSource {
    fn from(source: HttpSnapshotSource) -> Self {
        Self::Http(source)
    }
}

impl From<ScriptedSource> for SnapshotSource {
    fn from(source: ScriptedSource) -> Self {
        Self::Scripted(source)
    }
}
