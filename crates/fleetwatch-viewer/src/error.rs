//! Error types for the viewer binary.
//!
//! [`ViewerError`] is the top-level error type that wraps all possible
//! failure modes during startup.

/// Top-level error for the viewer binary.
///
/// Each variant wraps a specific subsystem error, providing a single
/// error type that `main` can propagate with `?`.
#[derive(Debug, thiserror::Error)]
pub enum ViewerError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: fleetwatch_core::ConfigError,
    },

    /// The position source could not be created.
    #[error("source error: {source}")]
    Source {
        /// The underlying source error.
        #[from]
        source: fleetwatch_source::SourceError,
    },

    /// The view server failed to start.
    #[error("server error: {source}")]
    Server {
        /// The underlying server error.
        #[from]
        source: fleetwatch_view::ServerError,
    },
}
