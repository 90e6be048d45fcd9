//! Error types for position sources.
//!
//! Any of these means one poll produced nothing usable. The poll driver
//! logs it and keeps the previous fleet state.

/// Errors that can occur while fetching a fleet batch.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    Client(String),

    /// The request failed in transport or timed out.
    #[error("request to {url} failed: {reason}")]
    Request {
        /// Endpoint that was polled.
        url: String,
        /// Transport error description.
        reason: String,
    },

    /// The backend answered with a non-success status.
    #[error("backend returned {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, for diagnostics.
        body: String,
    },

    /// The response body was not a JSON array.
    #[error("undecodable response: {0}")]
    Decode(String),

    /// A scripted step asked for a failure.
    #[error("scripted failure: {0}")]
    Scripted(String),

    /// A script file could not be read.
    #[error("failed to read script {path}: {reason}")]
    Script {
        /// Script path.
        path: String,
        /// Read or parse error description.
        reason: String,
    },
}
