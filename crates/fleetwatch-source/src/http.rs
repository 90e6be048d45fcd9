//! HTTP polling of the position backend.

use std::time::Duration;

use tracing::debug;

use crate::batch::{FleetBatch, decode_batch};
use crate::error::SourceError;

/// Fetches the fleet with `GET {endpoint}`.
///
/// The request carries no parameters; the backend always returns the
/// full current fleet.
#[derive(Debug, Clone)]
pub struct HttpSnapshotSource {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpSnapshotSource {
    /// Create a source polling `endpoint` with a per-request timeout.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Client`] if the HTTP client cannot be built.
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, SourceError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SourceError::Client(e.to_string()))?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    /// The polled URL.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Fetch one batch.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Request`] on transport failure or timeout,
    /// [`SourceError::Status`] for a non-success response, and
    /// [`SourceError::Decode`] when the body is not a JSON array.
    pub async fn fetch(&self) -> Result<FleetBatch, SourceError> {
        let response = self
            .client
            .get(&self.endpoint)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| SourceError::Request {
                url: self.endpoint.clone(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unable to read error body".to_owned());
            return Err(SourceError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| SourceError::Decode(e.to_string()))?;

        let batch = decode_batch(body)?;
        debug!(
            endpoint = %self.endpoint,
            records = batch.records.len(),
            undecodable = batch.undecodable,
            "fleet batch fetched"
        );
        Ok(batch)
    }
}
