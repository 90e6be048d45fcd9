//! Decoding a fleet response body into per-record wire values.

use fleetwatch_types::WireVehicle;
use tracing::warn;

use crate::error::SourceError;

/// One poll's worth of records.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FleetBatch {
    /// Records that decoded structurally. They still need validation.
    pub records: Vec<WireVehicle>,
    /// Array entries that could not be decoded at all.
    pub undecodable: usize,
}

impl FleetBatch {
    /// Wrap already-decoded records.
    pub const fn new(records: Vec<WireVehicle>) -> Self {
        Self {
            records,
            undecodable: 0,
        }
    }
}

/// Split a response body into records.
///
/// The body must be a JSON array. An entry that does not decode as a
/// vehicle record is counted and skipped so the rest of the batch
/// survives.
///
/// # Errors
///
/// Returns [`SourceError::Decode`] if the body is not an array.
pub fn decode_batch(body: serde_json::Value) -> Result<FleetBatch, SourceError> {
    let serde_json::Value::Array(entries) = body else {
        return Err(SourceError::Decode(format!(
            "expected a JSON array, got {}",
            kind_of(&body)
        )));
    };

    let mut batch = FleetBatch::default();
    for (index, entry) in entries.into_iter().enumerate() {
        match serde_json::from_value::<WireVehicle>(entry) {
            Ok(record) => batch.records.push(record),
            Err(e) => {
                warn!(index, error = %e, "skipping undecodable vehicle record");
                batch.undecodable = batch.undecodable.saturating_add(1);
            }
        }
    }
    Ok(batch)
}

const fn kind_of(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}
