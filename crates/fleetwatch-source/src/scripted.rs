//! Replay of a fixed sequence of fleet batches.
//!
//! Useful for demos and tests without a live backend. Each fetch yields
//! the next step; once the script runs out, the last step repeats.

use std::path::Path;

use fleetwatch_types::WireVehicle;
use tracing::warn;

use crate::batch::{FleetBatch, decode_batch};
use crate::error::SourceError;

/// One scripted poll result.
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptStep {
    /// The poll succeeds with these records.
    Batch(Vec<WireVehicle>),
    /// The poll fails with this message.
    Fail(String),
}

/// A source that replays [`ScriptStep`]s in order.
#[derive(Debug, Clone, Default)]
pub struct ScriptedSource {
    steps: Vec<ScriptStep>,
    cursor: usize,
}

impl ScriptedSource {
    /// Create a source from explicit steps.
    pub const fn new(steps: Vec<ScriptStep>) -> Self {
        Self { steps, cursor: 0 }
    }

    /// Create a source where every step succeeds.
    pub fn from_batches(batches: Vec<Vec<WireVehicle>>) -> Self {
        Self::new(batches.into_iter().map(ScriptStep::Batch).collect())
    }

    /// Load a script file: a JSON array whose elements are fleet arrays.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Script`] if the file cannot be read or is not
    /// an array of arrays.
    pub fn from_json_file(path: &Path) -> Result<Self, SourceError> {
        let script_err = |reason: String| SourceError::Script {
            path: path.display().to_string(),
            reason,
        };
        let contents = std::fs::read_to_string(path).map_err(|e| script_err(e.to_string()))?;
        let raw: Vec<serde_json::Value> =
            serde_json::from_str(&contents).map_err(|e| script_err(e.to_string()))?;

        let mut steps = Vec::with_capacity(raw.len());
        for (step, body) in raw.into_iter().enumerate() {
            let batch = decode_batch(body).map_err(|e| script_err(e.to_string()))?;
            if batch.undecodable > 0 {
                warn!(
                    path = %path.display(),
                    step,
                    undecodable = batch.undecodable,
                    "script step has undecodable vehicle records, skipping them"
                );
            }
            steps.push(ScriptStep::Batch(batch.records));
        }
        Ok(Self::new(steps))
    }

    /// Yield the next step.
    ///
    /// An empty script always yields an empty fleet.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Scripted`] for a [`ScriptStep::Fail`] step.
    pub fn fetch(&mut self) -> Result<FleetBatch, SourceError> {
        let Some(step) = self.steps.get(self.cursor).or_else(|| self.steps.last()) else {
            return Ok(FleetBatch::default());
        };
        let result = match step {
            ScriptStep::Batch(records) => Ok(FleetBatch::new(records.clone())),
            ScriptStep::Fail(reason) => Err(SourceError::Scripted(reason.clone())),
        };
        if self.cursor < self.steps.len() {
            self.cursor = self.cursor.saturating_add(1);
        }
        result
    }
}
