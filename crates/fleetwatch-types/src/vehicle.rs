//! Validated per-poll vehicle records.
//!
//! A [`VehicleSnapshot`] is what the position store consumes. It is only
//! ever built from a [`WireVehicle`](crate::wire::WireVehicle) that passed
//! validation, so every coordinate in it is finite and the speed is
//! non-negative.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::geo::Coordinate;
use crate::ids::VehicleId;

/// One stop on a vehicle's route history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct RouteStop {
    /// Human-readable stop label.
    pub stop: String,
    /// When the vehicle was (or is expected to be) at the stop.
    pub time: DateTime<Utc>,
    /// Where the stop is.
    pub location: Coordinate,
}

/// One vehicle's reported state in a single poll.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct VehicleSnapshot {
    /// Stable vehicle identifier, unique within a batch.
    pub id: VehicleId,
    /// Authoritative position as of this poll.
    pub current: Coordinate,
    /// Reported speed in km/h. Display only.
    pub speed: f64,
    /// Route stops in chronological order. May be empty.
    pub route: Vec<RouteStop>,
}

impl VehicleSnapshot {
    /// Create a snapshot with no route history.
    pub fn new(id: impl Into<VehicleId>, current: Coordinate, speed: f64) -> Self {
        Self {
            id: id.into(),
            current,
            speed,
            route: Vec::new(),
        }
    }

    /// Attach a route to this snapshot.
    #[must_use]
    pub fn with_route(mut self, route: Vec<RouteStop>) -> Self {
        self.route = route;
        self
    }
}

/// Errors raised when a wire record cannot become a [`VehicleSnapshot`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SnapshotError {
    /// The record has no `id` field, or it is empty.
    #[error("vehicle record has no id")]
    MissingId,

    /// The record has no `current` coordinate.
    #[error("vehicle {id} has no current position")]
    MissingCurrent {
        /// The offending vehicle.
        id: VehicleId,
    },

    /// A coordinate in the record is NaN or infinite.
    #[error("vehicle {id} has a non-finite coordinate in {field}")]
    NonFiniteCoordinate {
        /// The offending vehicle.
        id: VehicleId,
        /// Which field held the bad coordinate.
        field: &'static str,
    },

    /// The speed is negative or not a finite number.
    #[error("vehicle {id} has invalid speed {speed}")]
    InvalidSpeed {
        /// The offending vehicle.
        id: VehicleId,
        /// The reported speed.
        speed: f64,
    },
}
