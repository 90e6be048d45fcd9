//! JSON wire format of the position backend.
//!
//! The backend answers `GET /api/positions` with an array of vehicle
//! records:
//!
//! ```json
//! [{ "id": "V1", "speed": 42.0,
//!    "current": { "latitude": 22.54, "longitude": 88.33 },
//!    "route": [{ "stop": "Depot", "time": "2024-05-01T08:00:00Z",
//!                "latitude": 22.5, "longitude": 88.3 }] }]
//! ```
//!
//! Every field of [`WireVehicle`] is optional at the serde level so a
//! record with a missing `id` or `current` still decodes; validation then
//! happens in [`WireVehicle::into_snapshot`], which lets the caller drop
//! that one record without failing the whole batch.
//!
//! Route stops are decoded one at a time. A stop with a bad timestamp or
//! coordinate is dropped on its own; the vehicle keeps its identity and
//! the rest of its route.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use tracing::warn;

use crate::geo::Coordinate;
use crate::ids::VehicleId;
use crate::vehicle::{RouteStop, SnapshotError, VehicleSnapshot};

/// A vehicle identifier as sent by the backend.
///
/// Backends have been seen sending numeric ids; both forms are accepted
/// and normalised to their string rendering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WireId {
    /// A string identifier.
    Text(String),
    /// A numeric identifier.
    Number(serde_json::Number),
}

impl WireId {
    /// Normalise to a [`VehicleId`], or `None` for an empty string.
    fn into_vehicle_id(self) -> Option<VehicleId> {
        let raw = match self {
            Self::Text(s) => s,
            Self::Number(n) => n.to_string(),
        };
        if raw.trim().is_empty() {
            None
        } else {
            Some(VehicleId(raw))
        }
    }
}

/// A `{latitude, longitude}` object.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WireCoordinate {
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
}

impl From<WireCoordinate> for Coordinate {
    fn from(w: WireCoordinate) -> Self {
        Self::new(w.latitude, w.longitude)
    }
}

/// One route stop; coordinates are flattened next to the label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireRouteStop {
    /// Stop label.
    #[serde(default)]
    pub stop: String,
    /// ISO-8601 timestamp. A missing offset is read as UTC.
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub time: DateTime<Utc>,
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
}

/// One vehicle record as decoded from the backend.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WireVehicle {
    /// Vehicle identifier.
    #[serde(default)]
    pub id: Option<WireId>,
    /// Speed in km/h; absent is read as zero.
    #[serde(default)]
    pub speed: Option<f64>,
    /// Current position.
    #[serde(default)]
    pub current: Option<WireCoordinate>,
    /// Route stops as sent, each decoded separately into a
    /// [`WireRouteStop`]. Absent or `null` is read as an empty route.
    #[serde(default)]
    pub route: Option<serde_json::Value>,
}

impl WireVehicle {
    /// Validate this record and convert it into a [`VehicleSnapshot`].
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError`] when the id or current position is
    /// missing, the current coordinate is not finite, or the speed is
    /// negative. Bad route stops never fail the record.
    pub fn into_snapshot(self) -> Result<VehicleSnapshot, SnapshotError> {
        let id = self
            .id
            .and_then(WireId::into_vehicle_id)
            .ok_or(SnapshotError::MissingId)?;

        let current: Coordinate = match self.current {
            Some(c) => c.into(),
            None => return Err(SnapshotError::MissingCurrent { id }),
        };
        if !current.is_finite() {
            return Err(SnapshotError::NonFiniteCoordinate {
                id,
                field: "current",
            });
        }

        let speed = self.speed.unwrap_or(0.0);
        if !speed.is_finite() || speed < 0.0 {
            return Err(SnapshotError::InvalidSpeed { id, speed });
        }

        let route = decode_route(&id, self.route);

        Ok(VehicleSnapshot {
            id,
            current,
            speed,
            route,
        })
    }
}

impl From<&VehicleSnapshot> for WireVehicle {
    fn from(snapshot: &VehicleSnapshot) -> Self {
        Self {
            id: Some(WireId::Text(snapshot.id.0.clone())),
            speed: Some(snapshot.speed),
            current: Some(WireCoordinate {
                latitude: snapshot.current.latitude,
                longitude: snapshot.current.longitude,
            }),
            route: Some(serde_json::Value::Array(
                snapshot
                    .route
                    .iter()
                    .filter_map(|s| {
                        serde_json::to_value(WireRouteStop {
                            stop: s.stop.clone(),
                            time: s.time,
                            latitude: s.location.latitude,
                            longitude: s.location.longitude,
                        })
                        .ok()
                    })
                    .collect(),
            )),
        }
    }
}

/// Decode the stops of one vehicle's route, dropping the ones that do not
/// decode or carry a non-finite coordinate.
fn decode_route(id: &VehicleId, raw: Option<serde_json::Value>) -> Vec<RouteStop> {
    let entries = match raw {
        None | Some(serde_json::Value::Null) => return Vec::new(),
        Some(serde_json::Value::Array(entries)) => entries,
        Some(_) => {
            warn!(vehicle_id = %id, "route is not an array, ignoring it");
            return Vec::new();
        }
    };

    entries
        .into_iter()
        .enumerate()
        .filter_map(|(index, entry)| {
            let stop = match serde_json::from_value::<WireRouteStop>(entry) {
                Ok(stop) => stop,
                Err(e) => {
                    warn!(vehicle_id = %id, index, error = %e, "dropping undecodable route stop");
                    return None;
                }
            };
            let location = Coordinate::new(stop.latitude, stop.longitude);
            if !location.is_finite() {
                warn!(vehicle_id = %id, index, "dropping route stop with non-finite coordinate");
                return None;
            }
            Some(RouteStop {
                stop: stop.stop,
                time: stop.time,
                location,
            })
        })
        .collect()
}

/// Parse an RFC 3339 timestamp, falling back to a naive ISO-8601 form
/// interpreted as UTC.
fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw).ok_or_else(|| {
        serde::de::Error::custom(format!("invalid ISO-8601 timestamp: {raw}"))
    })
}

/// Parse a backend timestamp string.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}
