//! Projections handed to the view surface.
//!
//! These are owned, serializable copies of the core's state, taken once per
//! rendered frame. The map surface places markers from [`RenderedVehicle`],
//! draws route polylines, fills popups from `speed` and `status`, and shows
//! the detail panel from [`VehicleDetail`].

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::geo::Coordinate;
use crate::ids::VehicleId;
use crate::vehicle::RouteStop;

/// The date context selected in the view header.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS,
)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum DateContext {
    /// Today's movements.
    #[default]
    Today,
    /// Tomorrow's planned movements.
    Tomorrow,
}

impl core::fmt::Display for DateContext {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Today => f.write_str("today"),
            Self::Tomorrow => f.write_str("tomorrow"),
        }
    }
}

impl core::str::FromStr for DateContext {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "today" => Ok(Self::Today),
            "tomorrow" => Ok(Self::Tomorrow),
            other => Err(format!("unknown date context: {other}")),
        }
    }
}

/// Popup status of a vehicle marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum VehicleStatus {
    /// The marker follows reported positions.
    Moving,
    /// The marker is frozen where it was when paused.
    Paused,
}

impl VehicleStatus {
    /// Derive the status from a pause flag.
    pub const fn from_paused(paused: bool) -> Self {
        if paused { Self::Paused } else { Self::Moving }
    }
}

/// One vehicle as it should appear in the current frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct RenderedVehicle {
    /// Vehicle identifier.
    pub id: VehicleId,
    /// Where to place the marker.
    pub position: Coordinate,
    /// Reported speed in km/h.
    pub speed: f64,
    /// Moving or paused.
    pub status: VehicleStatus,
    /// Whether this vehicle is the selected one.
    pub selected: bool,
    /// Route polyline; empty when the route has fewer than two stops.
    pub polyline: Vec<Coordinate>,
}

/// Everything the view needs to draw one frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct FleetFrame {
    /// Milliseconds since the view session started.
    pub frame_ms: u64,
    /// Active date context.
    pub date: DateContext,
    /// Selected vehicle, if any.
    pub selected: Option<VehicleId>,
    /// Where the camera should centre, when camera follow is enabled.
    pub camera_center: Option<Coordinate>,
    /// All vehicles, ordered by id.
    pub vehicles: Vec<RenderedVehicle>,
}

/// Detail panel content for one vehicle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct VehicleDetail {
    /// Vehicle identifier.
    pub id: VehicleId,
    /// Reported speed in km/h.
    pub speed: f64,
    /// Last reported (authoritative) position.
    pub reported: Coordinate,
    /// Position currently shown on the map.
    pub rendered: Coordinate,
    /// Moving or paused.
    pub status: VehicleStatus,
    /// Route stops in chronological order.
    pub route: Vec<RouteStop>,
}
