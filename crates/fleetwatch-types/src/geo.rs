//! Geographic coordinate type.
//!
//! Values pass through from the position backend unmodified: no datum
//! conversion, no wrapping of longitudes, no rounding.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// A latitude/longitude pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Coordinate {
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
}

impl Coordinate {
    /// Create a coordinate from latitude and longitude.
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Whether both axes are finite numbers.
    pub const fn is_finite(&self) -> bool {
        self.latitude.is_finite() && self.longitude.is_finite()
    }

    /// Euclidean distance in degree space.
    ///
    /// Only meaningful for comparing how close two points are, not as a
    /// ground distance.
    pub fn planar_distance(&self, other: &Self) -> f64 {
        let d_lat = other.latitude - self.latitude;
        let d_lon = other.longitude - self.longitude;
        d_lat.hypot(d_lon)
    }
}

impl core::fmt::Display for Coordinate {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "({:.6}, {:.6})", self.latitude, self.longitude)
    }
}
