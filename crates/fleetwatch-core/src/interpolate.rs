//! Linear blending between two coordinates.

use fleetwatch_types::Coordinate;

/// Blend each axis of `start` toward `end` by fraction `t`.
///
/// Computed as `start + (end - start) * t` per axis. `t` is expected in
/// `[0, 1]`; callers clamp before calling. Values outside that range
/// extrapolate along the same line.
///
/// The result at `t = 1` can differ from `end` in the last bit. The
/// animation clock snaps to its target when a window completes.
#[allow(clippy::suboptimal_flops)]
pub const fn interpolate(start: Coordinate, end: Coordinate, t: f64) -> Coordinate {
    Coordinate {
        latitude: start.latitude + (end.latitude - start.latitude) * t,
        longitude: start.longitude + (end.longitude - start.longitude) * t,
    }
}
