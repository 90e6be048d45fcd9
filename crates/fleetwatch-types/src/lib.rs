//! Shared type definitions for the Fleetwatch live vehicle tracker.
//!
//! This crate is the single source of truth for the types exchanged
//! between the position backend, the animation core, and the view surface.
//! View-facing types flow downstream to `TypeScript` via `ts-rs`.
//!
//! # Modules
//!
//! - [`ids`] -- Opaque string identifier wrappers
//! - [`geo`] -- Latitude/longitude coordinates
//! - [`vehicle`] -- Validated per-poll vehicle snapshots and route stops
//! - [`wire`] -- JSON wire format of the position backend
//! - [`view`] -- Frame projections consumed by the map surface

pub mod geo;
pub mod ids;
pub mod vehicle;
pub mod view;
pub mod wire;

// Re-export all public types at crate root for convenience.
pub use geo::Coordinate;
pub use ids::VehicleId;
pub use vehicle::{RouteStop, SnapshotError, VehicleSnapshot};
pub use view::{DateContext, FleetFrame, RenderedVehicle, VehicleDetail, VehicleStatus};
pub use wire::{WireCoordinate, WireId, WireRouteStop, WireVehicle};

#[cfg(test)]
mod tests {
    //! `TypeScript` binding generation.

    #[test]
    fn export_bindings() {
        // The files are written to the `bindings/` directory relative to
        // the crate root.
        use ts_rs::TS;

        let _ = crate::ids::VehicleId::export_all();
        let _ = crate::geo::Coordinate::export_all();
        let _ = crate::vehicle::RouteStop::export_all();
        let _ = crate::vehicle::VehicleSnapshot::export_all();
        let _ = crate::view::DateContext::export_all();
        let _ = crate::view::VehicleStatus::export_all();
        let _ = crate::view::RenderedVehicle::export_all();
        let _ = crate::view::FleetFrame::export_all();
        let _ = crate::view::VehicleDetail::export_all();
    }
}
