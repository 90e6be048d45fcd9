//! Position reconciliation and marker animation for the Fleetwatch tracker.
//!
//! This crate turns discrete position snapshots, arriving every couple of
//! seconds, into smooth marker motion. It owns no I/O and no timers: the
//! view session feeds it poll results and frame timestamps.
//!
//! # Modules
//!
//! - [`interpolate`] -- Linear blending between two coordinates.
//! - [`animation`] -- Per-vehicle [`AnimationClock`] state machine.
//! - [`store`] -- [`PositionStore`], the table of tracked vehicles.
//! - [`selection`] -- [`VehicleSelectionController`] and click policies.
//! - [`config`] -- Configuration loading from `fleetwatch-config.yaml`.

pub mod animation;
pub mod config;
pub mod interpolate;
pub mod selection;
pub mod store;

pub use animation::{ANIMATION_DURATION, AnimationClock, ClockPhase};
pub use config::{ConfigError, ViewerConfig};
pub use interpolate::interpolate;
pub use selection::{ClickOutcome, Selection, SelectionPolicy, Transition, VehicleSelectionController};
pub use store::{IngestReport, PositionStore, VehicleView};
