//! The in-memory table of tracked vehicles.
//!
//! [`PositionStore`] is the single point of mutation for animation state.
//! It is fed fleet snapshots by the poll driver ([`ingest`]), frame
//! timestamps by the frame driver ([`tick`]), and pause flags by the
//! selection controller ([`set_paused`]). It performs no I/O and never
//! blocks; callers own it exclusively, so no locking is involved.
//!
//! [`ingest`]: PositionStore::ingest
//! [`tick`]: PositionStore::tick
//! [`set_paused`]: PositionStore::set_paused

use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use fleetwatch_types::{Coordinate, RouteStop, VehicleId, VehicleSnapshot, WireVehicle};
use tracing::{debug, trace, warn};

use crate::animation::AnimationClock;

/// Everything the store remembers about one vehicle.
#[derive(Debug, Clone, PartialEq)]
struct TrackedVehicle {
    /// Marker interpolation state.
    clock: AnimationClock,
    /// When set, the marker is frozen and frames skip this vehicle.
    paused: bool,
    /// Speed from the latest snapshot.
    speed: f64,
    /// Route from the latest snapshot.
    route: Vec<RouteStop>,
}

impl TrackedVehicle {
    fn from_snapshot(snapshot: VehicleSnapshot) -> Self {
        Self {
            clock: AnimationClock::new(snapshot.current),
            paused: false,
            speed: snapshot.speed,
            route: snapshot.route,
        }
    }
}

/// Counts describing what one [`PositionStore::ingest`] call did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestReport {
    /// Vehicles seen for the first time.
    pub created: usize,
    /// Known vehicles given a new target.
    pub retargeted: usize,
    /// Vehicles dropped because they were absent from the batch.
    pub removed: Vec<VehicleId>,
    /// Records rejected as malformed or duplicated.
    pub dropped: usize,
}

/// Read-only view of one vehicle at the moment it was yielded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VehicleView<'a> {
    /// Vehicle identifier.
    pub id: &'a VehicleId,
    /// Position currently shown.
    pub position: Coordinate,
    /// Last authoritative position.
    pub target: Coordinate,
    /// Whether the marker is frozen.
    pub paused: bool,
    /// Speed from the latest snapshot.
    pub speed: f64,
    /// Route stops in chronological order.
    pub route: &'a [RouteStop],
}

impl VehicleView<'_> {
    /// Route coordinates for drawing a polyline.
    ///
    /// Routes with fewer than two stops have nothing to draw and yield an
    /// empty list.
    pub fn polyline(&self) -> Vec<Coordinate> {
        if self.route.len() > 1 {
            self.route.iter().map(|s| s.location).collect()
        } else {
            Vec::new()
        }
    }
}

/// Animation state for the whole fleet, keyed by vehicle id.
#[derive(Debug, Clone, Default)]
pub struct PositionStore {
    vehicles: BTreeMap<VehicleId, TrackedVehicle>,
}

impl PositionStore {
    /// Create an empty store.
    pub const fn new() -> Self {
        Self {
            vehicles: BTreeMap::new(),
        }
    }

    /// Merge one poll's raw records into the store.
    ///
    /// Records that fail validation are dropped with a warning; the rest of
    /// the batch is still applied. See [`ingest_snapshots`] for the merge
    /// rules.
    ///
    /// [`ingest_snapshots`]: Self::ingest_snapshots
    pub fn ingest<I>(&mut self, batch: I) -> IngestReport
    where
        I: IntoIterator<Item = WireVehicle>,
    {
        let mut rejected: usize = 0;
        let valid: Vec<VehicleSnapshot> = batch
            .into_iter()
            .filter_map(|record| match record.into_snapshot() {
                Ok(snapshot) => Some(snapshot),
                Err(e) => {
                    warn!(error = %e, "dropping malformed vehicle record");
                    rejected = rejected.saturating_add(1);
                    None
                }
            })
            .collect();

        let mut report = self.ingest_snapshots(valid);
        report.dropped = report.dropped.saturating_add(rejected);
        report
    }

    /// Merge one poll's validated snapshots into the store.
    ///
    /// - An unseen id starts at rest on its reported position, unpaused.
    /// - A known id is retargeted to its reported position, even when the
    ///   coordinate did not change.
    /// - Ids in the store but absent from the batch are removed.
    /// - A repeated id within the batch keeps its first occurrence.
    pub fn ingest_snapshots<I>(&mut self, batch: I) -> IngestReport
    where
        I: IntoIterator<Item = VehicleSnapshot>,
    {
        let mut report = IngestReport::default();
        let mut seen: BTreeSet<VehicleId> = BTreeSet::new();

        for snapshot in batch {
            if seen.contains(&snapshot.id) {
                warn!(vehicle_id = %snapshot.id, "duplicate vehicle id in batch, keeping first");
                report.dropped = report.dropped.saturating_add(1);
                continue;
            }
            seen.insert(snapshot.id.clone());

            if let Some(entry) = self.vehicles.get_mut(&snapshot.id) {
                entry.clock.retarget(snapshot.current);
                entry.speed = snapshot.speed;
                entry.route = snapshot.route;
                report.retargeted = report.retargeted.saturating_add(1);
            } else {
                debug!(vehicle_id = %snapshot.id, position = %snapshot.current, "tracking new vehicle");
                self.vehicles
                    .insert(snapshot.id.clone(), TrackedVehicle::from_snapshot(snapshot));
                report.created = report.created.saturating_add(1);
            }
        }

        let before = self.vehicles.len();
        self.vehicles.retain(|id, _| {
            let keep = seen.contains(id);
            if !keep {
                report.removed.push(id.clone());
            }
            keep
        });
        if self.vehicles.len() < before {
            debug!(removed = ?report.removed, "vehicles left the fleet");
        }

        report
    }

    /// Set a vehicle's pause flag.
    ///
    /// Idempotent. Lifting a pause restarts the vehicle's animation window
    /// from where the marker is frozen. Returns `false` for an unknown id,
    /// which is otherwise a no-op.
    pub fn set_paused(&mut self, id: &VehicleId, paused: bool) -> bool {
        let Some(entry) = self.vehicles.get_mut(id) else {
            return false;
        };
        if entry.paused && !paused {
            entry.clock.rearm();
        }
        entry.paused = paused;
        true
    }

    /// Flip a vehicle's pause flag and return the new value.
    ///
    /// Returns `None` for an unknown id.
    pub fn toggle_paused(&mut self, id: &VehicleId) -> Option<bool> {
        let next = !self.vehicles.get(id)?.paused;
        self.set_paused(id, next);
        Some(next)
    }

    /// Lift every pause in the fleet.
    pub fn clear_pauses(&mut self) {
        for entry in self.vehicles.values_mut() {
            if entry.paused {
                entry.paused = false;
                entry.clock.rearm();
            }
        }
    }

    /// Whether a vehicle is paused. Unknown ids read as not paused.
    pub fn is_paused(&self, id: &VehicleId) -> bool {
        self.vehicles.get(id).is_some_and(|v| v.paused)
    }

    /// Advance every unpaused vehicle to frame timestamp `now`.
    ///
    /// Returns how many vehicles are still animating afterwards.
    pub fn tick(&mut self, now: Duration) -> usize {
        let mut animating: usize = 0;
        for entry in self.vehicles.values_mut() {
            if entry.paused {
                continue;
            }
            if entry.clock.advance(now) {
                animating = animating.saturating_add(1);
            }
        }
        trace!(frame_ms = now.as_millis(), animating, "frame advanced");
        animating
    }

    /// Iterate over all vehicles in id order.
    ///
    /// The iterator is lazy and reflects the store as it is when each item
    /// is produced; call again for the next render pass.
    pub fn snapshot(&self) -> impl Iterator<Item = VehicleView<'_>> {
        self.vehicles.iter().map(|(id, entry)| view_of(id, entry))
    }

    /// Look up one vehicle.
    pub fn get(&self, id: &VehicleId) -> Option<VehicleView<'_>> {
        self.vehicles.get_key_value(id).map(|(id, entry)| view_of(id, entry))
    }

    /// Whether a vehicle is currently tracked.
    pub fn contains(&self, id: &VehicleId) -> bool {
        self.vehicles.contains_key(id)
    }

    /// Number of tracked vehicles.
    pub fn len(&self) -> usize {
        self.vehicles.len()
    }

    /// Whether the fleet is empty.
    pub fn is_empty(&self) -> bool {
        self.vehicles.is_empty()
    }

    /// Discard all animation state.
    pub fn clear(&mut self) {
        self.vehicles.clear();
    }
}

fn view_of<'a>(id: &'a VehicleId, entry: &'a TrackedVehicle) -> VehicleView<'a> {
    VehicleView {
        id,
        position: entry.clock.rendered(),
        target: entry.clock.target(),
        paused: entry.paused,
        speed: entry.speed,
        route: &entry.route,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;

    const EPS: f64 = 1e-9;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn snap(id: &str, lat: f64, lon: f64) -> VehicleSnapshot {
        VehicleSnapshot::new(id, Coordinate::new(lat, lon), 30.0)
    }

    fn position(store: &PositionStore, id: &str) -> Coordinate {
        store.get(&VehicleId::from(id)).unwrap().position
    }

    fn close(a: Coordinate, b: Coordinate) -> bool {
        (a.latitude - b.latitude).abs() < EPS && (a.longitude - b.longitude).abs() < EPS
    }

    #[test]
    fn first_sighting_rests_on_reported_position() {
        let mut store = PositionStore::new();
        let report = store.ingest_snapshots(vec![snap("V1", 22.0, 88.0)]);
        assert_eq!(report.created, 1);

        let view = store.get(&VehicleId::from("V1")).unwrap();
        assert_eq!(view.position, Coordinate::new(22.0, 88.0));
        assert_eq!(view.target, Coordinate::new(22.0, 88.0));
        assert!(!view.paused);
    }

    #[test]
    fn two_poll_scenario_interpolates_then_lands() {
        let mut store = PositionStore::new();

        // Poll 1 at t=0.
        store.ingest_snapshots(vec![snap("V1", 22.0, 88.0)]);
        store.tick(ms(0));
        store.tick(ms(1000));
        assert_eq!(position(&store, "V1"), Coordinate::new(22.0, 88.0));

        // Poll 2 at 2000ms.
        store.ingest_snapshots(vec![snap("V1", 22.1, 88.1)]);
        store.tick(ms(2000));
        assert_eq!(position(&store, "V1"), Coordinate::new(22.0, 88.0));

        store.tick(ms(3000));
        assert!(close(position(&store, "V1"), Coordinate::new(22.05, 88.05)));

        store.tick(ms(4000));
        assert_eq!(position(&store, "V1"), Coordinate::new(22.1, 88.1));
    }

    #[test]
    fn identical_batch_twice_does_not_change_trajectory() {
        let batch = vec![snap("V1", 0.0, 0.0), snap("V2", 5.0, 5.0)];
        let next = vec![snap("V1", 1.0, 1.0), snap("V2", 6.0, 4.0)];

        let mut once = PositionStore::new();
        once.ingest_snapshots(batch.clone());
        once.tick(ms(0));
        once.ingest_snapshots(next.clone());

        let mut twice = PositionStore::new();
        twice.ingest_snapshots(batch.clone());
        twice.ingest_snapshots(batch);
        twice.tick(ms(0));
        twice.ingest_snapshots(next.clone());
        twice.ingest_snapshots(next);

        for frame in [100, 500, 1200, 1999, 2100, 2500] {
            once.tick(ms(frame));
            twice.tick(ms(frame));
            for id in ["V1", "V2"] {
                assert_eq!(position(&once, id), position(&twice, id), "{id} at {frame}ms");
            }
        }
    }

    #[test]
    fn paused_vehicle_never_moves_across_retargets() {
        let mut store = PositionStore::new();
        let id = VehicleId::from("V1");
        store.ingest_snapshots(vec![snap("V1", 0.0, 0.0)]);
        store.ingest_snapshots(vec![snap("V1", 10.0, 10.0)]);
        store.tick(ms(0));
        store.tick(ms(700));
        let frozen = position(&store, "V1");

        assert!(store.set_paused(&id, true));
        for (i, frame) in [800_u64, 1500, 2600, 4000, 9000].into_iter().enumerate() {
            let step = f64::from(u32::try_from(i).unwrap());
            store.ingest_snapshots(vec![snap("V1", 20.0 + step, -3.0)]);
            store.tick(ms(frame));
            assert_eq!(position(&store, "V1"), frozen);
        }

        // Resuming heads for the latest target with a fresh window.
        store.set_paused(&id, false);
        store.tick(ms(10_000));
        assert_eq!(position(&store, "V1"), frozen);
        store.tick(ms(12_000));
        assert_eq!(position(&store, "V1"), Coordinate::new(24.0, -3.0));
    }

    #[test]
    fn vehicle_absent_from_poll_is_removed() {
        let mut store = PositionStore::new();
        store.ingest_snapshots(vec![snap("V1", 0.0, 0.0), snap("V2", 1.0, 1.0)]);
        assert_eq!(store.len(), 2);

        let report = store.ingest_snapshots(vec![snap("V1", 0.5, 0.5)]);
        assert_eq!(report.removed, vec![VehicleId::from("V2")]);
        let ids: Vec<&str> = store.snapshot().map(|v| v.id.as_str()).collect();
        assert_eq!(ids, vec!["V1"]);
    }

    #[test]
    fn malformed_records_are_dropped_without_aborting_batch() {
        let mut store = PositionStore::new();
        let good = WireVehicle::from(&snap("V1", 22.0, 88.0));
        let no_id = WireVehicle {
            id: None,
            ..WireVehicle::from(&snap("X", 1.0, 1.0))
        };
        let no_current = WireVehicle {
            current: None,
            ..WireVehicle::from(&snap("V3", 1.0, 1.0))
        };

        let report = store.ingest(vec![no_id, good, no_current]);
        assert_eq!(report.created, 1);
        assert_eq!(report.dropped, 2);
        assert!(store.contains(&VehicleId::from("V1")));
        assert!(!store.contains(&VehicleId::from("V3")));
    }

    #[test]
    fn bad_route_stop_keeps_vehicle_and_its_pause() {
        let mut store = PositionStore::new();
        store.ingest(vec![WireVehicle::from(&snap("V1", 22.0, 88.0))]);
        store.set_paused(&VehicleId::from("V1"), true);
        store.tick(ms(0));

        let record: WireVehicle = serde_json::from_value(serde_json::json!({
            "id": "V1",
            "current": {"latitude": 22.2, "longitude": 88.2},
            "route": [{"stop": "Depot", "time": "01/05/2024 08:00", "latitude": 22.0, "longitude": 88.0}]
        }))
        .unwrap();
        let report = store.ingest(vec![record]);
        assert_eq!(report.retargeted, 1);
        assert!(report.removed.is_empty());

        let view = store.get(&VehicleId::from("V1")).unwrap();
        assert!(view.paused);
        assert!(view.route.is_empty());
        assert_eq!(view.position, Coordinate::new(22.0, 88.0));

        // Resuming animates from the frozen spot instead of jumping.
        store.set_paused(&VehicleId::from("V1"), false);
        store.tick(ms(2000));
        store.tick(ms(3000));
        assert!(close(position(&store, "V1"), Coordinate::new(22.1, 88.1)));
    }

    #[test]
    fn duplicate_ids_keep_first_occurrence() {
        let mut store = PositionStore::new();
        let report = store.ingest_snapshots(vec![snap("V1", 1.0, 1.0), snap("V1", 9.0, 9.0)]);
        assert_eq!(report.created, 1);
        assert_eq!(report.dropped, 1);
        assert_eq!(position(&store, "V1"), Coordinate::new(1.0, 1.0));
    }

    #[test]
    fn pause_on_unknown_id_is_a_no_op() {
        let mut store = PositionStore::new();
        let ghost = VehicleId::from("ghost");
        assert!(!store.set_paused(&ghost, true));
        assert_eq!(store.toggle_paused(&ghost), None);
        assert!(!store.is_paused(&ghost));
        assert!(store.is_empty());
    }

    #[test]
    fn set_paused_is_idempotent() {
        let mut store = PositionStore::new();
        let id = VehicleId::from("V1");
        store.ingest_snapshots(vec![snap("V1", 0.0, 0.0)]);
        store.set_paused(&id, true);
        store.set_paused(&id, true);
        assert!(store.is_paused(&id));
        assert_eq!(store.toggle_paused(&id), Some(false));
        assert_eq!(store.toggle_paused(&id), Some(true));
    }

    #[test]
    fn clear_pauses_resumes_everyone() {
        let mut store = PositionStore::new();
        store.ingest_snapshots(vec![snap("A", 0.0, 0.0), snap("B", 0.0, 0.0)]);
        store.set_paused(&VehicleId::from("A"), true);
        store.set_paused(&VehicleId::from("B"), true);
        store.clear_pauses();
        assert!(store.snapshot().all(|v| !v.paused));
    }

    #[test]
    fn snapshot_is_restartable_and_live() {
        let mut store = PositionStore::new();
        store.ingest_snapshots(vec![snap("A", 0.0, 0.0), snap("B", 0.0, 0.0)]);
        assert_eq!(store.snapshot().count(), 2);
        assert_eq!(store.snapshot().count(), 2);

        store.set_paused(&VehicleId::from("B"), true);
        let paused: Vec<bool> = store.snapshot().map(|v| v.paused).collect();
        assert_eq!(paused, vec![false, true]);
    }

    #[test]
    fn tick_reports_animating_count_and_skips_paused() {
        let mut store = PositionStore::new();
        store.ingest_snapshots(vec![snap("A", 0.0, 0.0), snap("B", 0.0, 0.0)]);
        store.ingest_snapshots(vec![snap("A", 1.0, 0.0), snap("B", 1.0, 0.0)]);
        store.set_paused(&VehicleId::from("B"), true);

        assert_eq!(store.tick(ms(0)), 1);
        assert_eq!(store.tick(ms(2000)), 0);
        assert_eq!(position(&store, "B"), Coordinate::new(0.0, 0.0));
    }

    #[test]
    fn snapshot_carries_speed_and_route() {
        let mut store = PositionStore::new();
        let t0 = Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap();
        let route = vec![
            RouteStop {
                stop: String::from("Depot"),
                time: t0,
                location: Coordinate::new(22.0, 88.0),
            },
            RouteStop {
                stop: String::from("Esplanade"),
                time: t0 + chrono::Duration::minutes(15),
                location: Coordinate::new(22.56, 88.35),
            },
        ];
        store.ingest_snapshots(vec![snap("V1", 22.0, 88.0).with_route(route)]);

        let view = store.get(&VehicleId::from("V1")).unwrap();
        assert!((view.speed - 30.0).abs() < EPS);
        assert_eq!(view.route.len(), 2);
        assert_eq!(
            view.polyline(),
            vec![Coordinate::new(22.0, 88.0), Coordinate::new(22.56, 88.35)]
        );
    }

    #[test]
    fn single_stop_route_has_no_polyline() {
        let mut store = PositionStore::new();
        let stop = RouteStop {
            stop: String::from("Only"),
            time: Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap(),
            location: Coordinate::new(1.0, 1.0),
        };
        store.ingest_snapshots(vec![snap("V1", 1.0, 1.0).with_route(vec![stop])]);
        assert!(store.get(&VehicleId::from("V1")).unwrap().polyline().is_empty());
    }

    #[test]
    fn clear_discards_everything() {
        let mut store = PositionStore::new();
        store.ingest_snapshots(vec![snap("A", 0.0, 0.0)]);
        store.clear();
        assert!(store.is_empty());
        assert_eq!(store.snapshot().count(), 0);
    }
}
