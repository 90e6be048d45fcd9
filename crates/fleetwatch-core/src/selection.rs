//! Vehicle selection and the click-to-pause coupling.
//!
//! The controller is a two-state machine, **NoSelection** and
//! **Selected(id)**, driven by marker clicks and date-context changes.
//! How a click relates to pausing depends on the [`SelectionPolicy`]:
//!
//! | Event | Coupled | Decoupled |
//! |-------|---------|-----------|
//! | click A, nothing selected | select A, toggle A's pause | select A |
//! | click A, A selected | deselect, toggle A's pause | deselect |
//! | click B, A selected | select B, toggle B's pause only | select B |
//! | date change | deselect, clear every pause | deselect, clear every pause |
//!
//! Under the coupled policy, switching from A to B leaves A paused if it
//! was paused. Under the decoupled policy pauses only change through
//! [`VehicleSelectionController::toggle_pause`] or a date change.

use fleetwatch_types::{DateContext, VehicleId};
use serde::Deserialize;
use tracing::{debug, info};

use crate::store::PositionStore;

/// How marker clicks interact with pause flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionPolicy {
    /// A click selects and toggles the clicked vehicle's pause flag.
    #[default]
    Coupled,
    /// A click only selects; pausing is a separate action.
    Decoupled,
}

/// Selection state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Selection {
    /// No vehicle is selected.
    #[default]
    NoSelection,
    /// Exactly one vehicle is selected.
    Selected(VehicleId),
}

/// The selection transition a click caused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// The clicked vehicle became selected from nothing.
    Selected,
    /// The clicked vehicle was already selected and is now deselected.
    Deselected,
    /// The clicked vehicle replaced another selection.
    Replaced {
        /// The vehicle that was selected before.
        previous: VehicleId,
    },
}

/// Result of a click on a known vehicle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClickOutcome {
    /// What happened to the selection.
    pub transition: Transition,
    /// The clicked vehicle's new pause flag, when the click toggled it.
    pub paused: Option<bool>,
}

/// Tracks the selected vehicle and the active date context.
#[derive(Debug, Clone, Default)]
pub struct VehicleSelectionController {
    selection: Selection,
    policy: SelectionPolicy,
    date: DateContext,
}

impl VehicleSelectionController {
    /// Create a controller with nothing selected.
    pub const fn new(policy: SelectionPolicy, date: DateContext) -> Self {
        Self {
            selection: Selection::NoSelection,
            policy,
            date,
        }
    }

    /// Handle a click on a vehicle marker.
    ///
    /// Returns `None` without touching anything when the vehicle is not in
    /// the store.
    pub fn click(&mut self, id: &VehicleId, store: &mut PositionStore) -> Option<ClickOutcome> {
        if !store.contains(id) {
            debug!(vehicle_id = %id, "click on unknown vehicle ignored");
            return None;
        }

        let transition = match std::mem::take(&mut self.selection) {
            Selection::Selected(current) if current == *id => Transition::Deselected,
            Selection::Selected(previous) => Transition::Replaced { previous },
            Selection::NoSelection => Transition::Selected,
        };
        if transition != Transition::Deselected {
            self.selection = Selection::Selected(id.clone());
        }

        let paused = match self.policy {
            SelectionPolicy::Coupled => store.toggle_paused(id),
            SelectionPolicy::Decoupled => None,
        };

        debug!(
            vehicle_id = %id,
            transition = ?transition,
            paused = ?paused,
            "selection changed"
        );

        Some(ClickOutcome { transition, paused })
    }

    /// Toggle a vehicle's pause flag without touching the selection.
    ///
    /// Returns the new flag, or `None` for an unknown vehicle.
    pub fn toggle_pause(&self, id: &VehicleId, store: &mut PositionStore) -> Option<bool> {
        let paused = store.toggle_paused(id);
        debug!(vehicle_id = %id, paused = ?paused, policy = ?self.policy, "pause toggled");
        paused
    }

    /// Switch the date context.
    ///
    /// Always clears the selection and every pause flag in the fleet, even
    /// when the date did not change.
    pub fn change_date(&mut self, date: DateContext, store: &mut PositionStore) {
        info!(from = %self.date, to = %date, "date context changed");
        self.date = date;
        self.selection = Selection::NoSelection;
        store.clear_pauses();
    }

    /// Drop the selection if the selected vehicle left the fleet.
    pub fn retain_known(&mut self, store: &PositionStore) {
        if let Selection::Selected(id) = &self.selection {
            if !store.contains(id) {
                debug!(vehicle_id = %id, "selected vehicle left the fleet");
                self.selection = Selection::NoSelection;
            }
        }
    }

    /// Current selection state.
    pub const fn selection(&self) -> &Selection {
        &self.selection
    }

    /// The selected vehicle, if any.
    pub const fn selected(&self) -> Option<&VehicleId> {
        match &self.selection {
            Selection::Selected(id) => Some(id),
            Selection::NoSelection => None,
        }
    }

    /// Active date context.
    pub const fn date(&self) -> DateContext {
        self.date
    }

    /// Active click policy.
    pub const fn policy(&self) -> SelectionPolicy {
        self.policy
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use fleetwatch_types::{Coordinate, VehicleSnapshot};

    use super::*;

    fn fleet(ids: &[&str]) -> PositionStore {
        let mut store = PositionStore::new();
        store.ingest_snapshots(
            ids.iter()
                .map(|id| VehicleSnapshot::new(*id, Coordinate::new(22.0, 88.0), 10.0)),
        );
        store
    }

    fn coupled() -> VehicleSelectionController {
        VehicleSelectionController::new(SelectionPolicy::Coupled, DateContext::Today)
    }

    #[test]
    fn click_selects_and_pauses_then_second_click_resumes() {
        let mut store = fleet(&["A"]);
        let mut ctl = coupled();
        let a = VehicleId::from("A");

        let first = ctl.click(&a, &mut store);
        assert_eq!(
            first,
            Some(ClickOutcome {
                transition: Transition::Selected,
                paused: Some(true)
            })
        );
        assert_eq!(ctl.selected(), Some(&a));
        assert!(store.is_paused(&a));

        let second = ctl.click(&a, &mut store);
        assert_eq!(
            second,
            Some(ClickOutcome {
                transition: Transition::Deselected,
                paused: Some(false)
            })
        );
        assert_eq!(ctl.selection(), &Selection::NoSelection);
        assert!(!store.is_paused(&a));
    }

    #[test]
    fn switching_selection_leaves_previous_pause_alone() {
        let mut store = fleet(&["A", "B"]);
        let mut ctl = coupled();
        let a = VehicleId::from("A");
        let b = VehicleId::from("B");

        ctl.click(&a, &mut store);
        let outcome = ctl.click(&b, &mut store);
        assert_eq!(
            outcome,
            Some(ClickOutcome {
                transition: Transition::Replaced { previous: a.clone() },
                paused: Some(true)
            })
        );
        assert_eq!(ctl.selected(), Some(&b));
        assert!(store.is_paused(&a));
        assert!(store.is_paused(&b));
    }

    #[test]
    fn click_on_unknown_vehicle_changes_nothing() {
        let mut store = fleet(&["A"]);
        let mut ctl = coupled();
        let a = VehicleId::from("A");
        ctl.click(&a, &mut store);

        assert_eq!(ctl.click(&VehicleId::from("ghost"), &mut store), None);
        assert_eq!(ctl.selected(), Some(&a));
        assert!(store.is_paused(&a));
    }

    #[test]
    fn date_change_deselects_and_clears_pauses() {
        let mut store = fleet(&["A", "B"]);
        let mut ctl = coupled();
        ctl.click(&VehicleId::from("A"), &mut store);
        ctl.click(&VehicleId::from("B"), &mut store);

        ctl.change_date(DateContext::Tomorrow, &mut store);
        assert_eq!(ctl.selection(), &Selection::NoSelection);
        assert_eq!(ctl.date(), DateContext::Tomorrow);
        assert!(store.snapshot().all(|v| !v.paused));

        // Same date again still resets.
        ctl.click(&VehicleId::from("A"), &mut store);
        ctl.change_date(DateContext::Tomorrow, &mut store);
        assert_eq!(ctl.selected(), None);
        assert!(!store.is_paused(&VehicleId::from("A")));
    }

    #[test]
    fn decoupled_click_only_selects() {
        let mut store = fleet(&["A"]);
        let mut ctl = VehicleSelectionController::new(SelectionPolicy::Decoupled, DateContext::Today);
        let a = VehicleId::from("A");

        let outcome = ctl.click(&a, &mut store);
        assert_eq!(
            outcome,
            Some(ClickOutcome {
                transition: Transition::Selected,
                paused: None
            })
        );
        assert!(!store.is_paused(&a));

        assert_eq!(ctl.toggle_pause(&a, &mut store), Some(true));
        assert_eq!(ctl.selected(), Some(&a));

        ctl.click(&a, &mut store);
        assert_eq!(ctl.selected(), None);
        assert!(store.is_paused(&a));
    }

    #[test]
    fn selection_dropped_when_vehicle_leaves_fleet() {
        let mut store = fleet(&["A", "B"]);
        let mut ctl = coupled();
        ctl.click(&VehicleId::from("A"), &mut store);

        store.ingest_snapshots(vec![VehicleSnapshot::new("B", Coordinate::new(0.0, 0.0), 0.0)]);
        ctl.retain_known(&store);
        assert_eq!(ctl.selected(), None);
    }

    #[test]
    fn click_mid_animation_freezes_until_second_click() {
        let mut store = fleet(&["V1"]);
        let mut ctl = coupled();
        let v1 = VehicleId::from("V1");

        store.ingest_snapshots(vec![VehicleSnapshot::new("V1", Coordinate::new(22.1, 88.1), 10.0)]);
        store.tick(Duration::from_millis(2000));
        store.tick(Duration::from_millis(2600));
        ctl.click(&v1, &mut store);
        let frozen = store.get(&v1).map(|v| v.position);

        // Poll 3 with a new position; frames keep coming.
        store.ingest_snapshots(vec![VehicleSnapshot::new("V1", Coordinate::new(22.2, 88.2), 10.0)]);
        for frame in [2700, 3500, 4000, 6000] {
            store.tick(Duration::from_millis(frame));
            assert_eq!(store.get(&v1).map(|v| v.position), frozen);
        }

        ctl.click(&v1, &mut store);
        store.tick(Duration::from_millis(6016));
        store.tick(Duration::from_millis(8016));
        assert_eq!(
            store.get(&v1).map(|v| v.position),
            Some(Coordinate::new(22.2, 88.2))
        );
    }
}
