//! Per-vehicle animation clock.
//!
//! Each tracked vehicle owns one [`AnimationClock`] that turns frame
//! timestamps into marker positions. The clock is an explicit state
//! machine:
//!
//! ```text
//!            retarget / rearm                first frame
//!   Idle ---------------------> Armed ---------------------> Animating
//!    ^                                                          |
//!    +--------------------- progress reaches 1 -----------------+
//! ```
//!
//! - **Idle** -- the marker sits on its target; frames are ignored.
//! - **Armed** -- a new target was accepted. The next frame anchors the
//!   animation window at its own timestamp, so that frame renders exactly
//!   the position shown before the retarget.
//! - **Animating** -- progress is `min(elapsed / ANIMATION_DURATION, 1)`
//!   measured from the anchor frame.
//!
//! A retarget always re-anchors the start position to the *rendered*
//! position, which may itself be mid-flight. Polls arrive every 2000 ms and
//! animations last 2000 ms, so overlapping cycles are the normal case; the
//! marker never jumps backward.
//!
//! Frame timestamps are monotonic offsets from an arbitrary origin (the
//! view session start). The clock never reads the wall clock itself.

use std::time::Duration;

use fleetwatch_types::Coordinate;

use crate::interpolate::interpolate;

/// How long a marker takes to travel from its start to its target.
pub const ANIMATION_DURATION: Duration = Duration::from_millis(2000);

/// Scheduling phase of an [`AnimationClock`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockPhase {
    /// At rest on the target; no frames needed.
    Idle,
    /// Waiting for the first frame after a retarget or resume.
    Armed,
    /// Interpolating; the window opened at `started_at`.
    Animating {
        /// Frame timestamp that anchored the current window.
        started_at: Duration,
    },
}

/// Interpolation state of one vehicle's marker.
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationClock {
    /// Position currently shown.
    rendered: Coordinate,
    /// Most recent authoritative position.
    target: Coordinate,
    /// Rendered position captured when the current cycle began.
    start: Coordinate,
    /// Time spent in the current cycle as of the last frame.
    elapsed: Duration,
    /// Where the clock is in its Idle/Armed/Animating cycle.
    phase: ClockPhase,
}

impl AnimationClock {
    /// Create a clock resting on `position`.
    pub const fn new(position: Coordinate) -> Self {
        Self {
            rendered: position,
            target: position,
            start: position,
            elapsed: Duration::ZERO,
            phase: ClockPhase::Idle,
        }
    }

    /// Accept a new authoritative position and begin a new cycle.
    ///
    /// Called for every poll that reports this vehicle, whether or not the
    /// coordinate changed. The rendered position is left untouched.
    pub const fn retarget(&mut self, new_target: Coordinate) {
        self.start = self.rendered;
        self.target = new_target;
        self.elapsed = Duration::ZERO;
        self.phase = ClockPhase::Armed;
    }

    /// Restart the current cycle from the rendered position.
    ///
    /// Used when a paused vehicle resumes: motion continues toward the
    /// current target with a fresh duration window opened by the next
    /// frame. A clock that already reached its target stays idle.
    pub const fn rearm(&mut self) {
        if matches!(self.phase, ClockPhase::Idle) {
            return;
        }
        self.start = self.rendered;
        self.elapsed = Duration::ZERO;
        self.phase = ClockPhase::Armed;
    }

    /// Advance the animation to frame timestamp `now`.
    ///
    /// Returns `true` while more frames are needed to reach the target and
    /// `false` once the clock is idle. Frames older than the anchor are
    /// treated as the anchor itself.
    pub fn advance(&mut self, now: Duration) -> bool {
        match self.phase {
            ClockPhase::Idle => return false,
            ClockPhase::Armed => {
                self.phase = ClockPhase::Animating { started_at: now };
                self.elapsed = Duration::ZERO;
            }
            ClockPhase::Animating { started_at } => {
                self.elapsed = now.saturating_sub(started_at);
            }
        }

        let t = progress(self.elapsed);
        if t >= 1.0 {
            self.rendered = self.target;
            self.phase = ClockPhase::Idle;
            false
        } else {
            self.rendered = interpolate(self.start, self.target, t);
            true
        }
    }

    /// Position currently shown.
    pub const fn rendered(&self) -> Coordinate {
        self.rendered
    }

    /// Most recent authoritative position.
    pub const fn target(&self) -> Coordinate {
        self.target
    }

    /// Position the current cycle started from.
    pub const fn start(&self) -> Coordinate {
        self.start
    }

    /// Time spent in the current cycle as of the last frame.
    pub const fn elapsed_since_retarget(&self) -> Duration {
        self.elapsed
    }

    /// Current scheduling phase.
    pub const fn phase(&self) -> ClockPhase {
        self.phase
    }

    /// Whether the clock has nothing left to animate.
    pub const fn is_idle(&self) -> bool {
        matches!(self.phase, ClockPhase::Idle)
    }
}

/// Fraction of [`ANIMATION_DURATION`] covered by `elapsed`, capped at 1.
fn progress(elapsed: Duration) -> f64 {
    (elapsed.as_secs_f64() / ANIMATION_DURATION.as_secs_f64()).min(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn close(a: Coordinate, b: Coordinate) -> bool {
        (a.latitude - b.latitude).abs() < EPS && (a.longitude - b.longitude).abs() < EPS
    }

    #[test]
    fn new_clock_is_idle_on_its_position() {
        let mut clock = AnimationClock::new(Coordinate::new(22.0, 88.0));
        assert!(clock.is_idle());
        assert!(!clock.advance(ms(500)));
        assert_eq!(clock.rendered(), Coordinate::new(22.0, 88.0));
    }

    #[test]
    fn first_frame_after_retarget_anchors_without_moving() {
        let origin = Coordinate::new(22.0, 88.0);
        let mut clock = AnimationClock::new(origin);
        clock.retarget(Coordinate::new(22.1, 88.1));
        assert_eq!(clock.phase(), ClockPhase::Armed);

        assert!(clock.advance(ms(2000)));
        assert_eq!(clock.phase(), ClockPhase::Animating { started_at: ms(2000) });
        assert_eq!(clock.rendered(), origin);
    }

    #[test]
    fn reaches_target_after_duration_then_idles() {
        let mut clock = AnimationClock::new(Coordinate::new(22.0, 88.0));
        clock.retarget(Coordinate::new(22.1, 88.1));
        clock.advance(ms(2000));

        assert!(clock.advance(ms(3000)));
        assert!(close(clock.rendered(), Coordinate::new(22.05, 88.05)));
        assert_eq!(clock.elapsed_since_retarget(), ms(1000));

        assert!(!clock.advance(ms(4000)));
        assert_eq!(clock.rendered(), Coordinate::new(22.1, 88.1));
        assert!(clock.is_idle());

        // Further frames are ignored while idle.
        assert!(!clock.advance(ms(9000)));
        assert_eq!(clock.rendered(), Coordinate::new(22.1, 88.1));
    }

    #[test]
    fn overshooting_frame_lands_on_target() {
        let mut clock = AnimationClock::new(Coordinate::new(0.0, 0.0));
        clock.retarget(Coordinate::new(1.0, 1.0));
        clock.advance(ms(0));
        assert!(!clock.advance(ms(10_000)));
        assert_eq!(clock.rendered(), Coordinate::new(1.0, 1.0));
    }

    #[test]
    fn retarget_mid_flight_continues_from_rendered_position() {
        let mut clock = AnimationClock::new(Coordinate::new(0.0, 0.0));
        clock.retarget(Coordinate::new(10.0, 10.0));
        clock.advance(ms(0));
        clock.advance(ms(1000));
        let halfway = clock.rendered();
        assert!(close(halfway, Coordinate::new(5.0, 5.0)));

        clock.retarget(Coordinate::new(20.0, 0.0));
        assert_eq!(clock.start(), halfway);
        assert_eq!(clock.elapsed_since_retarget(), Duration::ZERO);

        // The next frame renders exactly the pre-retarget position.
        clock.advance(ms(1016));
        assert_eq!(clock.rendered(), interpolate(halfway, Coordinate::new(20.0, 0.0), 0.0));
        assert_eq!(clock.rendered(), halfway);

        clock.advance(ms(3016));
        assert_eq!(clock.rendered(), Coordinate::new(20.0, 0.0));
    }

    #[test]
    fn start_position_is_fixed_within_a_cycle() {
        let mut clock = AnimationClock::new(Coordinate::new(0.0, 0.0));
        clock.retarget(Coordinate::new(4.0, 4.0));
        let start = clock.start();
        for frame in [0, 100, 700, 1500, 1999] {
            clock.advance(ms(frame));
            assert_eq!(clock.start(), start);
        }
    }

    #[test]
    fn rearm_opens_a_fresh_window_from_rendered_position() {
        let mut clock = AnimationClock::new(Coordinate::new(0.0, 0.0));
        clock.retarget(Coordinate::new(10.0, 0.0));
        clock.advance(ms(0));
        clock.advance(ms(500));
        let frozen = clock.rendered();

        clock.rearm();
        assert_eq!(clock.phase(), ClockPhase::Armed);
        assert_eq!(clock.start(), frozen);

        clock.advance(ms(60_000));
        assert_eq!(clock.rendered(), frozen);
        clock.advance(ms(61_000));
        assert!(close(clock.rendered(), interpolate(frozen, Coordinate::new(10.0, 0.0), 0.5)));
        assert!(!clock.advance(ms(62_000)));
        assert_eq!(clock.rendered(), Coordinate::new(10.0, 0.0));
    }

    #[test]
    fn rearm_on_idle_clock_is_a_no_op() {
        let mut clock = AnimationClock::new(Coordinate::new(3.0, 4.0));
        clock.rearm();
        assert!(clock.is_idle());
    }

    #[test]
    fn stale_frame_before_anchor_does_not_move_backwards() {
        let mut clock = AnimationClock::new(Coordinate::new(0.0, 0.0));
        clock.retarget(Coordinate::new(1.0, 0.0));
        clock.advance(ms(5000));
        clock.advance(ms(4000));
        assert_eq!(clock.rendered(), Coordinate::new(0.0, 0.0));
    }
}
