//! Background tasks that feed the view session.
//!
//! Two drivers run beside the session task:
//!
//! - the **poll driver** fetches the fleet once immediately and then every
//!   poll interval, forwarding each successful [`FleetBatch`];
//! - the **frame driver** emits a frame timestamp every frame interval.
//!
//! Each driver owns a [`StopSignal`] and is returned as a [`DriverHandle`].
//! [`DriverHandle::stop`] returns only after the task has exited, so once
//! it resolves the driver can no longer touch anything.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use fleetwatch_source::{FleetBatch, SnapshotSource};
use tokio::sync::{Notify, mpsc};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Cooperative cancellation flag shared with one background task.
#[derive(Debug, Default)]
pub struct StopSignal {
    /// Whether a stop has been requested.
    stopped: AtomicBool,
    /// Wakes the task when a stop is requested.
    notify: Notify,
}

impl StopSignal {
    /// Create an unset signal.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request the task to stop.
    pub fn request_stop(&self) {
        self.stopped.store(true, Ordering::Release);
        self.notify.notify_one();
    }

    /// Check whether a stop has been requested.
    pub fn is_stop_requested(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }

    /// Resolve once a stop has been requested.
    pub async fn stopped(&self) {
        while !self.is_stop_requested() {
            self.notify.notified().await;
        }
    }
}

/// A running driver task.
#[derive(Debug)]
pub struct DriverHandle {
    name: &'static str,
    signal: Arc<StopSignal>,
    task: JoinHandle<()>,
}

impl DriverHandle {
    /// Driver name for logging.
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Whether the task has exited.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Stop the driver and wait for its task to exit.
    pub async fn stop(self) {
        self.signal.request_stop();
        if let Err(e) = self.task.await {
            warn!(driver = self.name, error = %e, "driver task ended abnormally");
        }
        debug!(driver = self.name, "driver stopped");
    }
}

/// Spawn the poll driver.
///
/// Fetches immediately, then every `interval`. A failed fetch is logged
/// and skipped; the session keeps its previous fleet. The driver exits
/// when stopped or when the session stops listening.
pub fn spawn_poll_driver(
    mut source: SnapshotSource,
    interval: Duration,
    tx: mpsc::Sender<FleetBatch>,
) -> DriverHandle {
    let signal = Arc::new(StopSignal::new());
    let task_signal = Arc::clone(&signal);

    let task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(source = source.name(), interval_ms = interval.as_millis(), "poll driver started");

        loop {
            // The first tick completes immediately.
            tokio::select! {
                () = task_signal.stopped() => break,
                _ = ticker.tick() => {}
            }

            let result = tokio::select! {
                () = task_signal.stopped() => break,
                result = source.fetch() => result,
            };

            match result {
                Ok(batch) => {
                    if tx.send(batch).await.is_err() {
                        debug!("session closed, poll driver exiting");
                        break;
                    }
                }
                Err(e) => {
                    warn!(source = source.name(), error = %e, "poll failed, keeping previous fleet");
                }
            }
        }
    });

    DriverHandle {
        name: "poll",
        signal,
        task,
    }
}

/// Spawn the frame driver.
///
/// Emits the time since `origin` every `interval`. Frames are never
/// queued: if the session has not consumed the previous one, the new
/// frame is dropped.
pub fn spawn_frame_driver(
    origin: Instant,
    interval: Duration,
    tx: mpsc::Sender<Duration>,
) -> DriverHandle {
    let signal = Arc::new(StopSignal::new());
    let task_signal = Arc::clone(&signal);

    let task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        debug!(interval_ms = interval.as_millis(), "frame driver started");

        loop {
            let now = tokio::select! {
                () = task_signal.stopped() => break,
                now = ticker.tick() => now,
            };

            match tx.try_send(now.saturating_duration_since(origin)) {
                Ok(()) | Err(mpsc::error::TrySendError::Full(_)) => {}
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    debug!("session closed, frame driver exiting");
                    break;
                }
            }
        }
    });

    DriverHandle {
        name: "frame",
        signal,
        task,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use fleetwatch_source::{ScriptStep, ScriptedSource};
    use fleetwatch_types::{Coordinate, VehicleSnapshot, WireVehicle};

    use super::*;

    fn batch_of(id: &str) -> Vec<WireVehicle> {
        vec![WireVehicle::from(&VehicleSnapshot::new(id, Coordinate::new(22.0, 88.0), 5.0))]
    }

    #[tokio::test(start_paused = true)]
    async fn stop_signal_wakes_waiter() {
        let signal = Arc::new(StopSignal::new());
        let waiter = Arc::clone(&signal);
        let task = tokio::spawn(async move { waiter.stopped().await });

        tokio::task::yield_now().await;
        assert!(!task.is_finished());
        signal.request_stop();
        task.await.unwrap();
        assert!(signal.is_stop_requested());
    }

    #[tokio::test(start_paused = true)]
    async fn poll_driver_fetches_immediately_then_on_interval() {
        let source = SnapshotSource::from(ScriptedSource::from_batches(vec![
            batch_of("V1"),
            batch_of("V2"),
        ]));
        let (tx, mut rx) = mpsc::channel(4);
        let start = Instant::now();
        let driver = spawn_poll_driver(source, Duration::from_millis(2000), tx);

        let first = rx.recv().await.unwrap();
        assert_eq!(start.elapsed(), Duration::ZERO);
        assert_eq!(first.records.len(), 1);

        let _second = rx.recv().await.unwrap();
        assert_eq!(start.elapsed(), Duration::from_millis(2000));

        driver.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn poll_failure_is_skipped() {
        let source = SnapshotSource::from(ScriptedSource::new(vec![
            ScriptStep::Fail("down".to_owned()),
            ScriptStep::Batch(batch_of("V1")),
        ]));
        let (tx, mut rx) = mpsc::channel(4);
        let start = Instant::now();
        let driver = spawn_poll_driver(source, Duration::from_millis(2000), tx);

        let batch = rx.recv().await.unwrap();
        assert_eq!(start.elapsed(), Duration::from_millis(2000));
        assert_eq!(batch.records.len(), 1);

        driver.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn frame_driver_emits_offsets_from_origin() {
        let origin = Instant::now();
        let (tx, mut rx) = mpsc::channel(1);
        let driver = spawn_frame_driver(origin, Duration::from_millis(16), tx);

        assert_eq!(rx.recv().await.unwrap(), Duration::ZERO);
        assert_eq!(rx.recv().await.unwrap(), Duration::from_millis(16));
        assert_eq!(rx.recv().await.unwrap(), Duration::from_millis(32));

        driver.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn stopped_driver_is_finished_and_sends_nothing() {
        let origin = Instant::now();
        let (tx, mut rx) = mpsc::channel(1);
        let driver = spawn_frame_driver(origin, Duration::from_millis(16), tx);
        let _ = rx.recv().await;

        driver.stop().await;
        while rx.try_recv().is_ok() {}
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn driver_exits_when_receiver_dropped() {
        let source = SnapshotSource::from(ScriptedSource::from_batches(vec![batch_of("V1")]));
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let driver = spawn_poll_driver(source, Duration::from_millis(2000), tx);

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(driver.is_finished());
        driver.stop().await;
    }
}
