//! The view session: one task that owns all animation state.
//!
//! [`spawn_session`] starts three tasks: the session itself plus the poll
//! and frame drivers. The session is the only owner of the
//! [`PositionStore`] and the [`VehicleSelectionController`]; everything
//! else talks to it through channels:
//!
//! - fleet batches from the poll driver,
//! - frame timestamps from the frame driver,
//! - [`SessionCommand`]s from the view binding, each with a `oneshot`
//!   reply.
//!
//! Every applied event republishes a [`FleetFrame`] on a broadcast channel
//! (for `WebSocket` clients) and a watch channel (for request handlers
//! that need the latest frame).
//!
//! # Teardown
//!
//! [`SessionTask::shutdown`] stops both drivers, waits for them to exit,
//! clears the store, and closes the channels. No driver task is alive once
//! it returns.

use std::sync::Arc;
use std::time::Duration;

use fleetwatch_core::config::ViewerConfig;
use fleetwatch_core::{ClickOutcome, PositionStore, SelectionPolicy, VehicleSelectionController, VehicleView};
use fleetwatch_source::{FleetBatch, SnapshotSource};
use fleetwatch_types::{
    Coordinate, DateContext, FleetFrame, RenderedVehicle, VehicleDetail, VehicleId, VehicleStatus,
};
use serde::Serialize;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::drivers::{StopSignal, spawn_frame_driver, spawn_poll_driver};

/// Map centre reported before the first poll arrives.
pub const DEFAULT_CENTER: Coordinate = Coordinate::new(22.5405, 88.3375);

/// Capacity of the frame broadcast channel.
///
/// A subscriber that falls further behind skips to the newest frame.
const FRAME_BROADCAST_CAPACITY: usize = 64;

/// Capacity of the command channel.
const COMMAND_CAPACITY: usize = 32;

/// Session timing and behaviour.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Time between polls.
    pub poll_interval: Duration,
    /// Time between rendered frames.
    pub frame_interval: Duration,
    /// Click behaviour.
    pub policy: SelectionPolicy,
    /// Date context at start.
    pub initial_date: DateContext,
    /// Whether frames carry a camera centre.
    pub camera_follow: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::from(&ViewerConfig::default())
    }
}

impl From<&ViewerConfig> for SessionConfig {
    fn from(config: &ViewerConfig) -> Self {
        Self {
            poll_interval: Duration::from_millis(config.source.poll_interval_ms),
            frame_interval: Duration::from_millis(config.animation.frame_interval_ms),
            policy: config.selection.policy,
            initial_date: config.view.initial_date,
            camera_follow: config.view.camera_follow,
        }
    }
}

/// Selection state returned by click and pause commands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelectionReply {
    /// Whether the id named a tracked vehicle.
    pub known: bool,
    /// Selected vehicle after the command.
    pub selected: Option<VehicleId>,
    /// The vehicle's pause flag after the command, when it changed.
    pub paused: Option<bool>,
}

/// Requests from the view binding to the session.
#[derive(Debug)]
pub enum SessionCommand {
    /// A marker was clicked.
    Click {
        /// Clicked vehicle.
        id: VehicleId,
        /// Reply channel.
        reply: oneshot::Sender<SelectionReply>,
    },
    /// Toggle a vehicle's pause flag without selecting.
    TogglePause {
        /// Target vehicle.
        id: VehicleId,
        /// Reply channel.
        reply: oneshot::Sender<SelectionReply>,
    },
    /// Switch the date context.
    ChangeDate {
        /// New context.
        date: DateContext,
        /// Reply channel; receives the frame after the reset.
        reply: oneshot::Sender<FleetFrame>,
    },
    /// Fetch detail panel data.
    Detail {
        /// Vehicle to describe.
        id: VehicleId,
        /// Reply channel; `None` for an unknown vehicle.
        reply: oneshot::Sender<Option<VehicleDetail>>,
    },
}

/// Errors talking to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    /// The session task has shut down.
    #[error("view session is closed")]
    Closed,
}

/// Cloneable client side of a running session.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    commands: mpsc::Sender<SessionCommand>,
    frames: broadcast::Sender<FleetFrame>,
    latest: watch::Receiver<FleetFrame>,
}

impl SessionHandle {
    /// Subscribe to every published frame.
    pub fn subscribe(&self) -> broadcast::Receiver<FleetFrame> {
        self.frames.subscribe()
    }

    /// The most recently published frame.
    pub fn latest_frame(&self) -> FleetFrame {
        self.latest.borrow().clone()
    }

    /// A watch receiver tracking the latest frame.
    pub fn watch_frames(&self) -> watch::Receiver<FleetFrame> {
        self.latest.clone()
    }

    /// Resolve once the session has shut down.
    pub async fn closed(&self) {
        self.commands.closed().await;
    }

    /// Click a vehicle marker.
    pub async fn click(&self, id: VehicleId) -> Result<SelectionReply, SessionError> {
        self.request(|reply| SessionCommand::Click { id, reply }).await
    }

    /// Toggle a vehicle's pause flag.
    pub async fn toggle_pause(&self, id: VehicleId) -> Result<SelectionReply, SessionError> {
        self.request(|reply| SessionCommand::TogglePause { id, reply })
            .await
    }

    /// Switch the date context.
    pub async fn change_date(&self, date: DateContext) -> Result<FleetFrame, SessionError> {
        self.request(|reply| SessionCommand::ChangeDate { date, reply })
            .await
    }

    /// Detail panel data for one vehicle.
    pub async fn detail(&self, id: VehicleId) -> Result<Option<VehicleDetail>, SessionError> {
        self.request(|reply| SessionCommand::Detail { id, reply }).await
    }

    async fn request<T, F>(&self, build: F) -> Result<T, SessionError>
    where
        F: FnOnce(oneshot::Sender<T>) -> SessionCommand,
    {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(build(tx))
            .await
            .map_err(|_closed| SessionError::Closed)?;
        rx.await.map_err(|_dropped| SessionError::Closed)
    }
}

/// Counters reported when a session ends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionSummary {
    /// Fleet batches applied.
    pub batches: u64,
    /// Frames rendered.
    pub frames: u64,
    /// Records dropped as malformed, undecodable, or duplicated.
    pub dropped_records: u64,
}

/// Owner side of a running session.
#[derive(Debug)]
pub struct SessionTask {
    signal: Arc<StopSignal>,
    task: JoinHandle<SessionSummary>,
}

impl SessionTask {
    /// Stop the session and its drivers, waiting for all of them to exit.
    pub async fn shutdown(self) -> SessionSummary {
        self.signal.request_stop();
        match self.task.await {
            Ok(summary) => summary,
            Err(e) => {
                tracing::error!(error = %e, "view session task ended abnormally");
                SessionSummary::default()
            }
        }
    }

    /// Whether the session task has exited.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

/// Start a session fed by `source`.
///
/// Must be called within a Tokio runtime. Frame timestamps are measured
/// from the moment of this call.
pub fn spawn_session(config: SessionConfig, source: SnapshotSource) -> (SessionHandle, SessionTask) {
    let origin = Instant::now();
    let (command_tx, command_rx) = mpsc::channel(COMMAND_CAPACITY);
    let (frame_tx, _) = broadcast::channel(FRAME_BROADCAST_CAPACITY);
    let (poll_tx, poll_rx) = mpsc::channel(1);
    let (tick_tx, tick_rx) = mpsc::channel(1);

    let session = ViewSession::new(&config);
    let (latest_tx, latest_rx) = watch::channel(session.render());

    let handle = SessionHandle {
        commands: command_tx,
        frames: frame_tx.clone(),
        latest: latest_rx,
    };

    let signal = Arc::new(StopSignal::new());
    let task_signal = Arc::clone(&signal);

    let task = tokio::spawn(async move {
        let poll = spawn_poll_driver(source, config.poll_interval, poll_tx);
        let frames = spawn_frame_driver(origin, config.frame_interval, tick_tx);
        let mut session = session;
        let mut inbox = Inbox {
            batches: poll_rx,
            ticks: tick_rx,
            commands: command_rx,
        };
        let publisher = Publisher {
            broadcast: frame_tx,
            latest: latest_tx,
        };

        info!(
            policy = ?config.policy,
            poll_interval_ms = config.poll_interval.as_millis(),
            frame_interval_ms = config.frame_interval.as_millis(),
            "view session started"
        );

        session.run(&task_signal, &mut inbox, &publisher).await;

        poll.stop().await;
        frames.stop().await;
        session.store.clear();
        inbox.close();

        info!(
            batches = session.summary.batches,
            frames = session.summary.frames,
            dropped_records = session.summary.dropped_records,
            "view session stopped"
        );
        session.summary
    });

    (handle, SessionTask { signal, task })
}

/// Receiving ends owned by the session task.
struct Inbox {
    batches: mpsc::Receiver<FleetBatch>,
    ticks: mpsc::Receiver<Duration>,
    commands: mpsc::Receiver<SessionCommand>,
}

impl Inbox {
    fn close(&mut self) {
        self.batches.close();
        self.ticks.close();
        self.commands.close();
    }
}

/// Sending ends for rendered frames.
struct Publisher {
    broadcast: broadcast::Sender<FleetFrame>,
    latest: watch::Sender<FleetFrame>,
}

impl Publisher {
    fn publish(&self, frame: FleetFrame) {
        // No subscribers is fine.
        let _ = self.broadcast.send(frame.clone());
        self.latest.send_replace(frame);
    }
}

/// State exclusively owned by the session task.
#[derive(Debug)]
pub(crate) struct ViewSession {
    store: PositionStore,
    controller: VehicleSelectionController,
    camera_follow: bool,
    /// Timestamp of the latest rendered frame.
    last_frame: Duration,
    /// Whether any poll has been applied yet.
    polled: bool,
    summary: SessionSummary,
}

impl ViewSession {
    pub(crate) const fn new(config: &SessionConfig) -> Self {
        Self {
            store: PositionStore::new(),
            controller: VehicleSelectionController::new(config.policy, config.initial_date),
            camera_follow: config.camera_follow,
            last_frame: Duration::ZERO,
            polled: false,
            summary: SessionSummary {
                batches: 0,
                frames: 0,
                dropped_records: 0,
            },
        }
    }

    async fn run(&mut self, signal: &StopSignal, inbox: &mut Inbox, publisher: &Publisher) {
        loop {
            tokio::select! {
                biased;
                () = signal.stopped() => break,
                Some(command) = inbox.commands.recv() => {
                    self.on_command(command);
                }
                Some(batch) = inbox.batches.recv() => {
                    self.on_batch(batch);
                }
                Some(now) = inbox.ticks.recv() => {
                    self.on_frame(now);
                }
                else => break,
            }
            publisher.publish(self.render());
        }
    }

    /// Apply one poll's batch.
    pub(crate) fn on_batch(&mut self, batch: FleetBatch) {
        let report = self.store.ingest(batch.records);
        let dropped = report.dropped.saturating_add(batch.undecodable);
        self.controller.retain_known(&self.store);
        self.polled = true;
        self.summary.batches = self.summary.batches.saturating_add(1);
        self.summary.dropped_records = self
            .summary
            .dropped_records
            .saturating_add(u64::try_from(dropped).unwrap_or(u64::MAX));

        debug!(
            created = report.created,
            retargeted = report.retargeted,
            removed = report.removed.len(),
            dropped,
            fleet = self.store.len(),
            "fleet batch applied"
        );
    }

    /// Advance the animation to frame timestamp `now`.
    pub(crate) fn on_frame(&mut self, now: Duration) {
        self.store.tick(now);
        self.last_frame = now;
        self.summary.frames = self.summary.frames.saturating_add(1);
    }

    /// Handle a command and send its reply.
    pub(crate) fn on_command(&mut self, command: SessionCommand) {
        // A dropped reply receiver means the caller gave up; nothing to do.
        match command {
            SessionCommand::Click { id, reply } => {
                let outcome = self.controller.click(&id, &mut self.store);
                let _ = reply.send(self.selection_reply(outcome.as_ref()));
            }
            SessionCommand::TogglePause { id, reply } => {
                let paused = self.controller.toggle_pause(&id, &mut self.store);
                let _ = reply.send(SelectionReply {
                    known: paused.is_some(),
                    selected: self.controller.selected().cloned(),
                    paused,
                });
            }
            SessionCommand::ChangeDate { date, reply } => {
                self.controller.change_date(date, &mut self.store);
                let _ = reply.send(self.render());
            }
            SessionCommand::Detail { id, reply } => {
                let _ = reply.send(self.detail(&id));
            }
        }
    }

    fn selection_reply(&self, outcome: Option<&ClickOutcome>) -> SelectionReply {
        SelectionReply {
            known: outcome.is_some(),
            selected: self.controller.selected().cloned(),
            paused: outcome.and_then(|o| o.paused),
        }
    }

    /// Detail panel data for one vehicle.
    pub(crate) fn detail(&self, id: &VehicleId) -> Option<VehicleDetail> {
        self.store.get(id).map(|v| VehicleDetail {
            id: v.id.clone(),
            speed: v.speed,
            reported: v.target,
            rendered: v.position,
            status: VehicleStatus::from_paused(v.paused),
            route: v.route.to_vec(),
        })
    }

    /// Project the current state into a frame.
    pub(crate) fn render(&self) -> FleetFrame {
        let selected = self.controller.selected();
        let vehicles: Vec<RenderedVehicle> = self
            .store
            .snapshot()
            .map(|v| rendered_vehicle(&v, selected))
            .collect();

        let camera_center = if !self.camera_follow {
            None
        } else if !self.polled {
            Some(DEFAULT_CENTER)
        } else {
            selected
                .and_then(|id| self.store.get(id))
                .map(|v| v.position)
                .or_else(|| vehicles.last().map(|v| v.position))
        };

        FleetFrame {
            frame_ms: u64::try_from(self.last_frame.as_millis()).unwrap_or(u64::MAX),
            date: self.controller.date(),
            selected: selected.cloned(),
            camera_center,
            vehicles,
        }
    }
}

fn rendered_vehicle(view: &VehicleView<'_>, selected: Option<&VehicleId>) -> RenderedVehicle {
    RenderedVehicle {
        id: view.id.clone(),
        position: view.position,
        speed: view.speed,
        status: VehicleStatus::from_paused(view.paused),
        selected: selected == Some(view.id),
        polyline: view.polyline(),
    }
}
