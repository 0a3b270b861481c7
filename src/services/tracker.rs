// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session tracker: the single owner of an active workout.
//!
//! Handles:
//! - Lifecycle (`idle -> tracking <-> paused -> idle`)
//! - Folding fix batches into distance, elevation and splits
//! - GPS watchdog checks and location-stream restarts
//! - Periodic checkpoints and crash recovery
//!
//! All live metrics are held in memory so snapshots never touch storage.
//! Every mutation happens under one short-lived lock that is never held across
//! an `.await`; fix batches are processed to completion before the next one.

use crate::config::TrackerConfig;
use crate::error::{Result, TrackerError};
use crate::models::{
    ActivityKind, Checkpoint, LocationFix, RecoveryDecision, RecoveryPolicy, RunSession,
    SessionState, TrackerSnapshot, TrackingState,
};
use crate::models::split::pace_secs_per_unit;
use crate::services::distance::{AccumulatorSettings, DistanceAccumulator};
use crate::services::duration::DurationClock;
use crate::services::location::{FixSender, LocationProvider, LocationRequest};
use crate::services::splits::SplitTracker;
use crate::services::watchdog::{
    engage_keep_alive, release_keep_alive, GpsWatchdog, KeepAlive, NoopKeepAlive,
    WatchdogAction, WatchdogSettings,
};
use crate::storage::{keys, KeyValueStore, WriteQueue};
use crate::time_utils::{format_utc_rfc3339, Clock, SystemClock};
use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration as StdDuration;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use uuid::Uuid;

type AutoStopCallback = Arc<dyn Fn() + Send + Sync>;

/// Outcome of `restore_session`.
#[derive(Debug, Clone, PartialEq)]
pub enum RecoveryOutcome {
    /// A session was restored; `resumed_tracking` is false if it was paused
    Restored {
        session_id: Uuid,
        resumed_tracking: bool,
    },
    /// A checkpoint existed but was stale or too short; it has been discarded
    Declined(RecoveryDecision),
    /// Nothing (readable) was persisted
    NothingToRestore,
    /// A session is already running in this process
    AlreadyActive,
}

/// Metadata of the session currently owned by the tracker.
#[derive(Debug, Clone)]
struct ActiveSession {
    id: Uuid,
    activity: ActivityKind,
    start_time: DateTime<Utc>,
    target_distance_m: Option<f64>,
    pause_count: u32,
    auto_stop_fired: bool,
}

struct TrackerInner {
    state: TrackingState,
    session: Option<ActiveSession>,
    /// Bumped on every start/restore/stop so stale background tasks exit
    generation: u64,
    stream_requested: bool,
    /// Set while a stop/discard is tearing down; blocks new sessions
    stopping: bool,
    clock: DurationClock,
    distance: DistanceAccumulator,
    splits: SplitTracker,
    watchdog: GpsWatchdog,
    tasks: Vec<JoinHandle<()>>,
}

impl TrackerInner {
    fn session_state(&self, now: DateTime<Utc>) -> Option<SessionState> {
        let session = self.session.as_ref()?;
        Some(SessionState {
            session_id: session.id,
            activity: session.activity,
            state: self.state,
            start_time: session.start_time,
            target_distance_m: session.target_distance_m,
            pause_count: session.pause_count,
            clock: self.clock.export_state(),
            updated_at: now,
        })
    }

    fn checkpoint(&self, now: DateTime<Utc>) -> Option<Checkpoint> {
        let session = self.session.as_ref()?;
        Some(Checkpoint {
            session_id: session.id,
            activity: session.activity,
            start_time: session.start_time,
            target_distance_m: session.target_distance_m,
            distance_m: self.distance.total_distance_m(),
            elevation_gain_m: self.distance.elevation_gain_m(),
            duration_secs: self.clock.duration_secs(now),
            paused_ms: self.clock.paused_ms(now),
            pause_count: session.pause_count,
            splits: self.splits.splits().to_vec(),
            clock: self.clock.export_state(),
            state: self.state,
            saved_at: now,
        })
    }

    fn reset_metrics(&mut self) {
        self.clock.reset();
        self.distance.reset();
        self.splits.reset();
        self.watchdog.disarm();
    }
}

struct Shared {
    config: TrackerConfig,
    inner: Mutex<TrackerInner>,
    location: Arc<dyn LocationProvider>,
    keep_alive: Arc<dyn KeepAlive>,
    store: Arc<dyn KeyValueStore>,
    writer: WriteQueue,
    clock: Arc<dyn Clock>,
    runtime: Handle,
    auto_stop: Mutex<Option<AutoStopCallback>>,
}

/// Builder for `SessionTracker`.
pub struct TrackerBuilder {
    config: TrackerConfig,
    location: Arc<dyn LocationProvider>,
    store: Arc<dyn KeyValueStore>,
    keep_alive: Arc<dyn KeepAlive>,
    clock: Arc<dyn Clock>,
}

impl TrackerBuilder {
    pub fn keep_alive(mut self, keep_alive: Arc<dyn KeepAlive>) -> Self {
        self.keep_alive = keep_alive;
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Validate the configuration, build the tracker and spawn its write queue.
    ///
    /// # Panics
    /// Panics if called outside a Tokio runtime.
    pub fn build(self) -> Result<SessionTracker> {
        self.config.validate()?;

        let runtime = Handle::current();
        let writer = WriteQueue::spawn_on(&runtime, self.store.clone());

        let inner = TrackerInner {
            state: TrackingState::Idle,
            session: None,
            generation: 0,
            stream_requested: false,
            stopping: false,
            clock: DurationClock::new(),
            distance: DistanceAccumulator::new(AccumulatorSettings::from_config(&self.config)),
            splits: SplitTracker::new(self.config.split_unit),
            watchdog: GpsWatchdog::new(WatchdogSettings::from_config(&self.config)),
            tasks: Vec::new(),
        };

        Ok(SessionTracker {
            shared: Arc::new(Shared {
                config: self.config,
                inner: Mutex::new(inner),
                location: self.location,
                keep_alive: self.keep_alive,
                store: self.store,
                writer,
                clock: self.clock,
                runtime,
                auto_stop: Mutex::new(None),
            }),
        })
    }
}

/// Handle to the process-wide session tracker.
///
/// Construct once at startup and pass clones to every consumer (UI, location
/// callback); clones share the same session.
#[derive(Clone)]
pub struct SessionTracker {
    shared: Arc<Shared>,
}

impl SessionTracker {
    pub fn builder(
        config: TrackerConfig,
        location: Arc<dyn LocationProvider>,
        store: Arc<dyn KeyValueStore>,
    ) -> TrackerBuilder {
        TrackerBuilder {
            config,
            location,
            store,
            keep_alive: Arc::new(NoopKeepAlive),
            clock: Arc::new(SystemClock),
        }
    }

    /// Tracker with the system clock and no keep-alive measures.
    pub fn new(
        config: TrackerConfig,
        location: Arc<dyn LocationProvider>,
        store: Arc<dyn KeyValueStore>,
    ) -> Result<Self> {
        Self::builder(config, location, store).build()
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.shared.config
    }

    fn lock(&self) -> MutexGuard<'_, TrackerInner> {
        // A panic elsewhere must not take live tracking down with it
        self.shared
            .inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn now(&self) -> DateTime<Utc> {
        self.shared.clock.now()
    }

    // ─── Lifecycle ───────────────────────────────────────────────────────────

    /// Start a new session.
    ///
    /// Returns immediately: the location stream is brought up in the
    /// background, and duration advances whether or not it ever starts.
    /// Returns `false` (with a warning) if a session is already active.
    pub fn start(&self, activity: ActivityKind, target_distance_m: Option<f64>) -> bool {
        let now = self.now();
        let target_distance_m = match target_distance_m {
            Some(target) if target.is_finite() && target > 0.0 => Some(target),
            Some(target) => {
                tracing::warn!(target, "Ignoring invalid target distance");
                None
            }
            None => None,
        };

        let (generation, session_state) = {
            let mut inner = self.lock();
            if inner.state.is_active() {
                tracing::warn!(state = ?inner.state, "start() while a session is active; ignoring");
                return false;
            }
            if inner.stopping {
                tracing::warn!("start() while the previous session is stopping; ignoring");
                return false;
            }

            inner.generation += 1;
            inner.reset_metrics();
            inner.clock.start(now);
            inner.splits.configure(activity);
            inner.watchdog.arm(now);
            inner.session = Some(ActiveSession {
                id: Uuid::new_v4(),
                activity,
                start_time: now,
                target_distance_m,
                pause_count: 0,
                auto_stop_fired: false,
            });
            inner.state = TrackingState::Tracking;
            inner.stream_requested = true;
            (inner.generation, inner.session_state(now))
        };

        if let Some(state) = &session_state {
            tracing::info!(
                session_id = %state.session_id,
                activity = %activity,
                target_distance_m = ?target_distance_m,
                started_at = %format_utc_rfc3339(now),
                "Session started"
            );
            self.persist_session_state(state);
        }

        self.spawn_stream_bringup(generation, activity);
        self.spawn_loops(generation);
        true
    }

    /// Pause the session. No-op with a warning unless tracking.
    pub fn pause(&self) -> bool {
        let now = self.now();
        let session_state = {
            let mut inner = self.lock();
            if inner.state != TrackingState::Tracking {
                tracing::warn!(state = ?inner.state, "pause() while not tracking; ignoring");
                return false;
            }
            inner.clock.pause(now);
            if let Some(session) = inner.session.as_mut() {
                session.pause_count += 1;
            }
            inner.state = TrackingState::Paused;
            inner.session_state(now)
        };

        if let Some(state) = &session_state {
            tracing::info!(
                session_id = %state.session_id,
                pause_count = state.pause_count,
                "Session paused"
            );
            self.persist_session_state(state);
        }
        true
    }

    /// Resume a paused session. No-op with a warning unless paused.
    pub fn resume(&self) -> bool {
        let now = self.now();
        let (session_state, bringup) = {
            let mut inner = self.lock();
            if inner.state != TrackingState::Paused {
                tracing::warn!(state = ?inner.state, "resume() while not paused; ignoring");
                return false;
            }
            inner.clock.resume(now);
            inner.watchdog.rearm_window(now);
            inner.state = TrackingState::Tracking;

            // A session restored while paused has no stream yet
            let bringup = if inner.stream_requested {
                None
            } else {
                inner.stream_requested = true;
                inner
                    .session
                    .as_ref()
                    .map(|s| (inner.generation, s.activity))
            };
            (inner.session_state(now), bringup)
        };

        if let Some(state) = &session_state {
            tracing::info!(session_id = %state.session_id, "Session resumed");
            self.persist_session_state(state);
        }
        if let Some((generation, activity)) = bringup {
            self.spawn_stream_bringup(generation, activity);
        }
        true
    }

    /// Stop the session and return its finalized record.
    ///
    /// Stops the location stream, the watchdog and checkpointing, clears
    /// persisted session state and flushes pending writes before returning.
    /// Returns `None` (with a warning) if no session is active.
    pub async fn stop(&self) -> Option<RunSession> {
        let now = self.now();
        let (run, tasks) = {
            let mut inner = self.lock();
            if !inner.state.is_active() {
                tracing::warn!("stop() while idle; ignoring");
                return None;
            }
            let session = inner.session.take()?;

            let run = RunSession {
                session_id: session.id,
                activity: session.activity,
                start_time: session.start_time,
                end_time: now,
                target_distance_m: session.target_distance_m,
                distance_m: inner.distance.total_distance_m(),
                duration_secs: inner.clock.duration_secs(now),
                elevation_gain_m: inner.distance.elevation_gain_m(),
                splits: inner.splits.splits().to_vec(),
                pause_count: session.pause_count,
                paused_ms: inner.clock.paused_ms(now),
                route: inner.distance.route().cloned().collect(),
            };

            inner.state = TrackingState::Idle;
            inner.generation += 1;
            inner.stream_requested = false;
            inner.stopping = true;
            inner.reset_metrics();
            (run, std::mem::take(&mut inner.tasks))
        };

        self.teardown(tasks).await;

        tracing::info!(
            session_id = %run.session_id,
            activity = %run.activity,
            distance_m = run.distance_m,
            duration_secs = run.duration_secs,
            elevation_gain_m = run.elevation_gain_m,
            splits = run.splits.len(),
            "Session stopped"
        );
        Some(run)
    }

    /// Cancel background work, stop the stream and clear persisted state.
    ///
    /// The caller sets `stopping` first; it is cleared once everything here
    /// has completed, so a new session cannot interleave with the teardown.
    async fn teardown(&self, tasks: Vec<JoinHandle<()>>) {
        for task in &tasks {
            task.abort();
        }
        futures_util::future::join_all(tasks).await;

        if let Err(e) = self.shared.location.stop().await {
            tracing::warn!(error = %e, "Failed to stop location stream");
        }
        release_keep_alive(self.shared.keep_alive.as_ref(), self.shared.config.platform).await;

        self.shared.writer.remove(keys::CHECKPOINT);
        self.shared.writer.remove(keys::SESSION_STATE);
        self.shared.writer.flush().await;

        self.lock().stopping = false;
    }

    // ─── Fix ingestion ───────────────────────────────────────────────────────

    /// Fold a batch of fixes into the session, in arrival order.
    ///
    /// Empty batches (and batches with no usable coordinates) feed the
    /// watchdog's silence detector instead.
    pub fn append_fixes(&self, fixes: Vec<LocationFix>) {
        let now = self.now();
        {
            let mut inner = self.lock();
            if !inner.state.is_active() {
                tracing::debug!(count = fixes.len(), "Dropping fix batch while idle");
                return;
            }

            let received = fixes.len();
            let usable: Vec<LocationFix> = fixes
                .into_iter()
                .filter(LocationFix::has_valid_coordinates)
                .collect();
            if usable.len() < received {
                tracing::warn!(
                    dropped = received - usable.len(),
                    "Dropped fixes with invalid coordinates"
                );
            }

            if usable.is_empty() {
                inner.watchdog.on_empty_batch();
                tracing::debug!("Empty fix batch");
                return;
            }

            if inner.watchdog.on_fix(now) {
                inner.distance.enter_recovery_mode();
                tracing::info!("GPS fixes resumed after silence");
            }

            let paused = inner.state == TrackingState::Paused;
            for fix in usable {
                if paused {
                    inner.distance.observe_paused(fix);
                } else {
                    inner.distance.add_fix(fix);
                }
            }

            if !paused && inner.splits.is_enabled() {
                let distance_m = inner.distance.total_distance_m();
                let duration_secs = inner.clock.duration_secs(now);
                let paused_ms = inner.clock.paused_ms(now);
                for split in inner.splits.update(distance_m, duration_secs, paused_ms) {
                    tracing::info!(
                        index = split.index,
                        split_secs = split.split_secs,
                        pace = split.pace_secs_per_unit,
                        "Split completed"
                    );
                }
            }

            tracing::debug!(
                received,
                distance_m = inner.distance.total_distance_m(),
                "Processed fix batch"
            );
        }

        self.check_auto_stop();
    }

    /// Spawn the pump that feeds platform batches into `append_fixes`.
    ///
    /// The returned sender is what the background location callback holds.
    pub fn fix_sender(&self) -> FixSender {
        let (tx, mut rx) = mpsc::unbounded_channel::<Vec<LocationFix>>();
        let weak = Arc::downgrade(&self.shared);
        self.shared.runtime.spawn(async move {
            while let Some(batch) = rx.recv().await {
                let Some(shared) = weak.upgrade() else {
                    break;
                };
                SessionTracker { shared }.append_fixes(batch);
            }
            tracing::debug!("Fix pump stopped");
        });
        FixSender::new(tx)
    }

    // ─── Auto-stop ───────────────────────────────────────────────────────────

    /// Register the callback invoked once when the target distance is reached.
    pub fn on_auto_stop<F>(&self, callback: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        *self
            .shared
            .auto_stop
            .lock()
            .unwrap_or_else(|e| e.into_inner()) = Some(Arc::new(callback));
    }

    /// Whether the target distance has been reached.
    ///
    /// The first time it is, the registered callback fires. The tracker never
    /// stops itself; the caller decides.
    pub fn check_auto_stop(&self) -> bool {
        let fire = {
            let mut inner = self.lock();
            let distance_m = inner.distance.total_distance_m();
            let Some(session) = inner.session.as_mut() else {
                return false;
            };
            let Some(target) = session.target_distance_m else {
                return false;
            };
            if distance_m < target {
                return false;
            }
            let first = !session.auto_stop_fired;
            session.auto_stop_fired = true;
            if first {
                tracing::info!(target, distance_m, "Target distance reached");
            }
            first
        };

        if fire {
            let callback = self
                .shared
                .auto_stop
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .clone();
            if let Some(callback) = callback {
                callback();
            }
        }
        true
    }

    // ─── Reads ───────────────────────────────────────────────────────────────

    /// Live metrics for UI polling. Never touches storage.
    pub fn current_snapshot(&self) -> TrackerSnapshot {
        let now = self.now();
        let inner = self.lock();
        let distance_m = inner.distance.total_distance_m();
        let duration_secs = inner.clock.duration_secs(now);
        let session = inner.session.as_ref();
        let target_distance_m = session.and_then(|s| s.target_distance_m);

        TrackerSnapshot {
            state: inner.state,
            session_id: session.map(|s| s.id.to_string()),
            activity: session.map(|s| s.activity),
            distance_m,
            duration_secs,
            elevation_gain_m: inner.distance.elevation_gain_m(),
            splits: inner.splits.splits().to_vec(),
            pause_count: session.map(|s| s.pause_count).unwrap_or(0),
            average_pace_secs_per_unit: pace_secs_per_unit(
                duration_secs,
                distance_m,
                inner.splits.unit(),
            ),
            target_distance_m,
            target_progress: target_distance_m.map(|target| (distance_m / target).min(1.0)),
            gps: inner.watchdog.status(now),
            route_points: inner.distance.route_len() as u32,
        }
    }

    /// True while a session exists, paused or not.
    pub fn is_currently_tracking(&self) -> bool {
        self.lock().state.is_active()
    }

    pub fn state(&self) -> TrackingState {
        self.lock().state
    }

    /// Active seconds of the current session.
    pub fn duration_secs(&self) -> u64 {
        let now = self.now();
        self.lock().clock.duration_secs(now)
    }

    // ─── Checkpointing & recovery ────────────────────────────────────────────

    /// Enqueue a checkpoint of the current metrics.
    ///
    /// Only saves while tracking (not paused). Returns whether one was queued.
    pub fn save_checkpoint(&self) -> bool {
        let now = self.now();
        let checkpoint = {
            let inner = self.lock();
            if inner.state != TrackingState::Tracking {
                return false;
            }
            inner.checkpoint(now)
        };
        let Some(checkpoint) = checkpoint else {
            return false;
        };

        match serde_json::to_string(&checkpoint) {
            Ok(json) => {
                self.shared.writer.set(keys::CHECKPOINT, json);
                tracing::debug!(
                    session_id = %checkpoint.session_id,
                    distance_m = checkpoint.distance_m,
                    duration_secs = checkpoint.duration_secs,
                    "Checkpoint queued"
                );
                true
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to serialize checkpoint (ignored)");
                false
            }
        }
    }

    /// Wait for queued checkpoint/session writes to reach the store.
    pub async fn flush_writes(&self) {
        self.shared.writer.flush().await;
    }

    /// Restore a session interrupted by a crash or process kill.
    ///
    /// Stale or too-short checkpoints are discarded. A restored session that
    /// was actively tracking gets its location stream back; a paused one
    /// waits for `resume()`.
    pub async fn restore_session(&self) -> RecoveryOutcome {
        let busy = {
            let inner = self.lock();
            inner.state.is_active() || inner.stopping
        };
        if busy {
            tracing::warn!("restore_session() while a session is active; ignoring");
            return RecoveryOutcome::AlreadyActive;
        }

        let Some(checkpoint) = self.load::<Checkpoint>(keys::CHECKPOINT).await else {
            // Session state without a checkpoint means the crash came before
            // the first checkpoint; too short to recover
            if let Ok(Some(_)) = self.shared.store.get(keys::SESSION_STATE).await {
                tracing::info!("Discarding session state with no checkpoint");
                self.clear_persisted().await;
            }
            return RecoveryOutcome::NothingToRestore;
        };

        let now = self.now();
        let decision = checkpoint.evaluate(now, &RecoveryPolicy::from_config(&self.shared.config));
        if decision != RecoveryDecision::Accept {
            tracing::info!(
                session_id = %checkpoint.session_id,
                decision = ?decision,
                "Discarding unrecoverable checkpoint"
            );
            self.clear_persisted().await;
            return RecoveryOutcome::Declined(decision);
        }

        // Session state is written on every pause/resume, so it can be newer
        let session_state = self
            .load::<SessionState>(keys::SESSION_STATE)
            .await
            .filter(|s| s.session_id == checkpoint.session_id && s.updated_at >= checkpoint.saved_at);
        let (state, clock_state, pause_count) = match &session_state {
            Some(s) => (s.state, s.clock, s.pause_count),
            None => (checkpoint.state, checkpoint.clock, checkpoint.pause_count),
        };
        let state = if state.is_active() {
            state
        } else {
            TrackingState::Tracking
        };

        let generation = {
            let mut inner = self.lock();
            if inner.state.is_active() || inner.stopping {
                return RecoveryOutcome::AlreadyActive;
            }
            inner.generation += 1;
            inner.reset_metrics();
            inner.clock.restore_state(clock_state);
            inner
                .distance
                .restore_totals(checkpoint.distance_m, checkpoint.elevation_gain_m);
            inner.splits.configure(checkpoint.activity);
            inner.splits.restore_splits(checkpoint.splits.clone());
            inner.watchdog.arm(now);
            inner.session = Some(ActiveSession {
                id: checkpoint.session_id,
                activity: checkpoint.activity,
                start_time: checkpoint.start_time,
                target_distance_m: checkpoint.target_distance_m,
                pause_count,
                auto_stop_fired: false,
            });
            inner.state = state;
            inner.stream_requested = state == TrackingState::Tracking;
            inner.generation
        };

        let resumed_tracking = state == TrackingState::Tracking;
        tracing::info!(
            session_id = %checkpoint.session_id,
            distance_m = checkpoint.distance_m,
            duration_secs = checkpoint.duration_secs,
            resumed_tracking,
            "Session restored from checkpoint"
        );

        if resumed_tracking {
            self.spawn_stream_bringup(generation, checkpoint.activity);
        }
        self.spawn_loops(generation);

        RecoveryOutcome::Restored {
            session_id: checkpoint.session_id,
            resumed_tracking,
        }
    }

    /// Drop a recovered (or recoverable) session without producing a record.
    pub async fn discard_recovered_session(&self) {
        let tasks = {
            let mut inner = self.lock();
            if inner.state.is_active() {
                if let Some(session) = &inner.session {
                    tracing::info!(session_id = %session.id, "Discarding recovered session");
                }
            }
            inner.session = None;
            inner.state = TrackingState::Idle;
            inner.generation += 1;
            inner.stream_requested = false;
            inner.reset_metrics();
            let tasks = std::mem::take(&mut inner.tasks);
            inner.stopping = !tasks.is_empty();
            tasks
        };

        if tasks.is_empty() {
            self.clear_persisted().await;
        } else {
            self.teardown(tasks).await;
        }
    }

    async fn clear_persisted(&self) {
        self.shared.writer.remove(keys::CHECKPOINT);
        self.shared.writer.remove(keys::SESSION_STATE);
        self.shared.writer.flush().await;
    }

    /// Read and parse a persisted document. Failures are logged and read as absent.
    async fn load<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = match self.shared.store.get(key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!(key, error = %e, "Failed to read persisted state");
                return None;
            }
        };

        match serde_json::from_str(&raw).map_err(TrackerError::from) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(key, error = %e, "Discarding unreadable persisted state");
                self.shared.writer.remove(key);
                None
            }
        }
    }

    fn persist_session_state(&self, state: &SessionState) {
        match serde_json::to_string(state) {
            Ok(json) => self.shared.writer.set(keys::SESSION_STATE, json),
            Err(e) => tracing::warn!(error = %e, "Failed to serialize session state (ignored)"),
        }
    }

    // ─── GPS health ──────────────────────────────────────────────────────────

    /// One watchdog check. Restarts the location stream when it has gone silent.
    ///
    /// Runs on the watchdog interval while tracking; callable directly.
    pub async fn check_gps_health(&self) {
        let now = self.now();
        let (action, generation, activity) = {
            let mut inner = self.lock();
            if inner.state != TrackingState::Tracking {
                return;
            }
            let Some(activity) = inner.session.as_ref().map(|s| s.activity) else {
                return;
            };
            (inner.watchdog.check(now), inner.generation, activity)
        };

        match action {
            WatchdogAction::None => {}
            WatchdogAction::Exhausted => {
                tracing::error!(
                    max_attempts = self.shared.config.max_restart_attempts,
                    "GPS restart attempts exhausted; continuing with duration-only tracking"
                );
            }
            WatchdogAction::Restart { attempt } => {
                tracing::warn!(attempt, "GPS silent; restarting location stream");

                if let Err(e) = self.shared.location.stop().await {
                    tracing::debug!(error = %e, "Location stop before restart failed");
                }
                let request = LocationRequest::for_activity(activity);
                let result = self.shared.location.start(&request).await;
                if let Err(e) = &result {
                    tracing::warn!(attempt, error = %e, "Location stream restart failed");
                }

                let mut inner = self.lock();
                if inner.generation == generation {
                    inner.watchdog.restart_issued(result.is_ok());
                }
            }
        }
    }

    // ─── Background tasks ────────────────────────────────────────────────────

    fn is_current(&self, generation: u64) -> bool {
        let inner = self.lock();
        inner.generation == generation && inner.state.is_active()
    }

    fn track_task(&self, generation: u64, task: JoinHandle<()>) {
        let mut inner = self.lock();
        if inner.generation == generation {
            inner.tasks.push(task);
        } else {
            task.abort();
        }
    }

    /// Bring up keep-alive measures and the location stream, off the caller's path.
    fn spawn_stream_bringup(&self, generation: u64, activity: ActivityKind) {
        let tracker = self.clone();
        let task = self.shared.runtime.spawn(async move {
            let shared = &tracker.shared;
            engage_keep_alive(shared.keep_alive.as_ref(), shared.config.platform).await;

            let request = LocationRequest::for_activity(activity);
            match shared.location.start(&request).await {
                Ok(()) => tracing::info!(activity = %activity, "Location stream started"),
                // The watchdog retries once the silence timeout passes
                Err(e) => tracing::warn!(error = %e, "Location stream failed to start"),
            }

            if !tracker.is_current(generation) {
                if let Err(e) = shared.location.stop().await {
                    tracing::warn!(error = %e, "Failed to stop orphaned location stream");
                }
            }
        });
        self.track_task(generation, task);
    }

    /// Spawn the watchdog and checkpoint loops for a session generation.
    fn spawn_loops(&self, generation: u64) {
        let config = &self.shared.config;

        let watchdog = spawn_interval(
            &self.shared.runtime,
            Arc::downgrade(&self.shared),
            generation,
            StdDuration::from_secs(config.watchdog_interval_secs),
            |tracker| async move { tracker.check_gps_health().await },
        );
        self.track_task(generation, watchdog);

        let checkpoint = spawn_interval(
            &self.shared.runtime,
            Arc::downgrade(&self.shared),
            generation,
            StdDuration::from_secs(config.checkpoint_interval_secs),
            |tracker| async move {
                tracker.save_checkpoint();
            },
        );
        self.track_task(generation, checkpoint);
    }
}

/// Run `tick` every `period` until the tracker is dropped or the session ends.
fn spawn_interval<F, Fut>(
    runtime: &Handle,
    weak: Weak<Shared>,
    generation: u64,
    period: StdDuration,
    tick: F,
) -> JoinHandle<()>
where
    F: Fn(SessionTracker) -> Fut + Send + 'static,
    Fut: std::future::Future<Output = ()> + Send + 'static,
{
    runtime.spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        interval.tick().await; // first tick completes immediately

        loop {
            interval.tick().await;
            let Some(shared) = weak.upgrade() else {
                break;
            };
            let tracker = SessionTracker { shared };
            if !tracker.is_current(generation) {
                break;
            }
            tick(tracker).await;
        }
    })
}
