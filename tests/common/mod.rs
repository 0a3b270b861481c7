// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use chrono::{DateTime, TimeZone, Utc};
use run_tracker::config::TrackerConfig;
use run_tracker::error::{Result, TrackerError};
use run_tracker::models::LocationFix;
use run_tracker::services::{KeepAlive, LocationProvider, LocationRequest, SessionTracker};
use run_tracker::services::distance::EARTH_RADIUS_M;
use run_tracker::storage::MemoryStore;
use run_tracker::time_utils::{Clock, ManualClock};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Base latitude/longitude for synthetic routes (Rancho San Antonio).
pub const BASE_LAT: f64 = 37.3326;
pub const BASE_LON: f64 = -122.0869;

/// Fixed start time for deterministic tests.
#[allow(dead_code)]
pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 7, 0, 0).unwrap()
}

/// Latitude `meters` due north of `lat` (exact for Haversine along a meridian).
#[allow(dead_code)]
pub fn north_of(lat: f64, meters: f64) -> f64 {
    lat + (meters / EARTH_RADIUS_M).to_degrees()
}

/// Location provider that records what the tracker asked of it.
#[derive(Default)]
pub struct MockLocationProvider {
    starts: AtomicUsize,
    stops: AtomicUsize,
    fail_start: AtomicBool,
    last_request: Mutex<Option<LocationRequest>>,
    stop_gate: Arc<tokio::sync::Mutex<()>>,
}

#[allow(dead_code)]
impl MockLocationProvider {
    pub fn starts(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }

    pub fn stops(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }

    pub fn set_fail_start(&self, fail: bool) {
        self.fail_start.store(fail, Ordering::SeqCst);
    }

    pub fn last_request(&self) -> Option<LocationRequest> {
        self.last_request.lock().unwrap().clone()
    }

    /// Block every `stop()` until the returned guard is dropped.
    pub async fn hold_stops(&self) -> tokio::sync::OwnedMutexGuard<()> {
        self.stop_gate.clone().lock_owned().await
    }
}

#[async_trait::async_trait]
impl LocationProvider for MockLocationProvider {
    async fn start(&self, request: &LocationRequest) -> Result<()> {
        self.starts.fetch_add(1, Ordering::SeqCst);
        *self.last_request.lock().unwrap() = Some(request.clone());
        if self.fail_start.load(Ordering::SeqCst) {
            return Err(TrackerError::Location("permission denied".to_string()));
        }
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        let _gate = self.stop_gate.lock().await;
        self.stops.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Keep-alive that counts calls and always fails, to prove failures are ignored.
#[derive(Default)]
pub struct RecordingKeepAlive {
    pub exemptions: AtomicUsize,
    pub acquired: AtomicUsize,
    pub released: AtomicUsize,
}

#[async_trait::async_trait]
impl KeepAlive for RecordingKeepAlive {
    async fn request_battery_exemption(&self) -> Result<()> {
        self.exemptions.fetch_add(1, Ordering::SeqCst);
        Err(TrackerError::Location("battery exemption declined".to_string()))
    }

    async fn acquire_audio_session(&self) -> Result<()> {
        self.acquired.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn release_audio_session(&self) -> Result<()> {
        self.released.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// A tracker wired to in-memory fakes and a manual clock.
#[allow(dead_code)]
pub struct Harness {
    pub tracker: SessionTracker,
    pub clock: Arc<ManualClock>,
    pub store: Arc<MemoryStore>,
    pub location: Arc<MockLocationProvider>,
    pub keep_alive: Arc<RecordingKeepAlive>,
    pub config: TrackerConfig,
}

#[allow(dead_code)]
impl Harness {
    /// Must be called inside a Tokio runtime.
    pub fn new() -> Self {
        Self::with_config(TrackerConfig::test_default())
    }

    pub fn with_config(config: TrackerConfig) -> Self {
        Self::assemble(
            config,
            Arc::new(ManualClock::new(t0())),
            Arc::new(MemoryStore::new()),
        )
    }

    /// A fresh tracker over the same store and clock, as after a process restart.
    pub fn reopen(&self) -> Self {
        Self::assemble(self.config.clone(), self.clock.clone(), self.store.clone())
    }

    fn assemble(config: TrackerConfig, clock: Arc<ManualClock>, store: Arc<MemoryStore>) -> Self {
        let location = Arc::new(MockLocationProvider::default());
        let keep_alive = Arc::new(RecordingKeepAlive::default());
        let tracker = SessionTracker::builder(config.clone(), location.clone(), store.clone())
            .clock(clock.clone())
            .keep_alive(keep_alive.clone())
            .build()
            .expect("test config is valid");

        Self {
            tracker,
            clock,
            store,
            location,
            keep_alive,
            config,
        }
    }

    /// A fix at the current manual-clock time.
    pub fn fix(&self, latitude: f64) -> LocationFix {
        LocationFix::new(latitude, BASE_LON, self.clock.now())
    }

    /// Advance the clock one second and deliver a single fix.
    pub fn step(&self, latitude: f64) {
        self.clock.advance_secs(1);
        self.tracker.append_fixes(vec![self.fix(latitude)]);
    }
}

/// Let spawned background work (stream bring-up, pumps) run.
#[allow(dead_code)]
pub async fn settle() {
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
}
