// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! GPS health watchdog and background-survival measures.
//!
//! Mobile location services can stop delivering fixes without raising an
//! error (backgrounding, OEM battery throttling, permission revocation). The
//! watchdog notices the silence and asks the tracker to restart the stream,
//! up to a deliberately high ceiling. Exhaustion is advisory only: the session
//! and its duration keep running.

use crate::config::{Platform, TrackerConfig};
use crate::error::Result;
use crate::models::{GpsHealth, GpsStatus};
use crate::time_utils::millis_between;
use chrono::{DateTime, Utc};

const EXHAUSTED_ADVISORY: &str =
    "GPS unavailable. Distance is no longer being recorded, but your time is still running.";
const SIGNAL_LOST_ADVISORY: &str =
    "GPS signal lost. Check that you have a clear view of the sky.";

/// Watchdog thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchdogSettings {
    pub timeout_secs: u64,
    pub max_restart_attempts: u32,
    pub empty_batch_threshold: u32,
    pub signal_lost_alert_secs: u64,
}

impl WatchdogSettings {
    pub fn from_config(config: &TrackerConfig) -> Self {
        Self {
            timeout_secs: config.gps_timeout_secs,
            max_restart_attempts: config.max_restart_attempts,
            empty_batch_threshold: config.empty_batch_threshold,
            signal_lost_alert_secs: config.signal_lost_alert_secs,
        }
    }
}

impl Default for WatchdogSettings {
    fn default() -> Self {
        Self::from_config(&TrackerConfig::default())
    }
}

/// What the tracker should do after a health check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchdogAction {
    /// Nothing to do
    None,
    /// Stop and restart the location subscription
    Restart { attempt: u32 },
    /// Ceiling just exceeded; report to the UI, keep the session running
    Exhausted,
}

#[derive(Debug, Clone)]
pub struct GpsWatchdog {
    settings: WatchdogSettings,
    health: GpsHealth,
    armed: bool,
    /// Silence is measured from the latest of: arming, last fix, last restart
    silence_since: Option<DateTime<Utc>>,
    last_fix_at: Option<DateTime<Utc>>,
    armed_at: Option<DateTime<Utc>>,
    restart_attempts: u32,
    empty_batches: u32,
}

impl GpsWatchdog {
    pub fn new(settings: WatchdogSettings) -> Self {
        Self {
            settings,
            health: GpsHealth::Healthy,
            armed: false,
            silence_since: None,
            last_fix_at: None,
            armed_at: None,
            restart_attempts: 0,
            empty_batches: 0,
        }
    }

    /// Start watching a new session.
    pub fn arm(&mut self, now: DateTime<Utc>) {
        *self = Self::new(self.settings);
        self.armed = true;
        self.armed_at = Some(now);
        self.silence_since = Some(now);
    }

    pub fn disarm(&mut self) {
        *self = Self::new(self.settings);
    }

    /// Restart the silence window, e.g. after a pause during which no checks ran.
    pub fn rearm_window(&mut self, now: DateTime<Utc>) {
        self.silence_since = Some(now);
        self.empty_batches = 0;
    }

    pub fn health(&self) -> GpsHealth {
        self.health
    }

    pub fn restart_attempts(&self) -> u32 {
        self.restart_attempts
    }

    pub fn last_fix_at(&self) -> Option<DateTime<Utc>> {
        self.last_fix_at
    }

    /// A non-empty batch arrived.
    ///
    /// Returns `true` when this ends a silence, which tells the tracker to hold
    /// the next fixes out of distance while the signal settles.
    pub fn on_fix(&mut self, now: DateTime<Utc>) -> bool {
        let recovered = self.health != GpsHealth::Healthy;
        self.health = GpsHealth::Healthy;
        self.restart_attempts = 0;
        self.empty_batches = 0;
        self.last_fix_at = Some(now);
        self.silence_since = Some(now);
        recovered
    }

    /// An empty batch arrived; enough of these in a row count as silence.
    pub fn on_empty_batch(&mut self) {
        self.empty_batches = self.empty_batches.saturating_add(1);
    }

    /// Periodic health check.
    pub fn check(&mut self, now: DateTime<Utc>) -> WatchdogAction {
        if !self.armed || self.health == GpsHealth::Exhausted {
            return WatchdogAction::None;
        }

        let silent_ms = self
            .silence_since
            .map(|since| millis_between(since, now))
            .unwrap_or(0);
        let timed_out = silent_ms > (self.settings.timeout_secs as i64) * 1000;
        let empty_streak = self.settings.empty_batch_threshold > 0
            && self.empty_batches >= self.settings.empty_batch_threshold;

        if !timed_out && !empty_streak {
            return WatchdogAction::None;
        }

        if self.restart_attempts >= self.settings.max_restart_attempts {
            self.health = GpsHealth::Exhausted;
            return WatchdogAction::Exhausted;
        }

        self.restart_attempts += 1;
        self.health = GpsHealth::Silent;
        self.empty_batches = 0;
        self.silence_since = Some(now);
        WatchdogAction::Restart {
            attempt: self.restart_attempts,
        }
    }

    /// The tracker issued a restart. A failed restart stays counted; the next
    /// check after the timeout retries.
    pub fn restart_issued(&mut self, succeeded: bool) {
        if self.health == GpsHealth::Exhausted {
            return;
        }
        self.health = if succeeded {
            GpsHealth::Recovering
        } else {
            GpsHealth::Silent
        };
    }

    /// Advisory status for snapshots.
    pub fn status(&self, now: DateTime<Utc>) -> GpsStatus {
        let reference = self.last_fix_at.or(self.armed_at);
        let seconds_since_last_fix = if self.armed {
            reference.map(|at| (millis_between(at, now) / 1000) as u64)
        } else {
            None
        };

        let advisory = match (self.health, seconds_since_last_fix) {
            (GpsHealth::Exhausted, _) => Some(EXHAUSTED_ADVISORY.to_string()),
            (_, Some(secs)) if secs > self.settings.signal_lost_alert_secs => {
                Some(SIGNAL_LOST_ADVISORY.to_string())
            }
            _ => None,
        };

        GpsStatus {
            health: self.health,
            restart_attempts: self.restart_attempts,
            seconds_since_last_fix,
            advisory,
        }
    }
}

impl Default for GpsWatchdog {
    fn default() -> Self {
        Self::new(WatchdogSettings::default())
    }
}

/// Platform hooks that discourage the OS from evicting a tracking process.
///
/// These are optimizations, not correctness requirements: every failure is
/// logged and ignored.
#[async_trait::async_trait]
pub trait KeepAlive: Send + Sync {
    /// Ask the user/OS to exempt the app from battery optimization.
    async fn request_battery_exemption(&self) -> Result<()>;

    /// Hold a low-priority silent audio-recording handle.
    async fn acquire_audio_session(&self) -> Result<()>;

    async fn release_audio_session(&self) -> Result<()>;
}

/// Keep-alive that does nothing (iOS, desktop, tests).
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopKeepAlive;

#[async_trait::async_trait]
impl KeepAlive for NoopKeepAlive {
    async fn request_battery_exemption(&self) -> Result<()> {
        Ok(())
    }

    async fn acquire_audio_session(&self) -> Result<()> {
        Ok(())
    }

    async fn release_audio_session(&self) -> Result<()> {
        Ok(())
    }
}

/// Apply best-effort keep-alive measures for a platform.
pub async fn engage_keep_alive(keep_alive: &dyn KeepAlive, platform: Platform) {
    if !platform.uses_keep_alive() {
        return;
    }

    if let Err(e) = keep_alive.request_battery_exemption().await {
        tracing::warn!(error = %e, "Battery optimization exemption failed (ignored)");
    }
    if let Err(e) = keep_alive.acquire_audio_session().await {
        tracing::warn!(error = %e, "Silent audio keep-alive failed (ignored)");
    }
}

/// Release whatever `engage_keep_alive` acquired.
pub async fn release_keep_alive(keep_alive: &dyn KeepAlive, platform: Platform) {
    if !platform.uses_keep_alive() {
        return;
    }

    if let Err(e) = keep_alive.release_audio_session().await {
        tracing::warn!(error = %e, "Failed to release silent audio keep-alive (ignored)");
    }
}
