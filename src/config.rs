// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Tracker configuration loaded from environment variables.
//!
//! Every tuning knob of the tracker lives here so the recovery policy can be
//! adjusted per platform without touching the state machine.

use crate::models::SplitUnit;
use std::env;
use std::str::FromStr;

/// Mobile platform the tracker runs on.
///
/// Platforms differ in how aggressively they throttle background location,
/// which drives the GPS silence timeout and the keep-alive measures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Android,
    Ios,
}

impl Platform {
    /// Seconds without a fix before the location stream is considered silent.
    pub fn gps_timeout_secs(self) -> u64 {
        match self {
            Platform::Android => 30,
            Platform::Ios => 15,
        }
    }

    /// Whether battery-exemption and silent-audio keep-alive measures apply.
    pub fn uses_keep_alive(self) -> bool {
        matches!(self, Platform::Android)
    }
}

impl FromStr for Platform {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "android" => Ok(Platform::Android),
            "ios" => Ok(Platform::Ios),
            other => Err(ConfigError::Invalid {
                name: "TRACKER_PLATFORM",
                value: other.to_string(),
            }),
        }
    }
}

/// Tracker configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    // --- Platform / watchdog ---
    pub platform: Platform,
    /// Seconds without a fix before a restart is attempted
    pub gps_timeout_secs: u64,
    /// Watchdog poll cadence
    pub watchdog_interval_secs: u64,
    /// Consecutive restarts without a fix before GPS is reported exhausted
    pub max_restart_attempts: u32,
    /// Consecutive empty batches that count as silence
    pub empty_batch_threshold: u32,
    /// Seconds without a fix before the user-facing "signal lost" advisory
    pub signal_lost_alert_secs: u64,

    // --- Checkpointing / recovery ---
    pub checkpoint_interval_secs: u64,
    /// Checkpoints older than this are discarded on recovery
    pub checkpoint_max_age_secs: i64,
    pub min_recovery_duration_secs: u64,
    pub min_recovery_distance_m: f64,

    // --- Accumulator ---
    /// Fixes kept in memory for route display
    pub route_cache_size: usize,
    /// Increments below this are GPS jitter
    pub min_movement_m: f64,
    /// Only climbs strictly above this count toward elevation gain
    pub elevation_gain_threshold_m: f64,
    /// Fixes reporting worse horizontal accuracy are kept out of distance
    pub max_accuracy_m: Option<f64>,
    /// Fixes after signal reacquisition that are kept out of distance
    pub recovery_skip_fixes: u32,

    // --- Splits ---
    pub split_unit: SplitUnit,

    // --- Storage ---
    /// Directory for the file-backed key-value store
    pub storage_dir: String,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self::for_platform(Platform::Android)
    }
}

impl TrackerConfig {
    /// Production defaults for a platform.
    pub fn for_platform(platform: Platform) -> Self {
        Self {
            platform,
            gps_timeout_secs: platform.gps_timeout_secs(),
            watchdog_interval_secs: 5,
            max_restart_attempts: 100,
            empty_batch_threshold: 3,
            signal_lost_alert_secs: 30,
            checkpoint_interval_secs: 30,
            checkpoint_max_age_secs: 60 * 60,
            min_recovery_duration_secs: 60,
            min_recovery_distance_m: 10.0,
            route_cache_size: 100,
            min_movement_m: 0.5,
            elevation_gain_threshold_m: 2.0,
            max_accuracy_m: Some(50.0),
            recovery_skip_fixes: 2,
            split_unit: SplitUnit::Kilometers,
            storage_dir: ".run-tracker".to_string(),
        }
    }

    /// Default config for testing only.
    ///
    /// Same policy as production, with a small restart ceiling so exhaustion
    /// can be reached in a handful of checks.
    pub fn test_default() -> Self {
        Self {
            max_restart_attempts: 3,
            storage_dir: std::env::temp_dir()
                .join("run-tracker-test")
                .to_string_lossy()
                .into_owned(),
            ..Self::default()
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Every variable is optional; unset variables fall back to the platform
    /// defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let platform = match env::var("TRACKER_PLATFORM") {
            Ok(value) => value.parse()?,
            Err(_) => Platform::Android,
        };
        let defaults = Self::for_platform(platform);

        let config = Self {
            platform,
            gps_timeout_secs: parse_var("TRACKER_GPS_TIMEOUT_SECS", defaults.gps_timeout_secs)?,
            watchdog_interval_secs: parse_var(
                "TRACKER_WATCHDOG_INTERVAL_SECS",
                defaults.watchdog_interval_secs,
            )?,
            max_restart_attempts: parse_var(
                "TRACKER_MAX_RESTART_ATTEMPTS",
                defaults.max_restart_attempts,
            )?,
            empty_batch_threshold: parse_var(
                "TRACKER_EMPTY_BATCH_THRESHOLD",
                defaults.empty_batch_threshold,
            )?,
            signal_lost_alert_secs: parse_var(
                "TRACKER_SIGNAL_LOST_ALERT_SECS",
                defaults.signal_lost_alert_secs,
            )?,
            checkpoint_interval_secs: parse_var(
                "TRACKER_CHECKPOINT_INTERVAL_SECS",
                defaults.checkpoint_interval_secs,
            )?,
            checkpoint_max_age_secs: parse_var(
                "TRACKER_CHECKPOINT_MAX_AGE_SECS",
                defaults.checkpoint_max_age_secs,
            )?,
            min_recovery_duration_secs: parse_var(
                "TRACKER_MIN_RECOVERY_DURATION_SECS",
                defaults.min_recovery_duration_secs,
            )?,
            min_recovery_distance_m: parse_var(
                "TRACKER_MIN_RECOVERY_DISTANCE_M",
                defaults.min_recovery_distance_m,
            )?,
            route_cache_size: parse_var("TRACKER_ROUTE_CACHE_SIZE", defaults.route_cache_size)?,
            min_movement_m: parse_var("TRACKER_MIN_MOVEMENT_M", defaults.min_movement_m)?,
            elevation_gain_threshold_m: parse_var(
                "TRACKER_ELEVATION_GAIN_THRESHOLD_M",
                defaults.elevation_gain_threshold_m,
            )?,
            max_accuracy_m: match env::var("TRACKER_MAX_ACCURACY_M") {
                Ok(v) if v.trim().eq_ignore_ascii_case("none") => None,
                Ok(v) => Some(v.trim().parse().map_err(|_| ConfigError::Invalid {
                    name: "TRACKER_MAX_ACCURACY_M",
                    value: v.clone(),
                })?),
                Err(_) => defaults.max_accuracy_m,
            },
            recovery_skip_fixes: parse_var(
                "TRACKER_RECOVERY_SKIP_FIXES",
                defaults.recovery_skip_fixes,
            )?,
            split_unit: match env::var("TRACKER_SPLIT_UNIT") {
                Ok(v) => v.parse().map_err(|_| ConfigError::Invalid {
                    name: "TRACKER_SPLIT_UNIT",
                    value: v.clone(),
                })?,
                Err(_) => defaults.split_unit,
            },
            storage_dir: env::var("TRACKER_STORAGE_DIR").unwrap_or(defaults.storage_dir),
        };

        config.validate()?;
        Ok(config)
    }

    /// Reject values that would make the tracker misbehave.
    pub fn validate(&self) -> Result<(), ConfigError> {
        fn invalid(name: &'static str, value: impl ToString) -> ConfigError {
            ConfigError::Invalid {
                name,
                value: value.to_string(),
            }
        }

        if self.gps_timeout_secs == 0 {
            return Err(invalid("TRACKER_GPS_TIMEOUT_SECS", self.gps_timeout_secs));
        }
        if self.watchdog_interval_secs == 0 {
            return Err(invalid(
                "TRACKER_WATCHDOG_INTERVAL_SECS",
                self.watchdog_interval_secs,
            ));
        }
        if self.checkpoint_interval_secs == 0 {
            return Err(invalid(
                "TRACKER_CHECKPOINT_INTERVAL_SECS",
                self.checkpoint_interval_secs,
            ));
        }
        if self.checkpoint_max_age_secs <= 0 {
            return Err(invalid(
                "TRACKER_CHECKPOINT_MAX_AGE_SECS",
                self.checkpoint_max_age_secs,
            ));
        }
        if self.route_cache_size == 0 {
            return Err(invalid("TRACKER_ROUTE_CACHE_SIZE", self.route_cache_size));
        }
        if !(self.min_movement_m >= 0.0) {
            return Err(invalid("TRACKER_MIN_MOVEMENT_M", self.min_movement_m));
        }
        if !(self.elevation_gain_threshold_m >= 0.0) {
            return Err(invalid(
                "TRACKER_ELEVATION_GAIN_THRESHOLD_M",
                self.elevation_gain_threshold_m,
            ));
        }
        if let Some(accuracy) = self.max_accuracy_m {
            if !(accuracy > 0.0) {
                return Err(invalid("TRACKER_MAX_ACCURACY_M", accuracy));
            }
        }
        Ok(())
    }
}

fn parse_var<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(value) => value.trim().parse().map_err(|_| ConfigError::Invalid {
            name,
            value: value.clone(),
        }),
        Err(_) => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },
}
