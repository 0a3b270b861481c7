// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Crash-recovery checkpoints.
//!
//! A checkpoint holds aggregate session metrics only. Raw fixes are never
//! persisted; distance lives in memory and is folded into these totals.

use crate::config::TrackerConfig;
use crate::models::{ActivityKind, Split, TrackingState};
use crate::services::duration::DurationClockState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Periodically persisted snapshot of an active session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub session_id: Uuid,
    pub activity: ActivityKind,
    pub start_time: DateTime<Utc>,
    /// Target distance preset (meters)
    #[serde(default)]
    pub target_distance_m: Option<f64>,
    pub distance_m: f64,
    #[serde(default)]
    pub elevation_gain_m: f64,
    pub duration_secs: u64,
    pub paused_ms: i64,
    #[serde(default)]
    pub pause_count: u32,
    #[serde(default)]
    pub splits: Vec<Split>,
    /// Timestamps the duration is recomputed from after recovery
    pub clock: DurationClockState,
    pub state: TrackingState,
    pub saved_at: DateTime<Utc>,
}

/// Thresholds a checkpoint must meet to be offered for recovery.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RecoveryPolicy {
    pub max_age_secs: i64,
    pub min_duration_secs: u64,
    pub min_distance_m: f64,
}

impl RecoveryPolicy {
    pub fn from_config(config: &TrackerConfig) -> Self {
        Self {
            max_age_secs: config.checkpoint_max_age_secs,
            min_duration_secs: config.min_recovery_duration_secs,
            min_distance_m: config.min_recovery_distance_m,
        }
    }
}

impl Default for RecoveryPolicy {
    fn default() -> Self {
        Self::from_config(&TrackerConfig::default())
    }
}

/// Whether a checkpoint may be restored.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RecoveryDecision {
    Accept,
    /// Saved longer ago than the staleness window
    Stale { age_secs: i64 },
    /// Prior session too short to be worth restoring
    TooShort { duration_secs: u64, distance_m: f64 },
}

impl Checkpoint {
    /// Decide whether this checkpoint is fresh and substantial enough to restore.
    pub fn evaluate(&self, now: DateTime<Utc>, policy: &RecoveryPolicy) -> RecoveryDecision {
        let age_secs = now.signed_duration_since(self.saved_at).num_seconds();
        if age_secs > policy.max_age_secs {
            return RecoveryDecision::Stale { age_secs };
        }

        if self.duration_secs < policy.min_duration_secs || self.distance_m < policy.min_distance_m
        {
            return RecoveryDecision::TooShort {
                duration_secs: self.duration_secs,
                distance_m: self.distance_m,
            };
        }

        RecoveryDecision::Accept
    }
}
