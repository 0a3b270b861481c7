// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Split detection for runs.

use crate::models::split::pace_secs_per_unit;
use crate::models::{ActivityKind, Split, SplitUnit};

/// Detects whole-unit crossings and records one split per unit crossed.
#[derive(Debug, Clone)]
pub struct SplitTracker {
    unit: SplitUnit,
    enabled: bool,
    last_split_index: u32,
    last_split_elapsed_secs: u64,
    splits: Vec<Split>,
}

impl SplitTracker {
    pub fn new(unit: SplitUnit) -> Self {
        Self {
            unit,
            enabled: false,
            last_split_index: 0,
            last_split_elapsed_secs: 0,
            splits: Vec::new(),
        }
    }

    /// Enable or disable split recording for a session's activity.
    pub fn configure(&mut self, activity: ActivityKind) {
        self.enabled = activity.records_splits();
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn unit(&self) -> SplitUnit {
        self.unit
    }

    /// Record any splits completed at `distance_m`. Returns the new splits.
    ///
    /// Sparse fixes can jump several units at once; the active time since the
    /// previous split is then shared evenly across the crossed units so no
    /// split is skipped.
    pub fn update(&mut self, distance_m: f64, duration_secs: u64, paused_ms: i64) -> &[Split] {
        let before = self.splits.len();
        if !self.enabled || !distance_m.is_finite() || distance_m <= 0.0 {
            return &self.splits[before..];
        }

        let completed = (distance_m / self.unit.meters()).floor() as u32;
        if completed <= self.last_split_index {
            return &self.splits[before..];
        }

        let crossed = (completed - self.last_split_index) as u64;
        let since_last = duration_secs.saturating_sub(self.last_split_elapsed_secs);
        let mut previous_elapsed = self.last_split_elapsed_secs;

        for step in 1..=crossed {
            let elapsed_secs = self.last_split_elapsed_secs + since_last * step / crossed;
            let split_secs = elapsed_secs - previous_elapsed;
            let pace = pace_secs_per_unit(split_secs, self.unit.meters(), self.unit)
                .unwrap_or(split_secs as f64);

            self.splits.push(Split {
                index: self.last_split_index + step as u32,
                unit: self.unit,
                elapsed_secs,
                split_secs,
                pace_secs_per_unit: pace,
                paused_ms,
            });
            previous_elapsed = elapsed_secs;
        }

        self.last_split_index = completed;
        self.last_split_elapsed_secs = previous_elapsed;
        &self.splits[before..]
    }

    pub fn splits(&self) -> &[Split] {
        &self.splits
    }

    pub fn reset(&mut self) {
        self.enabled = false;
        self.last_split_index = 0;
        self.last_split_elapsed_secs = 0;
        self.splits.clear();
    }

    /// Re-seed from checkpointed splits.
    pub fn restore_splits(&mut self, splits: Vec<Split>) {
        self.last_split_index = splits.last().map(|s| s.index).unwrap_or(0);
        self.last_split_elapsed_secs = splits.last().map(|s| s.elapsed_secs).unwrap_or(0);
        self.splits = splits;
    }
}
