// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Active-time clock computed purely from timestamps.
//!
//! There is no ticking timer: duration is derived from the start timestamp,
//! the accumulated paused time and the current pause start. This keeps it
//! correct across backgrounding, process suspension and UI thread starvation.

use crate::time_utils::millis_between;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The three timestamps a duration is recomputed from.
///
/// This is what gets persisted; the duration itself never is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DurationClockState {
    pub start: Option<DateTime<Utc>>,
    pub cumulative_paused_ms: i64,
    pub pause_start: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default)]
pub struct DurationClock {
    state: DurationClockState,
}

impl DurationClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start timing at `start_time`, clearing any paused time.
    pub fn start(&mut self, start_time: DateTime<Utc>) {
        self.state = DurationClockState {
            start: Some(start_time),
            cumulative_paused_ms: 0,
            pause_start: None,
        };
    }

    /// Begin a pause. Returns `false` (no-op) if already paused or not started.
    pub fn pause(&mut self, now: DateTime<Utc>) -> bool {
        if self.state.start.is_none() || self.state.pause_start.is_some() {
            return false;
        }
        self.state.pause_start = Some(now);
        true
    }

    /// End a pause. Returns `false` (no-op) if not paused.
    pub fn resume(&mut self, now: DateTime<Utc>) -> bool {
        match self.state.pause_start.take() {
            Some(pause_start) => {
                self.state.cumulative_paused_ms += millis_between(pause_start, now);
                true
            }
            None => false,
        }
    }

    pub fn is_paused(&self) -> bool {
        self.state.pause_start.is_some()
    }

    pub fn start_time(&self) -> Option<DateTime<Utc>> {
        self.state.start
    }

    /// Active (non-paused) seconds, floored. Frozen while paused.
    pub fn duration_secs(&self, now: DateTime<Utc>) -> u64 {
        let Some(start) = self.state.start else {
            return 0;
        };
        let end = self.state.pause_start.unwrap_or(now);
        let active_ms = millis_between(start, end) - self.state.cumulative_paused_ms;
        (active_ms.max(0) / 1000) as u64
    }

    /// Total paused milliseconds, including a pause still in progress.
    pub fn paused_ms(&self, now: DateTime<Utc>) -> i64 {
        let ongoing = self
            .state
            .pause_start
            .map(|pause_start| millis_between(pause_start, now))
            .unwrap_or(0);
        self.state.cumulative_paused_ms + ongoing
    }

    pub fn export_state(&self) -> DurationClockState {
        self.state
    }

    pub fn restore_state(&mut self, state: DurationClockState) {
        self.state = state;
    }

    pub fn reset(&mut self) {
        self.state = DurationClockState::default();
    }
}
