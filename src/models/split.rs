// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Distance splits recorded during a run.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

const METERS_PER_MILE: f64 = 1609.344;

/// Distance unit a split covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub enum SplitUnit {
    #[default]
    Kilometers,
    Miles,
}

impl SplitUnit {
    /// Length of one unit in meters.
    pub fn meters(self) -> f64 {
        match self {
            SplitUnit::Kilometers => 1000.0,
            SplitUnit::Miles => METERS_PER_MILE,
        }
    }
}

impl FromStr for SplitUnit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "km" | "kilometer" | "kilometers" => Ok(SplitUnit::Kilometers),
            "mi" | "mile" | "miles" => Ok(SplitUnit::Miles),
            other => Err(format!("Unknown split unit: {}", other)),
        }
    }
}

/// A completed distance-unit interval. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct Split {
    /// 1-based split number
    pub index: u32,
    pub unit: SplitUnit,
    /// Active time at split completion (seconds)
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub elapsed_secs: u64,
    /// Time spent on this split alone (seconds)
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub split_secs: u64,
    /// Seconds per unit for this split
    pub pace_secs_per_unit: f64,
    /// Total paused time when the split completed (milliseconds)
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub paused_ms: i64,
}

/// Pace in seconds per unit for a duration over a distance.
///
/// Returns `None` when no distance has been covered.
pub fn pace_secs_per_unit(duration_secs: u64, distance_m: f64, unit: SplitUnit) -> Option<f64> {
    if distance_m <= 0.0 {
        return None;
    }
    Some(duration_secs as f64 / (distance_m / unit.meters()))
}
