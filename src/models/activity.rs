// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Activity kinds and tracker lifecycle states.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Kind of workout being tracked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub enum ActivityKind {
    Running,
    Walking,
    Cycling,
}

impl ActivityKind {
    /// Only runs record distance splits.
    pub fn records_splits(self) -> bool {
        matches!(self, ActivityKind::Running)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ActivityKind::Running => "running",
            ActivityKind::Walking => "walking",
            ActivityKind::Cycling => "cycling",
        }
    }
}

impl fmt::Display for ActivityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActivityKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "running" | "run" => Ok(ActivityKind::Running),
            "walking" | "walk" => Ok(ActivityKind::Walking),
            "cycling" | "ride" | "bike" => Ok(ActivityKind::Cycling),
            other => Err(format!("Unknown activity kind: {}", other)),
        }
    }
}

/// Lifecycle state of the session tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub enum TrackingState {
    #[default]
    Idle,
    Tracking,
    Paused,
}

impl TrackingState {
    /// True while a session exists, paused or not.
    pub fn is_active(self) -> bool {
        !matches!(self, TrackingState::Idle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_running_records_splits() {
        assert!(ActivityKind::Running.records_splits());
        assert!(!ActivityKind::Walking.records_splits());
        assert!(!ActivityKind::Cycling.records_splits());
    }

    #[test]
    fn test_activity_kind_serde_lowercase() {
        let json = serde_json::to_string(&ActivityKind::Cycling).unwrap();
        assert_eq!(json, "\"cycling\"");
        let parsed: ActivityKind = serde_json::from_str("\"walking\"").unwrap();
        assert_eq!(parsed, ActivityKind::Walking);
    }

    #[test]
    fn test_activity_kind_from_str_aliases() {
        assert_eq!("Run".parse::<ActivityKind>().unwrap(), ActivityKind::Running);
        assert_eq!("bike".parse::<ActivityKind>().unwrap(), ActivityKind::Cycling);
        assert!("swimming".parse::<ActivityKind>().is_err());
    }
}
