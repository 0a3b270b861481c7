// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Session state, live snapshots and finalized run records.

use crate::models::split::pace_secs_per_unit;
use crate::models::{ActivityKind, LocationFix, Split, SplitUnit, TrackingState};
use crate::services::duration::DurationClockState;
use chrono::{DateTime, Utc};
use geo::LineString;
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use uuid::Uuid;

/// Lightweight session metadata, persisted on every lifecycle transition.
///
/// Written on start/pause/resume so a crash while paused restores as paused
/// even if the last checkpoint predates the pause.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    pub session_id: Uuid,
    pub activity: ActivityKind,
    pub state: TrackingState,
    pub start_time: DateTime<Utc>,
    #[serde(default)]
    pub target_distance_m: Option<f64>,
    #[serde(default)]
    pub pause_count: u32,
    pub clock: DurationClockState,
    pub updated_at: DateTime<Utc>,
}

/// Health of the background location stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub enum GpsHealth {
    /// Fixes arriving within the timeout window
    #[default]
    Healthy,
    /// Timeout exceeded, restart about to be attempted
    Silent,
    /// Restart issued, waiting for the first fix
    Recovering,
    /// Restart ceiling exceeded; duration-only tracking
    Exhausted,
}

/// Advisory GPS status surfaced on every snapshot.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct GpsStatus {
    pub health: GpsHealth,
    /// Restarts issued since the last fix
    pub restart_attempts: u32,
    #[cfg_attr(feature = "binding-generation", ts(type = "number | null"))]
    pub seconds_since_last_fix: Option<u64>,
    /// User-facing message, set only when the user should be told
    pub advisory: Option<String>,
}

/// Live metrics for UI polling.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct TrackerSnapshot {
    pub state: TrackingState,
    pub session_id: Option<String>,
    pub activity: Option<ActivityKind>,
    pub distance_m: f64,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub duration_secs: u64,
    pub elevation_gain_m: f64,
    pub splits: Vec<Split>,
    pub pause_count: u32,
    /// Average pace over the whole session in seconds per split unit
    pub average_pace_secs_per_unit: Option<f64>,
    pub target_distance_m: Option<f64>,
    /// Fraction of the target distance covered, capped at 1.0
    pub target_progress: Option<f64>,
    pub gps: GpsStatus,
    /// Number of fixes held in the route cache
    pub route_points: u32,
}

/// Immutable record of a finished workout, handed to persistence/publishing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSession {
    pub session_id: Uuid,
    pub activity: ActivityKind,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub target_distance_m: Option<f64>,
    /// Final distance (meters)
    pub distance_m: f64,
    /// Final active duration (seconds)
    pub duration_secs: u64,
    pub elevation_gain_m: f64,
    pub splits: Vec<Split>,
    pub pause_count: u32,
    pub paused_ms: i64,
    /// Most recent fixes, for route display only
    pub route: Vec<LocationFix>,
}

impl RunSession {
    /// Average pace in seconds per kilometer.
    pub fn average_pace_secs_per_km(&self) -> Option<f64> {
        pace_secs_per_unit(self.duration_secs, self.distance_m, SplitUnit::Kilometers)
    }

    /// Cached route as a line (x = longitude, y = latitude).
    pub fn route_line(&self) -> LineString<f64> {
        self.route
            .iter()
            .map(|fix| (fix.longitude, fix.latitude))
            .collect::<Vec<_>>()
            .into()
    }

    /// Cached route as an encoded polyline (precision 5).
    pub fn encoded_polyline(&self) -> Result<String, String> {
        polyline::encode_coordinates(self.route_line(), 5).map_err(|e| e.to_string())
    }

    /// Cached route as a GeoJSON feature with summary properties.
    pub fn route_geojson(&self) -> geojson::Feature {
        let geometry = geojson::Geometry::new(geojson::Value::from(&self.route_line()));

        let mut properties = geojson::JsonObject::new();
        properties.insert(
            "session_id".to_string(),
            serde_json::Value::from(self.session_id.to_string()),
        );
        properties.insert(
            "activity".to_string(),
            serde_json::Value::from(self.activity.as_str()),
        );
        properties.insert(
            "distance_m".to_string(),
            serde_json::Value::from(self.distance_m),
        );
        properties.insert(
            "duration_secs".to_string(),
            serde_json::Value::from(self.duration_secs),
        );

        geojson::Feature {
            bbox: None,
            geometry: Some(geometry),
            id: None,
            properties: Some(properties),
            foreign_members: None,
        }
    }
}
