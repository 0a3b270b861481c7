// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Incremental distance and elevation-gain accumulation.
//!
//! Each fix is folded into running totals in O(1). History is never
//! recomputed; only the most recent fixes are retained for route display.

use crate::config::TrackerConfig;
use crate::models::LocationFix;
use geo::{LineString, Point};
use std::collections::VecDeque;

/// Mean Earth radius used for Haversine distance (meters).
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Great-circle distance between two points in meters (x = lon, y = lat).
pub fn haversine_distance(from: Point<f64>, to: Point<f64>) -> f64 {
    let lat1 = from.y().to_radians();
    let lat2 = to.y().to_radians();
    let d_lat = (to.y() - from.y()).to_radians();
    let d_lon = (to.x() - from.x()).to_radians();

    let a = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_M * c
}

/// Filtering thresholds for the accumulator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AccumulatorSettings {
    pub min_movement_m: f64,
    pub elevation_gain_threshold_m: f64,
    pub max_accuracy_m: Option<f64>,
    pub route_cache_size: usize,
    pub recovery_skip_fixes: u32,
}

impl AccumulatorSettings {
    pub fn from_config(config: &TrackerConfig) -> Self {
        Self {
            min_movement_m: config.min_movement_m,
            elevation_gain_threshold_m: config.elevation_gain_threshold_m,
            max_accuracy_m: config.max_accuracy_m,
            route_cache_size: config.route_cache_size,
            recovery_skip_fixes: config.recovery_skip_fixes,
        }
    }
}

impl Default for AccumulatorSettings {
    fn default() -> Self {
        Self::from_config(&TrackerConfig::default())
    }
}

/// What happened to a fix handed to the accumulator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FixOutcome {
    /// First usable fix; becomes the distance anchor
    Anchored,
    /// Distance added (meters)
    Moved(f64),
    /// Below the minimum-movement threshold
    Jitter,
    /// Reported accuracy too poor to trust
    LowAccuracy,
    /// Held out of distance right after signal reacquisition
    RecoverySkipped,
    /// Received while paused; anchor moved, no distance added
    Paused,
}

#[derive(Debug, Clone)]
pub struct DistanceAccumulator {
    settings: AccumulatorSettings,
    total_distance_m: f64,
    elevation_gain_m: f64,
    anchor: Option<Point<f64>>,
    last_altitude: Option<f64>,
    route: VecDeque<LocationFix>,
    recovery_skip_remaining: u32,
}

impl DistanceAccumulator {
    pub fn new(settings: AccumulatorSettings) -> Self {
        Self {
            settings,
            total_distance_m: 0.0,
            elevation_gain_m: 0.0,
            anchor: None,
            last_altitude: None,
            route: VecDeque::with_capacity(settings.route_cache_size),
            recovery_skip_remaining: 0,
        }
    }

    /// Fold one fix into the running totals.
    pub fn add_fix(&mut self, fix: LocationFix) -> FixOutcome {
        let point = fix.to_point();
        let altitude = fix.usable_altitude();
        let low_accuracy = match (fix.accuracy, self.settings.max_accuracy_m) {
            (Some(accuracy), Some(max)) => !(accuracy <= max),
            _ => false,
        };
        self.cache(fix);

        if low_accuracy {
            return FixOutcome::LowAccuracy;
        }

        if self.recovery_skip_remaining > 0 {
            self.recovery_skip_remaining -= 1;
            self.anchor = Some(point);
            if altitude.is_some() {
                self.last_altitude = altitude;
            }
            return FixOutcome::RecoverySkipped;
        }

        self.accumulate_elevation(altitude);

        let Some(anchor) = self.anchor else {
            self.anchor = Some(point);
            return FixOutcome::Anchored;
        };

        let increment = haversine_distance(anchor, point);
        if increment < self.settings.min_movement_m {
            // Keep the old anchor so slow movement still adds up
            return FixOutcome::Jitter;
        }

        self.total_distance_m += increment;
        self.anchor = Some(point);
        FixOutcome::Moved(increment)
    }

    /// Record a fix received while paused.
    ///
    /// The anchor and altitude baseline follow the user so that movement during
    /// the pause is not counted as one long leg on resume.
    pub fn observe_paused(&mut self, fix: LocationFix) -> FixOutcome {
        self.anchor = Some(fix.to_point());
        if let Some(altitude) = fix.usable_altitude() {
            self.last_altitude = Some(altitude);
        }
        self.cache(fix);
        FixOutcome::Paused
    }

    /// Hold the next few fixes out of distance after a GPS silence.
    pub fn enter_recovery_mode(&mut self) {
        self.recovery_skip_remaining = self.settings.recovery_skip_fixes;
    }

    pub fn in_recovery_mode(&self) -> bool {
        self.recovery_skip_remaining > 0
    }

    /// Re-seed totals from a checkpoint. The next fix becomes a fresh anchor.
    pub fn restore_totals(&mut self, distance_m: f64, elevation_gain_m: f64) {
        self.total_distance_m = distance_m.max(0.0);
        self.elevation_gain_m = elevation_gain_m.max(0.0);
        self.anchor = None;
        self.last_altitude = None;
    }

    pub fn reset(&mut self) {
        *self = Self::new(self.settings);
    }

    pub fn total_distance_m(&self) -> f64 {
        self.total_distance_m
    }

    pub fn elevation_gain_m(&self) -> f64 {
        self.elevation_gain_m
    }

    /// Cached fixes, oldest first.
    pub fn route(&self) -> impl Iterator<Item = &LocationFix> {
        self.route.iter()
    }

    pub fn route_len(&self) -> usize {
        self.route.len()
    }

    /// Cached fixes as a line for route previews.
    pub fn route_line(&self) -> LineString<f64> {
        self.route
            .iter()
            .map(|fix| (fix.longitude, fix.latitude))
            .collect::<Vec<_>>()
            .into()
    }

    fn accumulate_elevation(&mut self, altitude: Option<f64>) {
        let Some(altitude) = altitude else {
            return;
        };
        if let Some(last) = self.last_altitude {
            let delta = altitude - last;
            // Descents and small climbs are ignored: this is "total climbed"
            if delta > self.settings.elevation_gain_threshold_m {
                self.elevation_gain_m += delta;
            }
        }
        self.last_altitude = Some(altitude);
    }

    fn cache(&mut self, fix: LocationFix) {
        if self.settings.route_cache_size == 0 {
            return;
        }
        while self.route.len() >= self.settings.route_cache_size {
            self.route.pop_front();
        }
        self.route.push_back(fix);
    }
}

impl Default for DistanceAccumulator {
    fn default() -> Self {
        Self::new(AccumulatorSettings::default())
    }
}
