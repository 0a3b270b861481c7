// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - tracking logic layer.

pub mod distance;
pub mod duration;
pub mod location;
pub mod splits;
pub mod tracker;
pub mod watchdog;

pub use distance::{haversine_distance, AccumulatorSettings, DistanceAccumulator, FixOutcome};
pub use duration::{DurationClock, DurationClockState};
pub use location::{FixSender, LocationAccuracy, LocationProvider, LocationRequest};
pub use splits::SplitTracker;
pub use tracker::{RecoveryOutcome, SessionTracker, TrackerBuilder};
pub use watchdog::{GpsWatchdog, KeepAlive, NoopKeepAlive, WatchdogAction, WatchdogSettings};
