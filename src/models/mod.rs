// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the tracker.

pub mod activity;
pub mod checkpoint;
pub mod location;
pub mod session;
pub mod split;

pub use activity::{ActivityKind, TrackingState};
pub use checkpoint::{Checkpoint, RecoveryDecision, RecoveryPolicy};
pub use location::LocationFix;
pub use session::{GpsHealth, GpsStatus, RunSession, SessionState, TrackerSnapshot};
pub use split::{Split, SplitUnit};
