// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Boundary to the platform background-location service.
//!
//! The platform calls back from its own execution context. Those callbacks
//! must not touch tracker state directly: they push batches through a
//! `FixSender`, and a single pump task feeds them to the tracker in order.

use crate::error::Result;
use crate::models::{ActivityKind, LocationFix};
use tokio::sync::mpsc;

/// Requested accuracy level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocationAccuracy {
    BestForNavigation,
    High,
    Balanced,
}

/// Persistent notification shown while tracking in the background.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForegroundNotification {
    pub title: String,
    pub body: String,
}

/// Parameters for continuous background location updates.
#[derive(Debug, Clone, PartialEq)]
pub struct LocationRequest {
    pub accuracy: LocationAccuracy,
    /// Minimum time between fixes (milliseconds)
    pub min_interval_ms: u64,
    /// Minimum movement between fixes (meters)
    pub min_distance_m: f64,
    pub notification: ForegroundNotification,
}

impl LocationRequest {
    /// Request tuned for an activity.
    pub fn for_activity(activity: ActivityKind) -> Self {
        let (accuracy, min_interval_ms, min_distance_m) = match activity {
            ActivityKind::Running => (LocationAccuracy::BestForNavigation, 1000, 5.0),
            ActivityKind::Walking => (LocationAccuracy::High, 2000, 3.0),
            ActivityKind::Cycling => (LocationAccuracy::BestForNavigation, 1000, 10.0),
        };

        Self {
            accuracy,
            min_interval_ms,
            min_distance_m,
            notification: ForegroundNotification {
                title: format!("Tracking your {}", activity_noun(activity)),
                body: "Location is being recorded in the background.".to_string(),
            },
        }
    }
}

fn activity_noun(activity: ActivityKind) -> &'static str {
    match activity {
        ActivityKind::Running => "run",
        ActivityKind::Walking => "walk",
        ActivityKind::Cycling => "ride",
    }
}

/// Platform primitive delivering background location updates.
///
/// Implementations deliver batches through the `FixSender` they were wired
/// with; `start`/`stop` only control the subscription.
#[async_trait::async_trait]
pub trait LocationProvider: Send + Sync {
    async fn start(&self, request: &LocationRequest) -> Result<()>;

    async fn stop(&self) -> Result<()>;
}

/// Handle the platform callback uses to deliver fix batches.
#[derive(Debug, Clone)]
pub struct FixSender {
    tx: mpsc::UnboundedSender<Vec<LocationFix>>,
}

impl FixSender {
    pub(crate) fn new(tx: mpsc::UnboundedSender<Vec<LocationFix>>) -> Self {
        Self { tx }
    }

    /// Enqueue a batch. Returns `false` if the tracker is gone.
    pub fn send(&self, batch: Vec<LocationFix>) -> bool {
        self.tx.send(batch).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_per_activity() {
        let run = LocationRequest::for_activity(ActivityKind::Running);
        assert_eq!(run.accuracy, LocationAccuracy::BestForNavigation);
        assert_eq!(run.min_interval_ms, 1000);
        assert_eq!(run.notification.title, "Tracking your run");

        let walk = LocationRequest::for_activity(ActivityKind::Walking);
        assert_eq!(walk.accuracy, LocationAccuracy::High);
        assert!(walk.min_distance_m < run.min_distance_m);
    }

    #[tokio::test]
    async fn test_fix_sender_reports_closed_channel() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let sender = FixSender::new(tx);
        assert!(sender.send(vec![]));
        assert_eq!(rx.recv().await, Some(vec![]));

        drop(rx);
        assert!(!sender.send(vec![]));
    }
}
