// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session lifecycle tests: start/pause/resume/stop, auto-stop and the
//! background fix pump, driven through the public tracker API.

use run_tracker::config::{ConfigError, Platform, TrackerConfig};
use run_tracker::error::TrackerError;
use run_tracker::models::{ActivityKind, TrackingState};
use run_tracker::services::{LocationAccuracy, SessionTracker};
use run_tracker::storage::{keys, MemoryStore};
use run_tracker::RecoveryOutcome;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

mod common;
use common::{north_of, settle, Harness, MockLocationProvider, BASE_LAT};

#[tokio::test]
async fn test_end_to_end_run() {
    let h = Harness::new();
    assert!(h.tracker.start(ActivityKind::Running, None));
    settle().await;
    assert_eq!(h.location.starts(), 1);

    // 5 fixes, 1 s apart, 300 m legs, climbing 2 m per fix
    for i in 0..5 {
        h.clock.advance_secs(1);
        let fix = h
            .fix(north_of(BASE_LAT, 300.0 * i as f64))
            .with_altitude(100.0 + 2.0 * i as f64);
        h.tracker.append_fixes(vec![fix]);
    }

    let run = h.tracker.stop().await.expect("session should stop");
    assert!((run.distance_m - 1200.0).abs() < 1e-6, "got {}", run.distance_m);
    assert_eq!(run.splits.len(), 1);
    assert_eq!(run.splits[0].index, 1);
    assert_eq!(run.elevation_gain_m, 0.0, "2 m steps are below the gain threshold");
    assert_eq!(run.duration_secs, 5);
    assert_eq!(run.route.len(), 5);
    assert_eq!(run.activity, ActivityKind::Running);

    assert!(!h.tracker.is_currently_tracking());
    assert_eq!(h.location.stops(), 1);
}

#[tokio::test]
async fn test_invalid_transitions_are_no_ops() {
    let h = Harness::new();

    assert!(!h.tracker.pause());
    assert!(!h.tracker.resume());
    assert!(h.tracker.stop().await.is_none());

    assert!(h.tracker.start(ActivityKind::Walking, None));
    let session_id = h.tracker.current_snapshot().session_id;
    assert!(!h.tracker.start(ActivityKind::Running, None));
    assert_eq!(h.tracker.current_snapshot().session_id, session_id);
    assert_eq!(h.tracker.current_snapshot().activity, Some(ActivityKind::Walking));

    assert!(!h.tracker.resume());
    assert!(h.tracker.pause());
    assert!(!h.tracker.pause());
    assert_eq!(h.tracker.state(), TrackingState::Paused);
}

#[tokio::test]
async fn test_pause_freezes_duration() {
    let h = Harness::new();
    h.tracker.start(ActivityKind::Running, None);

    h.clock.advance_secs(100);
    assert_eq!(h.tracker.duration_secs(), 100);

    h.tracker.pause();
    h.clock.advance_secs(45);
    assert_eq!(h.tracker.duration_secs(), 100);
    assert!(h.tracker.is_currently_tracking());

    h.tracker.resume();
    h.clock.advance_secs(20);
    assert_eq!(h.tracker.duration_secs(), 120);

    let run = h.tracker.stop().await.unwrap();
    assert_eq!(run.duration_secs, 120);
    assert_eq!(run.paused_ms, 45_000);
    assert_eq!(run.pause_count, 1);
}

#[tokio::test]
async fn test_movement_while_paused_is_not_counted() {
    let h = Harness::new();
    h.tracker.start(ActivityKind::Running, None);

    h.step(BASE_LAT);
    h.step(north_of(BASE_LAT, 100.0));

    h.tracker.pause();
    h.step(north_of(BASE_LAT, 600.0));
    assert!((h.tracker.current_snapshot().distance_m - 100.0).abs() < 1e-6);

    h.tracker.resume();
    h.step(north_of(BASE_LAT, 700.0));
    let snapshot = h.tracker.current_snapshot();
    assert!((snapshot.distance_m - 200.0).abs() < 1e-6, "got {}", snapshot.distance_m);
    assert_eq!(snapshot.route_points, 4);
}

#[tokio::test]
async fn test_fixes_while_idle_are_dropped() {
    let h = Harness::new();
    h.tracker.append_fixes(vec![h.fix(BASE_LAT), h.fix(north_of(BASE_LAT, 50.0))]);

    let snapshot = h.tracker.current_snapshot();
    assert_eq!(snapshot.state, TrackingState::Idle);
    assert_eq!(snapshot.route_points, 0);
    assert_eq!(snapshot.distance_m, 0.0);
}

#[tokio::test]
async fn test_auto_stop_fires_once() {
    let h = Harness::new();
    let fired = Arc::new(AtomicUsize::new(0));
    let counter = fired.clone();
    h.tracker.on_auto_stop(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    h.tracker.start(ActivityKind::Running, Some(500.0));
    h.step(BASE_LAT);
    h.step(north_of(BASE_LAT, 300.0));
    assert!(!h.tracker.check_auto_stop());
    assert_eq!(fired.load(Ordering::SeqCst), 0);

    h.step(north_of(BASE_LAT, 600.0));
    assert_eq!(fired.load(Ordering::SeqCst), 1);

    h.step(north_of(BASE_LAT, 900.0));
    assert!(h.tracker.check_auto_stop());
    assert_eq!(fired.load(Ordering::SeqCst), 1);

    // Reaching the target never stops the session by itself
    let snapshot = h.tracker.current_snapshot();
    assert!(h.tracker.is_currently_tracking());
    assert_eq!(snapshot.target_distance_m, Some(500.0));
    assert_eq!(snapshot.target_progress, Some(1.0));
}

#[tokio::test]
async fn test_invalid_target_is_ignored() {
    let h = Harness::new();
    assert!(h.tracker.start(ActivityKind::Running, Some(-5.0)));
    assert_eq!(h.tracker.current_snapshot().target_distance_m, None);
    assert!(!h.tracker.check_auto_stop());
}

#[tokio::test]
async fn test_fix_sender_applies_batches_in_order() {
    let h = Harness::new();
    let sender = h.tracker.fix_sender();
    h.tracker.start(ActivityKind::Running, None);

    assert!(sender.send(vec![h.fix(BASE_LAT), h.fix(north_of(BASE_LAT, 10.0))]));
    assert!(sender.send(vec![]));
    assert!(sender.send(vec![h.fix(north_of(BASE_LAT, 25.0))]));
    settle().await;

    let snapshot = h.tracker.current_snapshot();
    assert_eq!(snapshot.route_points, 3);
    assert!((snapshot.distance_m - 25.0).abs() < 1e-6);
}

#[tokio::test]
async fn test_walks_record_no_splits() {
    let h = Harness::new();
    h.tracker.start(ActivityKind::Walking, None);
    h.step(BASE_LAT);
    h.step(north_of(BASE_LAT, 1500.0));

    let run = h.tracker.stop().await.unwrap();
    assert!(run.splits.is_empty());
    assert!(run.distance_m > 1000.0);
}

#[tokio::test]
async fn test_location_request_matches_activity() {
    let h = Harness::new();
    h.tracker.start(ActivityKind::Cycling, None);
    settle().await;

    let request = h.location.last_request().expect("stream should be requested");
    assert_eq!(request.accuracy, LocationAccuracy::BestForNavigation);
    assert_eq!(request.notification.title, "Tracking your ride");
}

#[tokio::test]
async fn test_stream_start_failure_keeps_timing() {
    let h = Harness::new();
    h.location.set_fail_start(true);

    assert!(h.tracker.start(ActivityKind::Running, None));
    settle().await;
    assert_eq!(h.location.starts(), 1);

    h.clock.advance_secs(30);
    assert!(h.tracker.is_currently_tracking());
    assert_eq!(h.tracker.duration_secs(), 30);
}

#[tokio::test]
async fn test_keep_alive_on_android_only() {
    let android = Harness::with_config(TrackerConfig::test_default());
    android.tracker.start(ActivityKind::Running, None);
    settle().await;
    // The exemption request fails in the fake; tracking carries on
    assert_eq!(android.keep_alive.exemptions.load(Ordering::SeqCst), 1);
    assert_eq!(android.keep_alive.acquired.load(Ordering::SeqCst), 1);
    assert!(android.tracker.is_currently_tracking());
    android.tracker.stop().await;
    assert_eq!(android.keep_alive.released.load(Ordering::SeqCst), 1);

    let ios = Harness::with_config(TrackerConfig {
        platform: Platform::Ios,
        ..TrackerConfig::test_default()
    });
    ios.tracker.start(ActivityKind::Running, None);
    settle().await;
    ios.tracker.stop().await;
    assert_eq!(ios.keep_alive.acquired.load(Ordering::SeqCst), 0);
    assert_eq!(ios.keep_alive.released.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_tracker_is_reusable_after_stop() {
    let h = Harness::new();
    h.tracker.start(ActivityKind::Running, None);
    h.step(BASE_LAT);
    h.step(north_of(BASE_LAT, 1100.0));
    let first = h.tracker.stop().await.unwrap();

    h.tracker.start(ActivityKind::Running, None);
    let snapshot = h.tracker.current_snapshot();
    assert_ne!(snapshot.session_id, Some(first.session_id.to_string()));
    assert_eq!(snapshot.distance_m, 0.0);
    assert!(snapshot.splits.is_empty());
    assert_eq!(snapshot.duration_secs, 0);
}

#[tokio::test]
async fn test_build_rejects_invalid_config() {
    let cases = [
        (
            TrackerConfig {
                route_cache_size: 0,
                ..TrackerConfig::test_default()
            },
            "TRACKER_ROUTE_CACHE_SIZE",
        ),
        (
            TrackerConfig {
                watchdog_interval_secs: 0,
                ..TrackerConfig::test_default()
            },
            "TRACKER_WATCHDOG_INTERVAL_SECS",
        ),
        (
            TrackerConfig {
                checkpoint_interval_secs: 0,
                ..TrackerConfig::test_default()
            },
            "TRACKER_CHECKPOINT_INTERVAL_SECS",
        ),
    ];

    for (config, expected) in cases {
        let result = SessionTracker::builder(
            config,
            Arc::new(MockLocationProvider::default()),
            Arc::new(MemoryStore::new()),
        )
        .build();
        let Err(err) = result else {
            panic!("{expected}=0 should be rejected");
        };
        match err {
            TrackerError::Config(ConfigError::Invalid { name, .. }) => assert_eq!(name, expected),
            other => panic!("unexpected error: {other}"),
        }
    }
}

#[tokio::test]
async fn test_start_waits_for_previous_stop_to_finish() {
    let h = Harness::new();
    h.tracker.start(ActivityKind::Running, None);
    settle().await;

    let gate = h.location.hold_stops().await;
    let stopping = h.tracker.clone();
    let stopper = tokio::spawn(async move { stopping.stop().await });
    settle().await;

    // Teardown is blocked inside the location stop
    assert!(!h.tracker.is_currently_tracking());
    assert!(!h.tracker.start(ActivityKind::Running, None));
    assert_eq!(
        h.tracker.restore_session().await,
        RecoveryOutcome::AlreadyActive
    );

    drop(gate);
    assert!(stopper.await.unwrap().is_some());

    assert!(h.tracker.start(ActivityKind::Running, None));
    settle().await;
    h.tracker.flush_writes().await;
    assert!(h.store.peek(keys::SESSION_STATE).is_some());
    assert_eq!(h.location.starts(), 2);
    assert_eq!(h.location.stops(), 1);
    assert!(h.tracker.is_currently_tracking());
}
