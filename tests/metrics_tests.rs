// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Distance, elevation and split behavior observed through the tracker.

use geo::Point;
use run_tracker::models::{ActivityKind, LocationFix};
use run_tracker::services::haversine_distance;
use run_tracker::time_utils::Clock;

mod common;
use common::{north_of, Harness, BASE_LAT, BASE_LON};

#[tokio::test]
async fn test_haversine_two_fixes() {
    let h = Harness::new();
    h.tracker.start(ActivityKind::Running, None);

    h.clock.advance_secs(1);
    h.tracker
        .append_fixes(vec![LocationFix::new(0.0, 0.0, h.clock.now())]);
    h.clock.advance_secs(1);
    h.tracker
        .append_fixes(vec![LocationFix::new(0.01, 0.0, h.clock.now())]);

    let expected = haversine_distance(Point::new(0.0, 0.0), Point::new(0.0, 0.01));
    let distance = h.tracker.current_snapshot().distance_m;
    assert!((distance - expected).abs() < 1e-9);
    assert!((distance - 1111.95).abs() < 0.01, "got {}", distance);
}

#[tokio::test]
async fn test_jitter_rejected_but_slow_drift_counts() {
    let h = Harness::new();
    h.tracker.start(ActivityKind::Walking, None);

    h.step(BASE_LAT);
    h.step(north_of(BASE_LAT, 0.3));
    assert_eq!(h.tracker.current_snapshot().distance_m, 0.0);

    // Measured from the original anchor, this one clears the threshold
    h.step(north_of(BASE_LAT, 0.6));
    let distance = h.tracker.current_snapshot().distance_m;
    assert!((distance - 0.6).abs() < 1e-6, "got {}", distance);
}

#[tokio::test]
async fn test_elevation_filter() {
    let h = Harness::new();
    h.tracker.start(ActivityKind::Running, None);

    for altitude in [100.0, 101.0, 106.0, 96.0] {
        h.clock.advance_secs(1);
        h.tracker
            .append_fixes(vec![h.fix(BASE_LAT).with_altitude(altitude)]);
    }

    assert_eq!(h.tracker.current_snapshot().elevation_gain_m, 5.0);
}

#[tokio::test]
async fn test_low_accuracy_fixes_do_not_move_distance() {
    let h = Harness::new();
    h.tracker.start(ActivityKind::Running, None);

    h.step(BASE_LAT);
    h.clock.advance_secs(1);
    h.tracker.append_fixes(vec![h
        .fix(north_of(BASE_LAT, 400.0))
        .with_accuracy(120.0)]);
    assert_eq!(h.tracker.current_snapshot().distance_m, 0.0);

    h.step(north_of(BASE_LAT, 20.0));
    let snapshot = h.tracker.current_snapshot();
    assert!((snapshot.distance_m - 20.0).abs() < 1e-6);
    assert_eq!(snapshot.route_points, 3);
}

#[tokio::test]
async fn test_invalid_coordinates_are_dropped() {
    let h = Harness::new();
    h.tracker.start(ActivityKind::Running, None);

    h.step(BASE_LAT);
    h.clock.advance_secs(1);
    h.tracker.append_fixes(vec![
        LocationFix::new(f64::NAN, BASE_LON, h.clock.now()),
        LocationFix::new(95.0, BASE_LON, h.clock.now()),
        h.fix(north_of(BASE_LAT, 50.0)),
    ]);

    let snapshot = h.tracker.current_snapshot();
    assert_eq!(snapshot.route_points, 2);
    assert!((snapshot.distance_m - 50.0).abs() < 1e-6);
}

#[tokio::test]
async fn test_split_boundaries() {
    let h = Harness::new();
    h.tracker.start(ActivityKind::Running, None);
    h.step(BASE_LAT);

    h.clock.advance_secs(300);
    h.tracker
        .append_fixes(vec![h.fix(north_of(BASE_LAT, 1000.5))]);
    h.clock.advance_secs(310);
    h.tracker
        .append_fixes(vec![h.fix(north_of(BASE_LAT, 2000.5))]);
    h.clock.advance_secs(150);
    h.tracker
        .append_fixes(vec![h.fix(north_of(BASE_LAT, 2500.0))]);

    let splits = h.tracker.current_snapshot().splits;
    assert_eq!(splits.len(), 2, "third kilometer is still in progress");
    assert_eq!(splits[0].index, 1);
    assert_eq!(splits[0].elapsed_secs, 301);
    assert_eq!(splits[1].index, 2);
    assert_eq!(splits[1].split_secs, 310);
}

#[tokio::test]
async fn test_sparse_fix_jump_records_every_split() {
    let h = Harness::new();
    h.tracker.start(ActivityKind::Running, None);
    h.step(BASE_LAT);

    h.clock.advance_secs(899);
    h.tracker
        .append_fixes(vec![h.fix(north_of(BASE_LAT, 3500.0))]);

    let splits = h.tracker.current_snapshot().splits;
    let indices: Vec<u32> = splits.iter().map(|s| s.index).collect();
    assert_eq!(indices, vec![1, 2, 3]);
    assert_eq!(splits.iter().map(|s| s.split_secs).sum::<u64>(), 900);
}

#[tokio::test]
async fn test_snapshot_average_pace() {
    let h = Harness::new();
    h.tracker.start(ActivityKind::Running, None);
    h.step(BASE_LAT);
    h.clock.advance_secs(299);
    h.tracker
        .append_fixes(vec![h.fix(north_of(BASE_LAT, 1000.0))]);

    let pace = h
        .tracker
        .current_snapshot()
        .average_pace_secs_per_unit
        .expect("pace once distance is recorded");
    assert!((pace - 300.0).abs() < 1e-3, "got {}", pace);
}
