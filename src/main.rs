// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Run-Tracker replay tool
//!
//! Feeds a recorded fix log through the session tracker and prints the
//! finished session as JSON. Useful for checking distance, elevation and
//! split behavior against real recordings.
//!
//! Usage: `run-tracker-replay <fixes.json> [activity] [target_distance_m]`

use anyhow::Context;
use run_tracker::{
    config::TrackerConfig,
    error::Result as TrackerResult,
    models::{ActivityKind, LocationFix},
    services::{LocationProvider, LocationRequest},
    storage::JsonFileStore,
    time_utils::{Clock, ManualClock},
    RecoveryOutcome, SessionTracker,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Location provider for recorded data: fixes are pushed by the replay loop.
struct ReplayProvider;

#[async_trait::async_trait]
impl LocationProvider for ReplayProvider {
    async fn start(&self, request: &LocationRequest) -> TrackerResult<()> {
        tracing::debug!(
            accuracy = ?request.accuracy,
            min_interval_ms = request.min_interval_ms,
            "Replay stream started"
        );
        Ok(())
    }

    async fn stop(&self) -> TrackerResult<()> {
        tracing::debug!("Replay stream stopped");
        Ok(())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();

    let mut args = std::env::args().skip(1);
    let path = args
        .next()
        .context("usage: run-tracker-replay <fixes.json> [activity] [target_distance_m]")?;
    let activity: ActivityKind = match args.next() {
        Some(arg) => arg.parse().map_err(anyhow::Error::msg)?,
        None => ActivityKind::Running,
    };
    let target_distance_m = args
        .next()
        .map(|arg| arg.parse::<f64>())
        .transpose()
        .context("target distance must be a number of meters")?;

    let config = TrackerConfig::from_env()?;
    tracing::info!(
        platform = ?config.platform,
        storage_dir = %config.storage_dir,
        "Starting Run-Tracker replay"
    );

    let raw = tokio::fs::read_to_string(&path)
        .await
        .with_context(|| format!("failed to read {path}"))?;
    let mut fixes: Vec<LocationFix> =
        serde_json::from_str(&raw).with_context(|| format!("failed to parse {path}"))?;
    fixes.sort_by_key(|fix| fix.timestamp);
    let Some(first) = fixes.first() else {
        anyhow::bail!("{path} contains no fixes");
    };
    tracing::info!(count = fixes.len(), path = %path, "Loaded fix log");

    let clock = Arc::new(ManualClock::new(first.timestamp));
    let store = Arc::new(JsonFileStore::open(&config.storage_dir)?);
    let tracker = SessionTracker::builder(config, Arc::new(ReplayProvider), store)
        .clock(clock.clone())
        .build()?;

    match tracker.restore_session().await {
        RecoveryOutcome::Restored { session_id, .. } => {
            tracing::info!(%session_id, "Found an interrupted session; discarding it for replay");
            tracker.discard_recovered_session().await;
        }
        RecoveryOutcome::Declined(decision) => {
            tracing::info!(?decision, "Discarded an unrecoverable checkpoint");
        }
        RecoveryOutcome::NothingToRestore | RecoveryOutcome::AlreadyActive => {}
    }

    tracker.on_auto_stop(|| tracing::info!("Target distance reached during replay"));
    tracker.start(activity, target_distance_m);

    let checkpoint_every = tracker.config().checkpoint_interval_secs as i64;
    let mut last_checkpoint = first.timestamp;
    for fix in fixes {
        let at = fix.timestamp;
        clock.set(at);
        tracker.append_fixes(vec![fix]);

        if (at - last_checkpoint).num_seconds() >= checkpoint_every {
            tracker.save_checkpoint();
            last_checkpoint = at;
        }
    }
    tracker.flush_writes().await;

    let Some(run) = tracker.stop().await else {
        anyhow::bail!("no session to stop");
    };

    tracing::info!(
        ended_at = %run_tracker::time_utils::format_utc_rfc3339(clock.now()),
        "Replay finished"
    );
    println!("{}", serde_json::to_string_pretty(&run)?);
    match run.encoded_polyline() {
        Ok(polyline) => println!("{polyline}"),
        Err(e) => tracing::warn!(error = %e, "Could not encode route polyline"),
    }
    Ok(())
}

/// Initialize structured JSON logging on stderr, leaving stdout for output.
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("run_tracker=debug,info")),
        )
        .with(format)
        .init();
}
