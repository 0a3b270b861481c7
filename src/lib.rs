// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Run-Tracker: GPS workout tracking core
//!
//! This crate owns the lifecycle of a single workout session: it folds
//! background location fixes into distance, elevation gain and splits,
//! keeps an accurate active duration across pauses, restarts silent GPS
//! streams, and checkpoints progress so a killed process can resume.
//!
//! The platform location service, key-value storage and keep-alive hooks are
//! reached through the traits in `services::location`, `storage` and
//! `services::watchdog`.

pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod storage;
pub mod time_utils;

pub use config::TrackerConfig;
pub use error::{Result, TrackerError};
pub use services::{RecoveryOutcome, SessionTracker};
