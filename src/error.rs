// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Tracker error types.
//!
//! Live-tracking operations never return these to the caller. GPS and storage
//! failures are logged and contained inside the tracker; only setup-time APIs
//! (config, tracker construction, file store, replay binary) propagate them.

use crate::config::ConfigError;

/// Error type shared by the storage, location and tracker layers.
#[derive(Debug, thiserror::Error)]
pub enum TrackerError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Location provider error: {0}")]
    Location(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl TrackerError {
    /// True for failures of the key-value persistence layer.
    ///
    /// Serialization failures count as storage failures since they only ever
    /// happen while reading or writing persisted state.
    pub fn is_storage_error(&self) -> bool {
        matches!(
            self,
            TrackerError::Storage(_) | TrackerError::Serialization(_)
        )
    }
}

/// Result type alias for tracker operations
pub type Result<T> = std::result::Result<T, TrackerError>;
