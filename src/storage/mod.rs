// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Key-value persistence layer.
//!
//! The tracker assumes the store may fail at any time. Reads and writes go
//! through `KeyValueStore`; writes from live tracking go through the
//! `WriteQueue` so they are serialized and never block fix processing.

pub mod file;
pub mod memory;
pub mod write_queue;

pub use file::JsonFileStore;
pub use memory::MemoryStore;
pub use write_queue::WriteQueue;

use crate::error::Result;

/// Storage keys as constants.
pub mod keys {
    /// Lightweight session metadata, written on start/pause/resume
    pub const SESSION_STATE: &str = "run_tracker.session_state";
    /// Aggregate metrics for crash recovery, written periodically
    pub const CHECKPOINT: &str = "run_tracker.checkpoint";
}

/// Async string-keyed store.
#[async_trait::async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;

    async fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Removing a missing key is not an error.
    async fn remove(&self, key: &str) -> Result<()>;
}
