// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Single in-order background writer.
//!
//! Checkpoint and session-state writes are enqueued from the tracker's hot
//! path and applied one at a time by a worker task, so persisted state is
//! never interleaved. Failures are logged and dropped.

use crate::storage::KeyValueStore;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot};

enum WriteOp {
    Set { key: String, value: String },
    Remove { key: String },
    Flush(oneshot::Sender<()>),
}

/// Cloneable handle to the writer task.
#[derive(Clone)]
pub struct WriteQueue {
    tx: mpsc::UnboundedSender<WriteOp>,
}

impl WriteQueue {
    /// Spawn the writer on the current Tokio runtime.
    ///
    /// # Panics
    /// Panics if called outside a Tokio runtime.
    pub fn spawn(store: Arc<dyn KeyValueStore>) -> Self {
        Self::spawn_on(&Handle::current(), store)
    }

    pub fn spawn_on(handle: &Handle, store: Arc<dyn KeyValueStore>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        handle.spawn(run_writer(store, rx));
        Self { tx }
    }

    /// Enqueue a write. Never blocks.
    pub fn set(&self, key: &str, value: String) {
        self.enqueue(WriteOp::Set {
            key: key.to_string(),
            value,
        });
    }

    /// Enqueue a removal. Never blocks.
    pub fn remove(&self, key: &str) {
        self.enqueue(WriteOp::Remove {
            key: key.to_string(),
        });
    }

    /// Wait until every previously enqueued write has been applied.
    pub async fn flush(&self) {
        let (ack_tx, ack_rx) = oneshot::channel();
        self.enqueue(WriteOp::Flush(ack_tx));
        if ack_rx.await.is_err() {
            tracing::warn!("Write queue closed before flush completed");
        }
    }

    fn enqueue(&self, op: WriteOp) {
        if self.tx.send(op).is_err() {
            tracing::warn!("Write queue worker is gone; dropping write");
        }
    }
}

async fn run_writer(store: Arc<dyn KeyValueStore>, mut rx: mpsc::UnboundedReceiver<WriteOp>) {
    while let Some(op) = rx.recv().await {
        match op {
            WriteOp::Set { key, value } => {
                if let Err(e) = store.set(&key, &value).await {
                    tracing::warn!(key = %key, error = %e, "Persisted write failed (ignored)");
                }
            }
            WriteOp::Remove { key } => {
                if let Err(e) = store.remove(&key).await {
                    tracing::warn!(key = %key, error = %e, "Persisted remove failed (ignored)");
                }
            }
            WriteOp::Flush(ack) => {
                let _ = ack.send(());
            }
        }
    }
    tracing::debug!("Write queue worker stopped");
}
