// Copyright (c) 2025 - Cowboy AI, Inc.
//! Output Sinks
//!
//! An [`OutputSink`] is the host channel that receives every emitted value.
//! The engine calls it exactly once per tick and treats it as fire-and-forget:
//! a returned [`SinkError`] is logged and dropped, and the next tick proceeds
//! regardless.
//!
//! ```text
//! Tick                         Sink
//! ────                         ────
//! sample() ──(key, value)──>  publish()
//!                                │
//!                                ▼
//!                         host channel / log / buffer
//! ```

use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::mpsc;
use tracing::info;

use crate::distribution::SampleValue;

/// Errors a sink may report for a single publish
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SinkError {
    /// The receiving side has gone away
    #[error("Sink disconnected: {0}")]
    Disconnected(String),

    /// The host refused the value
    #[error("Publish rejected: {0}")]
    Rejected(String),
}

/// Host channel receiving emitted values
///
/// Implementations must be cheap to call repeatedly; the engine does not
/// buffer or serialize calls on their behalf.
pub trait OutputSink: Send + Sync {
    /// Publish one value under `key`
    fn publish(&self, key: &str, value: SampleValue) -> Result<(), SinkError>;
}

impl<F> OutputSink for F
where
    F: Fn(&str, SampleValue) -> Result<(), SinkError> + Send + Sync,
{
    fn publish(&self, key: &str, value: SampleValue) -> Result<(), SinkError> {
        self(key, value)
    }
}

/// One published value
#[derive(Debug, Clone, PartialEq)]
pub struct Published {
    pub key: String,
    pub value: SampleValue,
}

/// Forwards values into an unbounded tokio channel
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<Published>,
}

impl ChannelSink {
    /// Wrap an existing sender
    pub fn new(tx: mpsc::UnboundedSender<Published>) -> Self {
        Self { tx }
    }

    /// Create a sink and the receiver it feeds
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Published>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }
}

impl OutputSink for ChannelSink {
    fn publish(&self, key: &str, value: SampleValue) -> Result<(), SinkError> {
        self.tx
            .send(Published {
                key: key.to_string(),
                value,
            })
            .map_err(|e| SinkError::Disconnected(e.to_string()))
    }
}

/// Logs each value through `tracing` instead of delivering it
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingSink;

impl OutputSink for LoggingSink {
    fn publish(&self, key: &str, value: SampleValue) -> Result<(), SinkError> {
        info!(key, %value, "emitted");
        Ok(())
    }
}

/// Discards all values
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl OutputSink for NullSink {
    fn publish(&self, _key: &str, _value: SampleValue) -> Result<(), SinkError> {
        Ok(())
    }
}

/// Collects values in memory
///
/// Clones share the same buffer, so a clone handed to the engine can be
/// inspected through the original.
#[derive(Debug, Clone, Default)]
pub struct CollectingSink {
    collected: Arc<Mutex<Vec<Published>>>,
}

impl CollectingSink {
    /// Create an empty collector
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every value collected so far
    pub fn published(&self) -> Vec<Published> {
        self.lock().clone()
    }

    /// Values only, in publish order
    pub fn values(&self) -> Vec<SampleValue> {
        self.lock().iter().map(|p| p.value).collect()
    }

    /// Number of values collected
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether nothing has been collected
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Take all collected values, leaving the collector empty
    pub fn take(&self) -> Vec<Published> {
        std::mem::take(&mut *self.lock())
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Published>> {
        self.collected
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
    }
}

impl OutputSink for CollectingSink {
    fn publish(&self, key: &str, value: SampleValue) -> Result<(), SinkError> {
        self.lock().push(Published {
            key: key.to_string(),
            value,
        });
        Ok(())
    }
}
