// Copyright (c) 2025 - Cowboy AI, Inc.
//! Local Display Slot
//!
//! Keeps the single retained value (the most recent sample) and the state
//! surfaced to the surrounding UI. With `showOutput` on, every tick pushes the
//! value's display string to watchers; with it off, watchers see a static
//! [`DisplayState::Active`] indicator and receive no per-tick updates.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};
use tokio::sync::watch;

use crate::distribution::SampleValue;

/// Text shown while values are emitted but not displayed
pub const ACTIVE_INDICATOR: &str = "active";

/// What the UI should show
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplayState {
    /// Engine is emitting, values hidden
    Active,
    /// Latest value as its display string
    Value(String),
}

impl fmt::Display for DisplayState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisplayState::Active => f.write_str(ACTIVE_INDICATOR),
            DisplayState::Value(text) => f.write_str(text),
        }
    }
}

/// Last-value slot plus a watch channel of [`DisplayState`]
#[derive(Debug)]
pub struct OutputDisplay {
    tx: watch::Sender<DisplayState>,
    show_output: AtomicBool,
    last: Mutex<Option<SampleValue>>,
}

impl Default for OutputDisplay {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputDisplay {
    /// Create a slot showing the active indicator
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(DisplayState::Active);
        Self {
            tx,
            show_output: AtomicBool::new(false),
            last: Mutex::new(None),
        }
    }

    /// Watch display changes
    pub fn subscribe(&self) -> watch::Receiver<DisplayState> {
        self.tx.subscribe()
    }

    /// Current display state
    pub fn current(&self) -> DisplayState {
        self.tx.borrow().clone()
    }

    /// Most recent sample, if any tick has fired
    pub fn last_value(&self) -> Option<SampleValue> {
        *self.lock_last()
    }

    /// Whether values are currently surfaced
    pub fn shows_output(&self) -> bool {
        self.show_output.load(Ordering::Acquire)
    }

    /// Switch between surfacing values and the active indicator
    pub fn set_show_output(&self, show: bool) {
        self.show_output.store(show, Ordering::Release);
        let next = match (show, self.last_value()) {
            (true, Some(value)) => DisplayState::Value(value.to_string()),
            _ => DisplayState::Active,
        };
        self.tx.send_if_modified(|state| {
            if *state == next {
                false
            } else {
                *state = next;
                true
            }
        });
    }

    /// Record a tick's value
    pub fn record(&self, value: SampleValue) {
        *self.lock_last() = Some(value);
        if self.shows_output() {
            self.tx.send_replace(DisplayState::Value(value.to_string()));
        }
    }

    fn lock_last(&self) -> MutexGuard<'_, Option<SampleValue>> {
        self.last.lock().unwrap_or_else(|poison| poison.into_inner())
    }
}
