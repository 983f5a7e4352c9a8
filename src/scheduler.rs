// Copyright (c) 2025 - Cowboy AI, Inc.
//! Emission Scheduler
//!
//! Owns one repeating timer per [`EmissionHandle`]. Every period the timer
//! draws one value from the sampler and hands it to the `on_value` callback.
//! The scheduler knows nothing about distributions: anything implementing
//! [`Sample`] can be driven.
//!
//! # Timing
//!
//! ```text
//! start()        +T         +2T        +3T
//!    │───────────●──────────●──────────●───→
//!               tick       tick       tick
//! ```
//!
//! There is no tick at `start()`. Missed ticks are skipped, never bursted.
//!
//! # Stopping
//!
//! Each tick runs under a per-handle gate. [`EmissionHandle::stop`] takes the
//! gate before marking the handle dead and aborting its task, so once `stop`
//! returns no tick of that handle is running and none will start. `stop` is
//! idempotent and also runs on drop. Do not call it from inside `on_value`.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, trace};
use uuid::Uuid;

use crate::config::{tick_period, MAX_TICK_PERIOD};
use crate::distribution::{Sample, SampleValue};
use crate::errors::{EmitterError, EmitterResult};

/// Identity of one timer generation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandleId(Uuid);

impl HandleId {
    fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl fmt::Display for HandleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Cancel handle for a running emission timer
#[derive(Debug)]
pub struct EmissionHandle {
    id: HandleId,
    period: Duration,
    stopped: Arc<Mutex<bool>>,
    ticks: Arc<AtomicU64>,
    task: Option<JoinHandle<()>>,
}

impl EmissionHandle {
    /// Identity of this timer
    pub fn id(&self) -> HandleId {
        self.id
    }

    /// Interval between ticks
    pub fn period(&self) -> Duration {
        self.period
    }

    /// Ticks fired so far
    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::Acquire)
    }

    /// Whether the timer is still live
    pub fn is_active(&self) -> bool {
        !*self
            .stopped
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
    }

    /// Stop the timer
    ///
    /// Blocks until any in-flight tick of this handle has finished.
    pub fn stop(&mut self) {
        {
            let mut stopped = self
                .stopped
                .lock()
                .unwrap_or_else(|poison| poison.into_inner());
            if *stopped {
                return;
            }
            *stopped = true;
        }

        if let Some(task) = self.task.take() {
            task.abort();
        }
        debug!(handle = %self.id, ticks = self.ticks(), "emission timer stopped");
    }
}

impl Drop for EmissionHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Starts emission timers
#[derive(Debug, Clone, Copy, Default)]
pub struct EmissionScheduler;

impl EmissionScheduler {
    /// Start emitting `sampler` values at `frequency` Hz
    ///
    /// Fails with [`EmitterError::InvalidFrequency`] for a non-positive or
    /// unschedulable frequency and with [`EmitterError::Runtime`] outside a
    /// tokio runtime. Neither failure leaves a timer behind.
    pub fn start<S, F>(
        sampler: Arc<Mutex<S>>,
        frequency: f64,
        on_value: F,
    ) -> EmitterResult<EmissionHandle>
    where
        S: Sample + 'static,
        F: FnMut(SampleValue) + Send + 'static,
    {
        let period = tick_period(frequency)?;
        let runtime = current_runtime()?;
        Ok(Self::start_on(&runtime, sampler, period, on_value))
    }

    /// Start a timer on `runtime` with an already validated `period`
    ///
    /// The period is clamped to `[1ns, MAX_TICK_PERIOD]`.
    pub fn start_on<S, F>(
        runtime: &tokio::runtime::Handle,
        sampler: Arc<Mutex<S>>,
        period: Duration,
        on_value: F,
    ) -> EmissionHandle
    where
        S: Sample + 'static,
        F: FnMut(SampleValue) + Send + 'static,
    {
        let period = period.clamp(Duration::from_nanos(1), MAX_TICK_PERIOD);
        let id = HandleId::new();
        let stopped = Arc::new(Mutex::new(false));
        let ticks = Arc::new(AtomicU64::new(0));
        let now = Instant::now();
        let first = now.checked_add(period).unwrap_or(now);

        let task = {
            let stopped = Arc::clone(&stopped);
            let ticks = Arc::clone(&ticks);
            let mut on_value = on_value;
            runtime.spawn(async move {
                let mut interval = time::interval_at(first, period);
                interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
                loop {
                    interval.tick().await;
                    if !fire(&*stopped, &*sampler, &mut on_value, &*ticks) {
                        break;
                    }
                }
            })
        };

        debug!(handle = %id, ?period, "emission timer started");

        EmissionHandle {
            id,
            period,
            stopped,
            ticks,
            task: Some(task),
        }
    }
}

/// Handle to the ambient tokio runtime
pub fn current_runtime() -> EmitterResult<tokio::runtime::Handle> {
    tokio::runtime::Handle::try_current().map_err(|e| EmitterError::Runtime(e.to_string()))
}

// One tick, atomic with respect to `stop`. Returns false once the handle is dead.
fn fire<S, F>(
    stopped: &Mutex<bool>,
    sampler: &Mutex<S>,
    on_value: &mut F,
    ticks: &AtomicU64,
) -> bool
where
    S: Sample,
    F: FnMut(SampleValue),
{
    let gate = stopped.lock().unwrap_or_else(|poison| poison.into_inner());
    if *gate {
        return false;
    }

    let value = sampler
        .lock()
        .unwrap_or_else(|poison| poison.into_inner())
        .sample();
    on_value(value);
    let n = ticks.fetch_add(1, Ordering::AcqRel) + 1;
    trace!(tick = n, %value, "tick");

    drop(gate);
    true
}
