// Copyright (c) 2025 - Cowboy AI, Inc.
//! Engine Controller
//!
//! Reconciles configuration snapshots into exactly one live sampler and one
//! live emission timer.
//!
//! # Reconciliation
//!
//! ```text
//! snapshot ─► validate ─► diff vs running ─► lifecycle FSM ─► plan
//!                │                                             │
//!             rejected                       Start / Keep / ToggleDisplay /
//!          (state kept)                      RestartTimer / RebuildSampler
//! ```
//!
//! Everything that can fail (validation, sampler construction, runtime
//! lookup) happens before the running timer is touched, so a rejected
//! snapshot leaves the engine exactly as it was. The old timer is always
//! stopped before its replacement starts, within the same call.
//!
//! A frequency-only change keeps the sampler instance, so generator state
//! such as the `sin` phase carries over. Any kind or parameter change builds
//! a fresh sampler.
//!
//! # Example
//!
//! ```rust,ignore
//! use cim_random_emitter::{EmissionConfig, EngineController, LoggingSink};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut engine = EngineController::new(LoggingSink);
//!     engine.apply(EmissionConfig::from_json(r#"{"frequency": 4, "distribution": "normal"}"#)?)?;
//!     tokio::time::sleep(std::time::Duration::from_secs(2)).await;
//!     engine.shutdown();
//!     Ok(())
//! }
//! ```

use chrono::Utc;
use futures::{Stream, StreamExt};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::config::{EmissionConfig, EngineSettings};
use crate::display::{DisplayState, OutputDisplay};
use crate::distribution::{build_sampler, SampleValue, Sampler, SamplerId};
use crate::errors::{EmitterError, EmitterResult};
use crate::scheduler::{current_runtime, EmissionHandle, EmissionScheduler, HandleId};
use crate::sink::OutputSink;
use crate::state_machine::{
    EngineInput, EngineState, ReconcilePlan, StateMachine, StateMachineWithHistory, Transition,
    TransitionError,
};

/// Live sampler and timer, owned exclusively by the controller
#[derive(Debug)]
struct ActiveEmission {
    config: EmissionConfig,
    sampler: Arc<Mutex<Sampler>>,
    sampler_id: SamplerId,
    handle: EmissionHandle,
}

/// Reconciles configuration snapshots into a running emission loop
pub struct EngineController {
    settings: EngineSettings,
    sink: Arc<dyn OutputSink>,
    display: Arc<OutputDisplay>,
    lifecycle: StateMachineWithHistory<EngineState>,
    active: Option<ActiveEmission>,
    builds: u64,
}

impl std::fmt::Debug for EngineController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineController")
            .field("state", self.lifecycle.current_state())
            .field("config", &self.config())
            .field("handle", &self.handle_id())
            .finish()
    }
}

impl EngineController {
    /// Create an idle controller with default settings
    pub fn new<S>(sink: S) -> Self
    where
        S: OutputSink + 'static,
    {
        Self::with_settings(sink, EngineSettings::default())
    }

    /// Create an idle controller
    pub fn with_settings<S>(sink: S, settings: EngineSettings) -> Self
    where
        S: OutputSink + 'static,
    {
        Self {
            settings,
            sink: Arc::new(sink),
            display: Arc::new(OutputDisplay::new()),
            lifecycle: StateMachineWithHistory::new(EngineState::Idle),
            active: None,
            builds: 0,
        }
    }

    /// Create a controller and apply the mount snapshot
    ///
    /// The snapshot is `settings.initial_config`, or the default
    /// `uniform(0, 1)` at 1 Hz with output hidden.
    pub fn mount<S>(sink: S, settings: EngineSettings) -> EmitterResult<Self>
    where
        S: OutputSink + 'static,
    {
        let initial = settings.initial_config.unwrap_or_default();
        let mut engine = Self::with_settings(sink, settings);
        engine.apply(initial)?;
        Ok(engine)
    }

    /// Replace the configuration snapshot
    ///
    /// Returns the reconciliation step taken. On error nothing changes: the
    /// previous timer and sampler (if any) keep running.
    pub fn apply(&mut self, config: EmissionConfig) -> EmitterResult<ReconcilePlan> {
        match self.reconcile(config) {
            Ok(plan) => Ok(plan),
            Err(err) => {
                warn!(
                    error = %err,
                    state = ?self.state(),
                    kind = %config.kind(),
                    frequency = config.frequency,
                    "configuration rejected"
                );
                Err(err)
            }
        }
    }

    /// Parse a nested-JSON snapshot and apply it
    pub fn apply_json(&mut self, json: &str) -> EmitterResult<ReconcilePlan> {
        self.ensure_live()?;
        let config = EmissionConfig::from_json(json).map_err(|err| {
            warn!(error = %err, "configuration rejected");
            err
        })?;
        self.apply(config)
    }

    /// Apply every snapshot from `configs` until the stream ends or the engine stops
    ///
    /// Rejected snapshots are collected and returned; they never interrupt
    /// emission.
    pub async fn drive<St>(&mut self, configs: St) -> Vec<EmitterError>
    where
        St: Stream<Item = EmissionConfig>,
    {
        futures::pin_mut!(configs);
        let mut rejected = Vec::new();

        while let Some(config) = configs.next().await {
            match self.apply(config) {
                Ok(_) => {}
                Err(EmitterError::Shutdown) => break,
                Err(err) => rejected.push(err),
            }
        }

        rejected
    }

    /// Stop emitting for good
    ///
    /// Idempotent. After this call no further values are produced and every
    /// `apply` fails with [`EmitterError::Shutdown`].
    pub fn shutdown(&mut self) {
        if self.state() == EngineState::Stopped {
            return;
        }
        let plan = self.commit(EngineInput::Shutdown);
        if let (Ok(ReconcilePlan::Halt), Some(mut active)) = (plan, self.active.take()) {
            active.handle.stop();
            info!(
                ticks = active.handle.ticks(),
                sampler = %active.sampler_id,
                "emission engine stopped"
            );
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> EngineState {
        *self.lifecycle.current_state()
    }

    /// Whether a valid snapshot is emitting
    pub fn is_running(&self) -> bool {
        self.state().is_live() && self.active.as_ref().is_some_and(|a| a.handle.is_active())
    }

    /// Running snapshot
    pub fn config(&self) -> Option<EmissionConfig> {
        self.active.as_ref().map(|a| a.config)
    }

    /// Identity of the live timer
    pub fn handle_id(&self) -> Option<HandleId> {
        self.active.as_ref().map(|a| a.handle.id())
    }

    /// Identity of the live sampler
    pub fn sampler_id(&self) -> Option<SamplerId> {
        self.active.as_ref().map(|a| a.sampler_id)
    }

    /// Oscillator phase of the live sampler, for `sin`
    pub fn sampler_phase(&self) -> Option<f64> {
        self.active.as_ref().and_then(|a| {
            a.sampler
                .lock()
                .unwrap_or_else(|poison| poison.into_inner())
                .phase()
        })
    }

    /// Ticks fired by the live timer
    pub fn ticks(&self) -> u64 {
        self.active.as_ref().map_or(0, |a| a.handle.ticks())
    }

    /// Most recently emitted value
    pub fn last_value(&self) -> Option<SampleValue> {
        self.display.last_value()
    }

    /// What the UI should currently show
    pub fn display(&self) -> DisplayState {
        self.display.current()
    }

    /// Watch display changes
    pub fn subscribe_display(&self) -> watch::Receiver<DisplayState> {
        self.display.subscribe()
    }

    /// Most recent lifecycle transitions, oldest first
    pub fn history(&self) -> &VecDeque<Transition<EngineState, EngineInput>> {
        self.lifecycle.get_history()
    }

    fn reconcile(&mut self, config: EmissionConfig) -> EmitterResult<ReconcilePlan> {
        self.ensure_live()?;
        config.validate()?;

        let input = match &self.active {
            Some(active) => EngineInput::Reconfigure(config.change_from(&active.config)),
            None => EngineInput::Mount,
        };
        let (_, plan) = self
            .lifecycle
            .current_state()
            .transition(&input)
            .map_err(|err| self.transition_error(err))?;

        // Everything fallible runs before the live timer is touched.
        let period = config.period()?;
        let fresh = match plan {
            ReconcilePlan::Start | ReconcilePlan::RebuildSampler => Some(self.build(&config)?),
            _ => None,
        };
        let runtime = match plan {
            ReconcilePlan::Start | ReconcilePlan::RestartTimer | ReconcilePlan::RebuildSampler => {
                Some(current_runtime()?)
            }
            _ => None,
        };

        self.commit(input)?;
        self.display.set_show_output(config.show_output);

        match (plan, runtime) {
            (ReconcilePlan::Keep, _) => {
                debug!("identical snapshot, nothing to do");
            }
            (ReconcilePlan::ToggleDisplay, _) => {
                if let Some(active) = self.active.as_mut() {
                    active.config = config;
                }
                debug!(show_output = config.show_output, "display toggled");
            }
            (ReconcilePlan::Start, Some(runtime)) => {
                if let Some((sampler, sampler_id)) = fresh {
                    let handle = self.spawn(&runtime, Arc::clone(&sampler), period);
                    info!(
                        kind = %config.kind(),
                        frequency = config.frequency,
                        handle = %handle.id(),
                        "emission engine running"
                    );
                    self.active = Some(ActiveEmission {
                        config,
                        sampler,
                        sampler_id,
                        handle,
                    });
                }
            }
            (ReconcilePlan::RestartTimer, Some(runtime)) => {
                if let Some(mut active) = self.active.take() {
                    active.handle.stop();
                    let handle = self.spawn(&runtime, Arc::clone(&active.sampler), period);
                    info!(
                        frequency = config.frequency,
                        sampler = %active.sampler_id,
                        handle = %handle.id(),
                        "emission timer restarted"
                    );
                    self.active = Some(ActiveEmission {
                        config,
                        handle,
                        ..active
                    });
                }
                self.commit(EngineInput::Settle)?;
            }
            (ReconcilePlan::RebuildSampler, Some(runtime)) => {
                if let Some(mut previous) = self.active.take() {
                    previous.handle.stop();
                }
                if let Some((sampler, sampler_id)) = fresh {
                    let handle = self.spawn(&runtime, Arc::clone(&sampler), period);
                    info!(
                        kind = %config.kind(),
                        frequency = config.frequency,
                        sampler = %sampler_id,
                        handle = %handle.id(),
                        "sampler rebuilt"
                    );
                    self.active = Some(ActiveEmission {
                        config,
                        sampler,
                        sampler_id,
                        handle,
                    });
                }
                self.commit(EngineInput::Settle)?;
            }
            (other, _) => {
                debug!(plan = ?other, "no reconciliation work");
            }
        }

        Ok(plan)
    }

    fn build(&mut self, config: &EmissionConfig) -> EmitterResult<(Arc<Mutex<Sampler>>, SamplerId)> {
        let seed = self.settings.seed.map(|base| base.wrapping_add(self.builds));
        let sampler = build_sampler(config.parameters, seed)?;
        self.builds += 1;
        let id = sampler.id();
        debug!(sampler = %id, kind = %sampler.kind(), seeded = seed.is_some(), "sampler built");
        Ok((Arc::new(Mutex::new(sampler)), id))
    }

    fn spawn(
        &self,
        runtime: &tokio::runtime::Handle,
        sampler: Arc<Mutex<Sampler>>,
        period: std::time::Duration,
    ) -> EmissionHandle {
        let sink = Arc::clone(&self.sink);
        let display = Arc::clone(&self.display);
        let key = self.settings.output_key.clone();

        EmissionScheduler::start_on(runtime, sampler, period, move |value| {
            if let Err(err) = sink.publish(&key, value) {
                warn!(error = %err, key = %key, "publish failed, emission continues");
            }
            display.record(value);
        })
    }

    fn commit(&mut self, input: EngineInput) -> EmitterResult<ReconcilePlan> {
        let from = self.state();
        let plan = self
            .lifecycle
            .transition_with_history(input, Utc::now())
            .map_err(|err| self.transition_error(err))?;
        debug!(?from, to = ?self.state(), ?input, ?plan, "lifecycle transition");
        Ok(plan)
    }

    fn ensure_live(&self) -> EmitterResult<()> {
        match self.state() {
            EngineState::Stopped => Err(EmitterError::Shutdown),
            _ => Ok(()),
        }
    }

    fn transition_error(&self, err: TransitionError) -> EmitterError {
        match self.state() {
            EngineState::Stopped => EmitterError::Shutdown,
            state => EmitterError::Configuration(format!(
                "{} (accepted in {:?}: {:?})",
                err,
                state,
                state.valid_inputs()
            )),
        }
    }
}

impl Drop for EngineController {
    fn drop(&mut self) {
        self.shutdown();
    }
}
