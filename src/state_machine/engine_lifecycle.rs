// Copyright (c) 2025 - Cowboy AI, Inc.
//! Engine Lifecycle State Machine
//!
//! Mealy machine describing the Engine Controller. The output of each
//! transition is the [`ReconcilePlan`] the controller executes.
//!
//! # States
//!
//! - Idle: no valid configuration yet
//! - Running: one timer and one sampler live
//! - Reconfiguring: transient, inside a single reconciliation step
//! - Stopped: terminal
//!
//! # Transitions
//!
//! ```text
//! Idle ──Mount──> Running
//! Running ──Reconfigure(Unchanged|DisplayOnly)──> Running
//! Running ──Reconfigure(Frequency|Sampler)──> Reconfiguring ──Settle──> Running
//! Idle|Running|Reconfiguring ──Shutdown──> Stopped
//! ```
//!
//! Rejected snapshots never reach the machine; the state is left as it was.

use super::{StateMachine, TransitionError, TransitionResult};
use crate::config::ConfigChange;

/// Lifecycle state of the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EngineState {
    Idle,
    Running,
    Reconfiguring,
    Stopped,
}

impl EngineState {
    /// Whether the engine is emitting
    pub fn is_live(&self) -> bool {
        matches!(self, EngineState::Running | EngineState::Reconfiguring)
    }
}

/// Lifecycle input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineInput {
    /// First valid snapshot arrived
    Mount,
    /// A valid snapshot replaced the running one
    Reconfigure(ConfigChange),
    /// The new timer is running
    Settle,
    /// Shutdown requested
    Shutdown,
}

/// What the controller must do for a transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcilePlan {
    /// Build a sampler and start the first timer
    Start,
    /// Nothing to do
    Keep,
    /// Flip the display flag only
    ToggleDisplay,
    /// Stop the timer, start a new one around the same sampler
    RestartTimer,
    /// Stop the timer, build a new sampler, start a new timer
    RebuildSampler,
    /// Reconfiguration finished
    Resume,
    /// Stop the timer for good
    Halt,
}

impl StateMachine for EngineState {
    type Input = EngineInput;
    type Output = ReconcilePlan;

    fn transition(&self, input: &Self::Input) -> TransitionResult<(Self, Self::Output)> {
        use EngineInput::*;
        use EngineState::*;

        match (self, input) {
            (Idle, Mount) => Ok((Running, ReconcilePlan::Start)),

            (Running, Reconfigure(ConfigChange::Unchanged)) => Ok((Running, ReconcilePlan::Keep)),
            (Running, Reconfigure(ConfigChange::DisplayOnly)) => {
                Ok((Running, ReconcilePlan::ToggleDisplay))
            }
            (Running, Reconfigure(ConfigChange::Frequency)) => {
                Ok((Reconfiguring, ReconcilePlan::RestartTimer))
            }
            (Running, Reconfigure(ConfigChange::Sampler)) => {
                Ok((Reconfiguring, ReconcilePlan::RebuildSampler))
            }

            (Reconfiguring, Settle) => Ok((Running, ReconcilePlan::Resume)),

            (Idle | Running | Reconfiguring, Shutdown) => Ok((Stopped, ReconcilePlan::Halt)),
            (Stopped, Shutdown) => Ok((Stopped, ReconcilePlan::Keep)),

            (Stopped, _) => Err(TransitionError::InvalidTransition {
                from: "Stopped".to_string(),
                to: "any state".to_string(),
            }),
            (Idle, Reconfigure(_)) => Err(TransitionError::InvalidTransition {
                from: "Idle".to_string(),
                to: "Reconfiguring (nothing mounted)".to_string(),
            }),
            (Running, Mount) => {
                Err(TransitionError::BusinessRuleViolation("Already running".to_string()))
            }
            (Reconfiguring, Mount | Reconfigure(_)) => Err(
                TransitionError::BusinessRuleViolation("Reconfiguration in progress".to_string()),
            ),
            (Idle | Running, Settle) => Err(TransitionError::InvalidTransition {
                from: format!("{:?}", self),
                to: "Running (nothing to settle)".to_string(),
            }),
        }
    }

    fn valid_inputs(&self) -> Vec<Self::Input> {
        use EngineInput::*;
        use EngineState::*;

        match self {
            Idle => vec![Mount, Shutdown],
            Running => vec![
                Reconfigure(ConfigChange::Unchanged),
                Reconfigure(ConfigChange::DisplayOnly),
                Reconfigure(ConfigChange::Frequency),
                Reconfigure(ConfigChange::Sampler),
                Shutdown,
            ],
            Reconfiguring => vec![Settle, Shutdown],
            Stopped => vec![Shutdown],
        }
    }
}
