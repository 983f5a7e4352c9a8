// Copyright (c) 2025 - Cowboy AI, Inc.
//! Finite State Machine Abstractions
//!
//! Generic, pure state machine types. Transitions are deterministic functions
//! from `(State, Input)` to `(State, Output)`; the caller performs whatever
//! side effects the output describes.
//!
//! ```text
//! (State, Input) → (State, Output)
//! ```
//!
//! The engine lifecycle ([`engine_lifecycle`]) is a Mealy machine: its output
//! is the reconciliation step the controller must carry out.
//!
//! # Example
//!
//! ```rust,ignore
//! use cim_random_emitter::state_machine::*;
//!
//! #[derive(Clone)]
//! enum Switch { Off, On }
//! enum Press { Press }
//!
//! impl StateMachine for Switch {
//!     type Input = Press;
//!     type Output = ();
//!
//!     fn transition(&self, _input: &Press) -> TransitionResult<(Self, ())> {
//!         match self {
//!             Switch::Off => Ok((Switch::On, ())),
//!             Switch::On => Ok((Switch::Off, ())),
//!         }
//!     }
//! }
//! ```

pub mod engine_lifecycle;

use std::collections::VecDeque;

pub use engine_lifecycle::{EngineInput, EngineState, ReconcilePlan};

/// Result of a state transition
pub type TransitionResult<S> = Result<S, TransitionError>;

/// Errors that can occur during state transitions
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransitionError {
    /// Transition from current state to target state is not allowed
    #[error("Invalid transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    /// Business rule prevents transition
    #[error("Business rule violated: {0}")]
    BusinessRuleViolation(String),
}

/// Trait for finite state machines
pub trait StateMachine: Sized + Clone {
    /// Input type that triggers transitions
    type Input;

    /// Output type produced by transitions (use () if none)
    type Output;

    /// Attempt to transition to a new state given an input
    fn transition(&self, input: &Self::Input) -> TransitionResult<(Self, Self::Output)>;

    /// Get all valid inputs from current state (if enumerable)
    fn valid_inputs(&self) -> Vec<Self::Input>
    where
        Self::Input: Clone,
    {
        Vec::new()
    }
}

/// Transition metadata
#[derive(Debug, Clone)]
pub struct Transition<S, I> {
    /// State before transition
    pub from: S,

    /// State after transition
    pub to: S,

    /// Input that triggered transition
    pub input: I,

    /// Timestamp of transition
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl<S, I> Transition<S, I> {
    /// Create a new transition record
    pub fn new(from: S, to: S, input: I, timestamp: chrono::DateTime<chrono::Utc>) -> Self {
        Self {
            from,
            to,
            input,
            timestamp,
        }
    }
}

/// Default number of transitions kept by [`StateMachineWithHistory`]
pub const DEFAULT_HISTORY_LIMIT: usize = 64;

/// State machine with history
///
/// Wraps a state machine and keeps the most recent transitions. Once `limit`
/// records are held, each new transition evicts the oldest.
#[derive(Debug, Clone)]
pub struct StateMachineWithHistory<FSM: StateMachine> {
    /// Current state
    pub current: FSM,

    /// Transition history, oldest first
    history: VecDeque<Transition<FSM, FSM::Input>>,

    limit: usize,
}

impl<FSM: StateMachine> StateMachineWithHistory<FSM> {
    /// Create a new state machine keeping [`DEFAULT_HISTORY_LIMIT`] transitions
    pub fn new(initial: FSM) -> Self {
        Self::with_limit(initial, DEFAULT_HISTORY_LIMIT)
    }

    /// Create a new state machine keeping at most `limit` transitions
    pub fn with_limit(initial: FSM, limit: usize) -> Self {
        Self {
            current: initial,
            history: VecDeque::with_capacity(limit.min(DEFAULT_HISTORY_LIMIT)),
            limit,
        }
    }

    /// Transition with history recording
    pub fn transition_with_history(
        &mut self,
        input: FSM::Input,
        timestamp: chrono::DateTime<chrono::Utc>,
    ) -> TransitionResult<FSM::Output> {
        let from = self.current.clone();
        let (to, output) = self.current.transition(&input)?;

        if self.limit > 0 {
            if self.history.len() == self.limit {
                self.history.pop_front();
            }
            self.history
                .push_back(Transition::new(from, to.clone(), input, timestamp));
        }

        self.current = to;
        Ok(output)
    }

    /// Get transition history, oldest first
    pub fn get_history(&self) -> &VecDeque<Transition<FSM, FSM::Input>> {
        &self.history
    }

    /// Get current state
    pub fn current_state(&self) -> &FSM {
        &self.current
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Switch {
        Off,
        On,
    }

    #[derive(Debug, Clone)]
    enum SwitchInput {
        Press,
        Jam,
    }

    impl StateMachine for Switch {
        type Input = SwitchInput;
        type Output = ();

        fn transition(&self, input: &Self::Input) -> TransitionResult<(Self, Self::Output)> {
            match (self, input) {
                (Switch::Off, SwitchInput::Press) => Ok((Switch::On, ())),
                (Switch::On, SwitchInput::Press) => Ok((Switch::Off, ())),
                (_, SwitchInput::Jam) => Err(TransitionError::BusinessRuleViolation(
                    "jammed".to_string(),
                )),
            }
        }
    }

    #[test]
    fn test_valid_inputs_default_to_empty() {
        assert!(Switch::Off.transition(&SwitchInput::Press).is_ok());
        assert!(Switch::Off.transition(&SwitchInput::Jam).is_err());
        assert!(Switch::Off.valid_inputs().is_empty());
    }

    #[test]
    fn test_history_records_only_successful_transitions() {
        let mut fsm = StateMachineWithHistory::new(Switch::Off);

        fsm.transition_with_history(SwitchInput::Press, Utc::now())
            .unwrap();
        assert_eq!(*fsm.current_state(), Switch::On);

        assert!(fsm
            .transition_with_history(SwitchInput::Jam, Utc::now())
            .is_err());
        assert_eq!(*fsm.current_state(), Switch::On);
        assert_eq!(fsm.get_history().len(), 1);
        assert_eq!(fsm.get_history()[0].from, Switch::Off);
        assert_eq!(fsm.get_history()[0].to, Switch::On);
    }

    #[test]
    fn test_history_keeps_most_recent_transitions() {
        let mut fsm = StateMachineWithHistory::with_limit(Switch::Off, 3);

        for _ in 0..10 {
            fsm.transition_with_history(SwitchInput::Press, Utc::now())
                .unwrap();
        }

        assert_eq!(fsm.get_history().len(), 3);
        assert_eq!(*fsm.current_state(), Switch::Off);
        assert_eq!(fsm.get_history().back().map(|t| t.to.clone()), Some(Switch::Off));
        assert_eq!(fsm.get_history().front().map(|t| t.from.clone()), Some(Switch::On));
    }

    #[test]
    fn test_zero_limit_records_nothing() {
        let mut fsm = StateMachineWithHistory::with_limit(Switch::Off, 0);
        fsm.transition_with_history(SwitchInput::Press, Utc::now())
            .unwrap();

        assert_eq!(*fsm.current_state(), Switch::On);
        assert!(fsm.get_history().is_empty());
    }
}
