// Copyright (c) 2025 - Cowboy AI, Inc.
//! Random value emitter for the Composable Information Machine
//!
//! Continuously emits pseudo-random values drawn from a configurable
//! distribution, at a configurable rate, to a host output sink.
//!
//! ```text
//! EmissionConfig ─► EngineController ─┬─► Distribution Catalog (Sampler)
//!                                     └─► EmissionScheduler ─► OutputSink
//! ```

pub mod config;
pub mod display;
pub mod distribution;
pub mod engine;
pub mod errors;
pub mod scheduler;
pub mod sink;
pub mod state_machine;

// Re-export commonly used types
pub use config::{
    ConfigChange, DistributionKind, DistributionParameters, EmissionConfig, EngineSettings,
};
pub use display::{DisplayState, OutputDisplay};
pub use distribution::{build_sampler, Sample, SampleValue, Sampler, SamplerId};
pub use engine::EngineController;
pub use errors::{EmitterError, EmitterResult};
pub use scheduler::{EmissionHandle, EmissionScheduler, HandleId};
pub use sink::{ChannelSink, CollectingSink, LoggingSink, NullSink, OutputSink, Published, SinkError};
pub use state_machine::{EngineInput, EngineState, ReconcilePlan};
