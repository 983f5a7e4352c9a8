// Copyright (c) 2025 - Cowboy AI, Inc.
//! Distribution Catalog
//!
//! Maps [`DistributionParameters`] to a [`Sampler`]: a stateful, zero-argument
//! generator producing one [`SampleValue`] per call. The only state a sampler
//! carries is its own generator state (RNG, and the phase accumulator of the
//! `sin` oscillator).
//!
//! | Kind             | Output                                        |
//! |------------------|-----------------------------------------------|
//! | `uniform`        | float in `[min, max)`, `min` when degenerate  |
//! | `uniformInt`     | integer in `[floor(min), floor(max)]`         |
//! | `uniformBoolean` | `true`/`false`, p = 0.5                       |
//! | `normal`         | Gaussian(mu, sigma), exactly `mu` if sigma=0  |
//! | `sin`            | `sin(phase += increment)`, phase from 0.01    |
//!
//! Anything that wants to be driven by the scheduler only needs [`Sample`],
//! which closures get for free.

use rand::distributions::{Distribution, Uniform};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::Normal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::config::{DistributionKind, DistributionParameters};
use crate::errors::EmitterResult;

/// Starting phase of the `sin` oscillator, so the first sample is not `sin(0)`
pub const SIN_INITIAL_PHASE: f64 = 0.01;

/// One emitted value
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SampleValue {
    Integer(i64),
    Number(f64),
    Boolean(bool),
}

impl SampleValue {
    /// Numeric view of the value, `None` for booleans
    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            SampleValue::Number(v) => Some(v),
            SampleValue::Integer(v) => Some(v as f64),
            SampleValue::Boolean(_) => None,
        }
    }

    /// Boolean view of the value, `None` for numbers
    pub fn as_bool(&self) -> Option<bool> {
        match *self {
            SampleValue::Boolean(b) => Some(b),
            _ => None,
        }
    }
}

impl fmt::Display for SampleValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SampleValue::Number(v) => write!(f, "{}", v),
            SampleValue::Integer(v) => write!(f, "{}", v),
            SampleValue::Boolean(b) => write!(f, "{}", b),
        }
    }
}

impl From<f64> for SampleValue {
    fn from(v: f64) -> Self {
        SampleValue::Number(v)
    }
}

impl From<i64> for SampleValue {
    fn from(v: i64) -> Self {
        SampleValue::Integer(v)
    }
}

impl From<bool> for SampleValue {
    fn from(b: bool) -> Self {
        SampleValue::Boolean(b)
    }
}

/// A zero-argument value generator
pub trait Sample: Send {
    /// Produce the next value
    fn sample(&mut self) -> SampleValue;
}

impl<F> Sample for F
where
    F: FnMut() -> SampleValue + Send,
{
    fn sample(&mut self) -> SampleValue {
        self()
    }
}

/// Identity of a built sampler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SamplerId(Uuid);

impl SamplerId {
    fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl fmt::Display for SamplerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone)]
enum Generator {
    Constant(SampleValue),
    Uniform(Uniform<f64>),
    UniformInt(Uniform<i64>),
    Coin,
    Normal(Normal<f64>),
    Oscillator { phase: f64, increment: f64 },
}

/// Stateful sampler for one distribution configuration
#[derive(Debug, Clone)]
pub struct Sampler {
    id: SamplerId,
    parameters: DistributionParameters,
    generator: Generator,
    rng: StdRng,
}

impl Sampler {
    /// Build a sampler seeded from OS entropy
    pub fn new(parameters: DistributionParameters) -> EmitterResult<Self> {
        Self::with_rng(parameters, StdRng::from_entropy())
    }

    /// Build a reproducible sampler
    pub fn seeded(parameters: DistributionParameters, seed: u64) -> EmitterResult<Self> {
        Self::with_rng(parameters, StdRng::seed_from_u64(seed))
    }

    fn with_rng(parameters: DistributionParameters, rng: StdRng) -> EmitterResult<Self> {
        parameters.validate()?;

        let generator = match parameters {
            DistributionParameters::Uniform { min, max } if min == max => {
                Generator::Constant(SampleValue::Number(min))
            }
            DistributionParameters::Uniform { min, max } => {
                Generator::Uniform(Uniform::new(min, max))
            }
            DistributionParameters::UniformInt { min, max } => {
                Generator::UniformInt(Uniform::new_inclusive(min.floor() as i64, max.floor() as i64))
            }
            DistributionParameters::UniformBoolean => Generator::Coin,
            DistributionParameters::Normal { mu, sigma } if sigma == 0.0 => {
                Generator::Constant(SampleValue::Number(mu))
            }
            DistributionParameters::Normal { mu, sigma } => Generator::Normal(Normal::new(mu, sigma)?),
            DistributionParameters::Sin { increment } => Generator::Oscillator {
                phase: SIN_INITIAL_PHASE,
                increment,
            },
        };

        Ok(Self {
            id: SamplerId::new(),
            parameters,
            generator,
            rng,
        })
    }

    /// Identity of this sampler
    pub fn id(&self) -> SamplerId {
        self.id
    }

    /// Parameters this sampler was built from
    pub fn parameters(&self) -> &DistributionParameters {
        &self.parameters
    }

    /// Kind of this sampler
    pub fn kind(&self) -> DistributionKind {
        self.parameters.kind()
    }

    /// Current oscillator phase, `None` for random distributions
    pub fn phase(&self) -> Option<f64> {
        match self.generator {
            Generator::Oscillator { phase, .. } => Some(phase),
            _ => None,
        }
    }
}

impl Sample for Sampler {
    fn sample(&mut self) -> SampleValue {
        match &mut self.generator {
            Generator::Constant(value) => *value,
            Generator::Uniform(dist) => SampleValue::Number(dist.sample(&mut self.rng)),
            Generator::UniformInt(dist) => SampleValue::Integer(dist.sample(&mut self.rng)),
            Generator::Coin => SampleValue::Boolean(self.rng.gen_bool(0.5)),
            Generator::Normal(dist) => SampleValue::Number(dist.sample(&mut self.rng)),
            Generator::Oscillator { phase, increment } => {
                *phase += *increment;
                SampleValue::Number(phase.sin())
            }
        }
    }
}

/// Build a sampler for the given parameters
///
/// Uses OS entropy unless `seed` is given.
pub fn build_sampler(
    parameters: DistributionParameters,
    seed: Option<u64>,
) -> EmitterResult<Sampler> {
    match seed {
        Some(seed) => Sampler::seeded(parameters, seed),
        None => Sampler::new(parameters),
    }
}
