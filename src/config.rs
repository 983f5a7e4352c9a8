// Copyright (c) 2025 - Cowboy AI, Inc.
//! Emission Configuration Model
//!
//! An [`EmissionConfig`] is an immutable snapshot describing which distribution
//! to sample, with which parameters, how often, and whether the sampled value is
//! surfaced for local display. Snapshots are only ever replaced wholesale; the
//! engine diffs the incoming snapshot against the running one
//! ([`EmissionConfig::change_from`]) to decide how much to rebuild.
//!
//! # Wire Format
//!
//! Snapshots travel as JSON in the shape the widget persists:
//!
//! ```text
//! {
//!   "frequency": 2,
//!   "distribution": "uniformInt",
//!   "options": { "min": 0, "max": 10 },
//!   "showOutput": true
//! }
//! ```
//!
//! Missing fields fall back to per-kind defaults. The flat option bag
//! (`{"distribution": "normal", "mu": 0, "sigma": 1}`) is accepted through
//! [`EmissionConfig::from_flat_json`].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::errors::{EmitterError, EmitterResult};

/// Default emission frequency in samples per second
pub const DEFAULT_FREQUENCY: f64 = 1.0;

/// Default key under which values are published to the host
pub const DEFAULT_OUTPUT_KEY: &str = "v";

/// Distribution tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DistributionKind {
    Uniform,
    UniformInt,
    UniformBoolean,
    Normal,
    Sin,
}

impl DistributionKind {
    /// Every kind the catalog can build
    pub const ALL: [DistributionKind; 5] = [
        DistributionKind::Uniform,
        DistributionKind::UniformInt,
        DistributionKind::UniformBoolean,
        DistributionKind::Normal,
        DistributionKind::Sin,
    ];

    /// Wire name of the kind
    pub fn as_str(&self) -> &'static str {
        match self {
            DistributionKind::Uniform => "uniform",
            DistributionKind::UniformInt => "uniformInt",
            DistributionKind::UniformBoolean => "uniformBoolean",
            DistributionKind::Normal => "normal",
            DistributionKind::Sin => "sin",
        }
    }
}

impl fmt::Display for DistributionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DistributionKind {
    type Err = EmitterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DistributionKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| EmitterError::UnknownDistribution(s.to_string()))
    }
}

/// Parameters of a distribution, one variant per kind
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DistributionParameters {
    /// Continuous uniform over `[min, max)`
    Uniform { min: f64, max: f64 },
    /// Integer uniform over `[floor(min), floor(max)]`
    UniformInt { min: f64, max: f64 },
    /// Fair coin
    UniformBoolean,
    /// Gaussian with mean `mu` and standard deviation `sigma`
    Normal { mu: f64, sigma: f64 },
    /// Deterministic sine oscillator advancing its phase by `increment` per sample
    Sin { increment: f64 },
}

impl DistributionParameters {
    /// Kind tag of these parameters
    pub fn kind(&self) -> DistributionKind {
        match self {
            DistributionParameters::Uniform { .. } => DistributionKind::Uniform,
            DistributionParameters::UniformInt { .. } => DistributionKind::UniformInt,
            DistributionParameters::UniformBoolean => DistributionKind::UniformBoolean,
            DistributionParameters::Normal { .. } => DistributionKind::Normal,
            DistributionParameters::Sin { .. } => DistributionKind::Sin,
        }
    }

    /// Default parameters for a kind
    pub fn default_for(kind: DistributionKind) -> Self {
        match kind {
            DistributionKind::Uniform => DistributionParameters::Uniform { min: 0.0, max: 1.0 },
            DistributionKind::UniformInt => {
                DistributionParameters::UniformInt { min: 0.0, max: 10.0 }
            }
            DistributionKind::UniformBoolean => DistributionParameters::UniformBoolean,
            DistributionKind::Normal => DistributionParameters::Normal { mu: 0.0, sigma: 1.0 },
            DistributionKind::Sin => DistributionParameters::Sin { increment: 0.01 },
        }
    }

    /// Check parameter invariants
    pub fn validate(&self) -> EmitterResult<()> {
        match *self {
            DistributionParameters::Uniform { min, max } => {
                require_finite("min", min)?;
                require_finite("max", max)?;
                if min > max {
                    return Err(EmitterError::InvalidBounds { min, max });
                }
                if !(max - min).is_finite() {
                    return Err(EmitterError::Configuration(format!(
                        "uniform range [{}, {}) is too wide to sample",
                        min, max
                    )));
                }
                Ok(())
            }
            DistributionParameters::UniformInt { min, max } => {
                require_finite("min", min)?;
                require_finite("max", max)?;
                let (lo, hi) = (min.floor(), max.floor());
                require_integral_range("min", lo)?;
                require_integral_range("max", hi)?;
                if lo > hi {
                    return Err(EmitterError::InvalidBounds { min: lo, max: hi });
                }
                Ok(())
            }
            DistributionParameters::UniformBoolean => Ok(()),
            DistributionParameters::Normal { mu, sigma } => {
                require_finite("mu", mu)?;
                require_finite("sigma", sigma)?;
                if sigma < 0.0 {
                    return Err(EmitterError::InvalidParameter {
                        name: "sigma",
                        value: sigma,
                    });
                }
                Ok(())
            }
            DistributionParameters::Sin { increment } => require_finite("increment", increment),
        }
    }
}

impl Default for DistributionParameters {
    fn default() -> Self {
        DistributionParameters::default_for(DistributionKind::Uniform)
    }
}

fn require_finite(name: &'static str, value: f64) -> EmitterResult<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(EmitterError::InvalidParameter { name, value })
    }
}

// Floored bounds must survive the cast to i64 unchanged.
fn require_integral_range(name: &'static str, value: f64) -> EmitterResult<()> {
    const LIMIT: f64 = 9_007_199_254_740_992.0; // 2^53
    if value.abs() <= LIMIT {
        Ok(())
    } else {
        Err(EmitterError::InvalidParameter { name, value })
    }
}

/// Longest schedulable interval between two ticks
pub const MAX_TICK_PERIOD: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Tick period for a frequency in samples per second
///
/// Rejects non-positive and non-finite frequencies, frequencies so high the
/// period rounds down to zero, and frequencies so low the period exceeds
/// [`MAX_TICK_PERIOD`].
pub fn tick_period(frequency: f64) -> EmitterResult<Duration> {
    if !frequency.is_finite() || frequency <= 0.0 {
        return Err(EmitterError::InvalidFrequency(frequency));
    }
    match Duration::try_from_secs_f64(1.0 / frequency) {
        Ok(period) if !period.is_zero() && period <= MAX_TICK_PERIOD => Ok(period),
        _ => Err(EmitterError::InvalidFrequency(frequency)),
    }
}

/// How a new snapshot differs from the running one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigChange {
    /// Identical snapshot
    Unchanged,
    /// Only the display flag moved
    DisplayOnly,
    /// Frequency moved (display may also have moved), sampler is kept
    Frequency,
    /// Kind or parameters moved, sampler must be rebuilt
    Sampler,
}

/// Immutable emission configuration snapshot
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "WireConfig", into = "WireConfig")]
pub struct EmissionConfig {
    /// Samples per second
    pub frequency: f64,
    /// Distribution and its parameters
    pub parameters: DistributionParameters,
    /// Surface each sampled value for local display
    pub show_output: bool,
}

impl Default for EmissionConfig {
    fn default() -> Self {
        Self {
            frequency: DEFAULT_FREQUENCY,
            parameters: DistributionParameters::default(),
            show_output: false,
        }
    }
}

impl EmissionConfig {
    /// Create a snapshot
    pub fn new(frequency: f64, parameters: DistributionParameters, show_output: bool) -> Self {
        Self {
            frequency,
            parameters,
            show_output,
        }
    }

    /// Distribution kind of this snapshot
    pub fn kind(&self) -> DistributionKind {
        self.parameters.kind()
    }

    /// Validate frequency and parameters
    pub fn validate(&self) -> EmitterResult<()> {
        tick_period(self.frequency)?;
        self.parameters.validate()
    }

    /// Tick period of this snapshot
    pub fn period(&self) -> EmitterResult<Duration> {
        tick_period(self.frequency)
    }

    /// Classify this snapshot relative to the one it replaces
    pub fn change_from(&self, previous: &EmissionConfig) -> ConfigChange {
        if self.parameters != previous.parameters {
            ConfigChange::Sampler
        } else if self.frequency != previous.frequency {
            ConfigChange::Frequency
        } else if self.show_output != previous.show_output {
            ConfigChange::DisplayOnly
        } else {
            ConfigChange::Unchanged
        }
    }

    /// Parse a snapshot in the nested wire shape
    ///
    /// Unlike `serde_json::from_str::<EmissionConfig>`, this keeps the precise
    /// error variant (e.g. [`EmitterError::UnknownDistribution`]).
    pub fn from_json(json: &str) -> EmitterResult<Self> {
        let wire: WireConfig = serde_json::from_str(json)?;
        wire.try_into()
    }

    /// Parse a snapshot from a flat option bag
    pub fn from_flat_json(json: &str) -> EmitterResult<Self> {
        let flat: FlatConfig = serde_json::from_str(json)?;
        WireConfig::from(flat).try_into()
    }

    /// Serialize to the nested wire shape
    pub fn to_json(&self) -> EmitterResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Option fields of the wire shape; each kind reads only its own
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WireOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mu: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sigma: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub increment: Option<f64>,
}

/// Nested JSON shape of a snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireConfig {
    #[serde(default = "default_frequency")]
    pub frequency: f64,
    #[serde(default = "default_distribution")]
    pub distribution: String,
    #[serde(default)]
    pub options: WireOptions,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show_output: Option<bool>,
}

/// Flat JSON shape: options inline next to frequency and distribution
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FlatConfig {
    #[serde(default = "default_frequency")]
    frequency: f64,
    #[serde(default = "default_distribution")]
    distribution: String,
    #[serde(flatten)]
    options: WireOptions,
    #[serde(default)]
    show_output: Option<bool>,
}

fn default_frequency() -> f64 {
    DEFAULT_FREQUENCY
}

fn default_distribution() -> String {
    DistributionKind::Uniform.as_str().to_string()
}

impl From<FlatConfig> for WireConfig {
    fn from(flat: FlatConfig) -> Self {
        Self {
            frequency: flat.frequency,
            distribution: flat.distribution,
            options: flat.options,
            show_output: flat.show_output,
        }
    }
}

impl TryFrom<WireConfig> for EmissionConfig {
    type Error = EmitterError;

    fn try_from(wire: WireConfig) -> Result<Self, Self::Error> {
        let kind: DistributionKind = wire.distribution.parse()?;
        let opts = &wire.options;
        let parameters = match DistributionParameters::default_for(kind) {
            DistributionParameters::Uniform { min, max } => DistributionParameters::Uniform {
                min: opts.min.unwrap_or(min),
                max: opts.max.unwrap_or(max),
            },
            DistributionParameters::UniformInt { min, max } => DistributionParameters::UniformInt {
                min: opts.min.unwrap_or(min),
                max: opts.max.unwrap_or(max),
            },
            DistributionParameters::UniformBoolean => DistributionParameters::UniformBoolean,
            // `max` is never read for normal; sigma is authoritative
            DistributionParameters::Normal { mu, sigma } => DistributionParameters::Normal {
                mu: opts.mu.unwrap_or(mu),
                sigma: opts.sigma.unwrap_or(sigma),
            },
            DistributionParameters::Sin { increment } => DistributionParameters::Sin {
                increment: opts.increment.unwrap_or(increment),
            },
        };

        Ok(EmissionConfig {
            frequency: wire.frequency,
            parameters,
            show_output: wire.show_output.unwrap_or(false),
        })
    }
}

impl From<EmissionConfig> for WireConfig {
    fn from(config: EmissionConfig) -> Self {
        let options = match config.parameters {
            DistributionParameters::Uniform { min, max }
            | DistributionParameters::UniformInt { min, max } => WireOptions {
                min: Some(min),
                max: Some(max),
                ..WireOptions::default()
            },
            DistributionParameters::UniformBoolean => WireOptions::default(),
            DistributionParameters::Normal { mu, sigma } => WireOptions {
                mu: Some(mu),
                sigma: Some(sigma),
                ..WireOptions::default()
            },
            DistributionParameters::Sin { increment } => WireOptions {
                increment: Some(increment),
                ..WireOptions::default()
            },
        };

        Self {
            frequency: config.frequency,
            distribution: config.kind().as_str().to_string(),
            options,
            show_output: Some(config.show_output),
        }
    }
}

/// Engine-level settings that are not part of a configuration snapshot
#[derive(Debug, Clone, PartialEq)]
pub struct EngineSettings {
    /// Key passed to the output sink with every value
    pub output_key: String,
    /// Base seed; when set every sampler built is reproducible
    pub seed: Option<u64>,
    /// Snapshot applied at mount; the default snapshot when absent
    pub initial_config: Option<EmissionConfig>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            output_key: DEFAULT_OUTPUT_KEY.to_string(),
            seed: None,
            initial_config: None,
        }
    }
}

impl EngineSettings {
    /// Load settings from environment variables
    ///
    /// - `RANDOM_EMITTER_KEY`: output key (default `"v"`)
    /// - `RANDOM_EMITTER_SEED`: base seed (u64)
    /// - `RANDOM_EMITTER_CONFIG`: initial snapshot as nested JSON
    pub fn from_env() -> EmitterResult<Self> {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    fn from_vars<F>(var: F) -> EmitterResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let output_key =
            var("RANDOM_EMITTER_KEY").unwrap_or_else(|| DEFAULT_OUTPUT_KEY.to_string());

        let seed = match var("RANDOM_EMITTER_SEED") {
            Some(raw) => Some(raw.trim().parse::<u64>().map_err(|e| {
                EmitterError::Configuration(format!("RANDOM_EMITTER_SEED '{}': {}", raw, e))
            })?),
            None => None,
        };

        let initial_config = match var("RANDOM_EMITTER_CONFIG") {
            Some(raw) => Some(EmissionConfig::from_json(&raw)?),
            None => None,
        };

        Ok(Self {
            output_key,
            seed,
            initial_config,
        })
    }

    /// Set the output key
    pub fn with_output_key(mut self, key: impl Into<String>) -> Self {
        self.output_key = key.into();
        self
    }

    /// Set the base seed
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Set the snapshot applied at mount
    pub fn with_initial_config(mut self, config: EmissionConfig) -> Self {
        self.initial_config = Some(config);
        self
    }
}
