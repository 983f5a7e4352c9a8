// Copyright (c) 2025 - Cowboy AI, Inc.
//! Property-Based Tests for the Distribution Catalog
//!
//! Every sampler built from valid parameters must stay inside its support,
//! and the empirical moments must sit near the configured ones.

use cim_random_emitter::{DistributionParameters, Sample, SampleValue, Sampler};
use proptest::prelude::*;

const DRAWS: usize = 10_000;

// ============================================================================
// Property Test Strategies
// ============================================================================

/// Generate ordered float bounds (possibly equal)
fn bounds() -> impl Strategy<Value = (f64, f64)> {
    prop_oneof![
        (-1.0e6f64..1.0e6, 0.0f64..1.0e3).prop_map(|(min, width)| (min, min + width)),
        (-1.0e6f64..1.0e6).prop_map(|x| (x, x)),
    ]
}

/// Generate float bounds whose floors are ordered
fn int_bounds() -> impl Strategy<Value = (f64, f64)> {
    (-1.0e4f64..1.0e4, 0u32..200, 0.0f64..1.0).prop_map(|(min, span, frac)| {
        let max = min.floor() + span as f64 + frac;
        (min, max)
    })
}

fn draw(parameters: DistributionParameters, seed: u64) -> Vec<SampleValue> {
    let mut sampler = Sampler::seeded(parameters, seed).unwrap();
    (0..DRAWS).map(|_| sampler.sample()).collect()
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Uniform samples lie in [min, max), or equal min when degenerate,
    /// and average to the midpoint
    #[test]
    fn prop_uniform_within_bounds((min, max) in bounds(), seed in any::<u64>()) {
        let values = draw(DistributionParameters::Uniform { min, max }, seed);
        let mut sum = 0.0;

        for value in &values {
            let x = value.as_f64().unwrap();
            if min == max {
                prop_assert_eq!(x, min);
            } else {
                prop_assert!(min <= x && x < max, "{} outside [{}, {})", x, min, max);
            }
            sum += x;
        }

        let mean = sum / DRAWS as f64;
        let tolerance = (max - min) * 0.05 + 1e-6;
        prop_assert!((mean - (min + max) / 2.0).abs() <= tolerance, "mean {}", mean);
    }

    /// Integer samples are integers within the floored bounds
    #[test]
    fn prop_uniform_int_within_floored_bounds((min, max) in int_bounds(), seed in any::<u64>()) {
        let (lo, hi) = (min.floor() as i64, max.floor() as i64);

        for value in draw(DistributionParameters::UniformInt { min, max }, seed) {
            match value {
                SampleValue::Integer(i) => {
                    prop_assert!(lo <= i && i <= hi, "{} outside [{}, {}]", i, lo, hi)
                }
                other => prop_assert!(false, "expected integer, got {:?}", other),
            }
        }
    }

    /// A fair coin lands on true about half the time
    #[test]
    fn prop_uniform_boolean_is_fair(seed in any::<u64>()) {
        let trues = draw(DistributionParameters::UniformBoolean, seed)
            .iter()
            .filter(|v| v.as_bool() == Some(true))
            .count();
        let fraction = trues as f64 / DRAWS as f64;
        prop_assert!((fraction - 0.5).abs() < 0.03, "fraction {}", fraction);
    }

    /// sigma = 0 always yields mu exactly
    #[test]
    fn prop_normal_zero_sigma_is_mu(mu in -1.0e9f64..1.0e9, seed in any::<u64>()) {
        let mut sampler =
            Sampler::seeded(DistributionParameters::Normal { mu, sigma: 0.0 }, seed).unwrap();
        for _ in 0..100 {
            prop_assert_eq!(sampler.sample(), SampleValue::Number(mu));
        }
    }

    /// Gaussian samples average to mu
    #[test]
    fn prop_normal_mean_near_mu(mu in -100.0f64..100.0, sigma in 0.01f64..10.0, seed in any::<u64>()) {
        let values = draw(DistributionParameters::Normal { mu, sigma }, seed);
        let mean = values.iter().map(|v| v.as_f64().unwrap()).sum::<f64>() / DRAWS as f64;
        // six standard errors
        prop_assert!((mean - mu).abs() < 6.0 * sigma / (DRAWS as f64).sqrt(), "mean {}", mean);
    }

    /// Two fresh oscillators with the same increment produce the same sequence
    #[test]
    fn prop_sin_is_deterministic(increment in -10.0f64..10.0) {
        let params = DistributionParameters::Sin { increment };
        let mut a = Sampler::new(params).unwrap();
        let mut b = Sampler::new(params).unwrap();

        for _ in 0..256 {
            let x = a.sample();
            prop_assert_eq!(x, b.sample());
            let x = x.as_f64().unwrap();
            prop_assert!((-1.0..=1.0).contains(&x));
        }
    }
}
