// Copyright (c) 2025 - Cowboy AI, Inc.
//! Property-Based Tests for Configuration Snapshots

use cim_random_emitter::{ConfigChange, DistributionParameters, EmissionConfig, EmitterError};
use proptest::prelude::*;

fn parameters() -> impl Strategy<Value = DistributionParameters> {
    prop_oneof![
        (-1.0e3f64..1.0e3, 0.0f64..1.0e3)
            .prop_map(|(min, w)| DistributionParameters::Uniform { min, max: min + w }),
        (-1.0e3f64..1.0e3, 1.0f64..1.0e3)
            .prop_map(|(min, w)| DistributionParameters::UniformInt { min, max: min + w }),
        Just(DistributionParameters::UniformBoolean),
        (-1.0e3f64..1.0e3, 0.0f64..1.0e2)
            .prop_map(|(mu, sigma)| DistributionParameters::Normal { mu, sigma }),
        (-1.0f64..1.0).prop_map(|increment| DistributionParameters::Sin { increment }),
    ]
}

fn snapshot() -> impl Strategy<Value = EmissionConfig> {
    (0.01f64..1.0e3, parameters(), any::<bool>())
        .prop_map(|(frequency, parameters, show)| EmissionConfig::new(frequency, parameters, show))
}

proptest! {
    /// Valid snapshots survive the wire format unchanged
    #[test]
    fn prop_wire_round_trip(config in snapshot()) {
        prop_assert!(config.validate().is_ok());
        let json = config.to_json().unwrap();
        prop_assert_eq!(EmissionConfig::from_json(&json).unwrap(), config);
    }

    /// A snapshot compared with itself is unchanged
    #[test]
    fn prop_self_change_is_unchanged(config in snapshot()) {
        prop_assert_eq!(config.change_from(&config), ConfigChange::Unchanged);
    }

    /// Frequency-only edits never require a new sampler
    #[test]
    fn prop_frequency_edit_keeps_sampler(config in snapshot(), frequency in 0.01f64..1.0e3) {
        prop_assume!(frequency != config.frequency);
        let edited = EmissionConfig { frequency, ..config };
        prop_assert_eq!(edited.change_from(&config), ConfigChange::Frequency);
    }

    /// Non-positive frequencies are always rejected
    #[test]
    fn prop_non_positive_frequency_rejected(config in snapshot(), frequency in -1.0e6f64..=0.0) {
        let edited = EmissionConfig { frequency, ..config };
        prop_assert_eq!(edited.validate(), Err(EmitterError::InvalidFrequency(frequency)));
    }
}
