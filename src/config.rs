//! Run configuration shared by every scenario.

use crate::analysis::{CorrelationAnalyzer, DEFAULT_DETECTION_THRESHOLD};
use crate::core::errors::ConfigurationError;
use crate::core::utils;
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

/// Wavelength of the reference light source, in metres.
pub const DEFAULT_WAVELENGTH: f64 = 5.513e-7;

/// Number of photons or pairs sent in a run unless configured otherwise.
pub const DEFAULT_NUM_TRIALS: usize = 1000;

/// Settings common to the single-photon and entangled scenarios.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Number of photons (or entangled pairs) sent.
    pub num_trials: usize,
    /// Source wavelength in metres; sets the carrier frequency of every photon.
    pub wavelength: f64,
    /// Seed for the run's random source. `None` draws one from the OS.
    pub seed: Option<u64>,
    /// Mean deviation from theory above which eavesdropping is suspected.
    pub detection_threshold: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            num_trials: DEFAULT_NUM_TRIALS,
            wavelength: DEFAULT_WAVELENGTH,
            seed: None,
            detection_threshold: DEFAULT_DETECTION_THRESHOLD,
        }
    }
}

impl SimulationConfig {
    /// Default settings with a fixed seed.
    pub fn seeded(seed: u64) -> Self {
        Self {
            seed: Some(seed),
            ..Default::default()
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.num_trials == 0 {
            return Err(ConfigurationError::InvalidTrialCount(self.num_trials));
        }
        if !self.wavelength.is_finite() || self.wavelength <= 0.0 {
            return Err(ConfigurationError::InvalidWavelength(self.wavelength));
        }
        if !self.detection_threshold.is_finite() || self.detection_threshold < 0.0 {
            return Err(ConfigurationError::InvalidThreshold(
                self.detection_threshold,
            ));
        }
        Ok(())
    }

    /// Carrier angular frequency of the configured source.
    pub fn carrier_frequency(&self) -> f64 {
        utils::angular_frequency(self.wavelength)
    }

    /// The single random source of a run.
    pub fn rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        }
    }

    pub fn analyzer(&self) -> Result<CorrelationAnalyzer, ConfigurationError> {
        CorrelationAnalyzer::new(self.detection_threshold)
    }
}

/// Checks that an angle set is non-empty and only holds finite angles.
pub fn validate_angles(name: &'static str, angles: &[f64]) -> Result<(), ConfigurationError> {
    if angles.is_empty() {
        return Err(ConfigurationError::EmptyAngleSet(name));
    }
    match angles.iter().find(|a| !a.is_finite()) {
        Some(&bad) => Err(ConfigurationError::InvalidBasisAngle(bad)),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    #[test]
    fn default_config_is_valid() {
        let config = SimulationConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.num_trials, 1000);
        assert_eq!(config.detection_threshold, 0.1);
    }

    #[test]
    fn invalid_values_are_rejected() {
        let zero = SimulationConfig {
            num_trials: 0,
            ..Default::default()
        };
        assert_eq!(
            zero.validate(),
            Err(ConfigurationError::InvalidTrialCount(0))
        );

        let dark = SimulationConfig {
            wavelength: -1.0,
            ..Default::default()
        };
        assert_eq!(
            dark.validate(),
            Err(ConfigurationError::InvalidWavelength(-1.0))
        );

        let lax = SimulationConfig {
            detection_threshold: f64::INFINITY,
            ..Default::default()
        };
        assert!(lax.validate().is_err());
    }

    #[test]
    fn seeded_rng_is_reproducible() {
        let config = SimulationConfig::seeded(42);
        let mut first = config.rng();
        let mut second = config.rng();

        let a: Vec<u64> = (0..8).map(|_| first.random()).collect();
        let b: Vec<u64> = (0..8).map(|_| second.random()).collect();
        assert_eq!(a, b);
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let config: SimulationConfig =
            serde_json::from_str(r#"{ "num_trials": 250, "seed": 7 }"#).unwrap();

        assert_eq!(config.num_trials, 250);
        assert_eq!(config.seed, Some(7));
        assert_eq!(config.wavelength, DEFAULT_WAVELENGTH);
    }

    #[test]
    fn angle_sets_must_be_finite_and_non_empty() {
        assert_eq!(
            validate_angles("alice_angles", &[]),
            Err(ConfigurationError::EmptyAngleSet("alice_angles"))
        );
        assert!(validate_angles("bob_angles", &[0.0, f64::NAN]).is_err());
        assert!(validate_angles("bob_angles", &[0.0, 1.0]).is_ok());
    }
}
