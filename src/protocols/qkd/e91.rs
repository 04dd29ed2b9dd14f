//! E91 Quantum Key Distribution Protocol.
//!
//! E91 was proposed by Artur Ekert in 1991. A source distributes polarization-entangled
//! photon pairs; Alice and Bob each measure their half with a polarizer turned to a
//! randomly chosen angle. Same-angle trials give perfectly correlated bits (the key),
//! while the correlations at other angle differences must follow $\cos(2\Delta)$. An
//! intercept-resend attacker breaks the entanglement and pulls those correlations away
//! from theory.

use crate::analysis::{EavesdroppingReport, SharedKey};
use crate::config::{SimulationConfig, validate_angles};
use crate::core::PolarizationState;
use crate::core::errors::{ConfigurationError, SimulationError};
use crate::observer::{Observer, Recording};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use tracing::info;

/// Polarizer angles {0, π/8, π/4, 3π/8}.
pub fn default_basis_angles() -> Vec<f64> {
    (0..4).map(|i| i as f64 * PI / 8.0).collect()
}

/// Configuration of an entangled-pair run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct E91Config {
    #[serde(flatten)]
    pub simulation: SimulationConfig,
    pub alice_angles: Vec<f64>,
    pub bob_angles: Vec<f64>,
    /// Eve's basis pool. `None` means nobody listens.
    pub eve_angles: Option<Vec<f64>>,
    /// Phase origin of every emitted pair.
    pub reference_angle: f64,
    /// Angle differences checked against theory to detect Eve.
    pub test_angle_diffs: Vec<f64>,
}

impl Default for E91Config {
    fn default() -> Self {
        Self {
            simulation: SimulationConfig::default(),
            alice_angles: default_basis_angles(),
            bob_angles: default_basis_angles(),
            eve_angles: None,
            reference_angle: 0.0,
            test_angle_diffs: vec![PI / 8.0, 3.0 * PI / 8.0],
        }
    }
}

impl E91Config {
    /// Puts Eve between the source and Bob with the given basis pool.
    pub fn with_eavesdropper(mut self, angles: Vec<f64>) -> Self {
        self.eve_angles = Some(angles);
        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), SimulationError> {
        self.simulation.validate()?;
        validate_angles("alice_angles", &self.alice_angles)?;
        validate_angles("bob_angles", &self.bob_angles)?;
        if let Some(eve) = &self.eve_angles {
            validate_angles("eve_angles", eve)?;
        }
        if !self.reference_angle.is_finite() {
            return Err(ConfigurationError::InvalidBasisAngle(self.reference_angle).into());
        }
        validate_angles("test_angle_diffs", &self.test_angle_diffs)?;
        Ok(())
    }
}

/// The result of an E91 run.
#[derive(Debug, Clone, Serialize)]
pub struct E91Result {
    /// Number of entangled pairs distributed.
    pub raw_length: usize,
    pub alice: Recording,
    pub bob: Recording,
    /// Eve's recording, if she was listening.
    pub eve: Option<Recording>,
    /// Key sifted from same-angle trials.
    pub shared_key: SharedKey,
    pub eavesdropping: EavesdroppingReport,
}

/// One entangled-pair run. Built fresh for every scenario and consumed by [`run`].
///
/// [`run`]: E91Simulation::run
#[derive(Debug)]
pub struct E91Simulation {
    config: E91Config,
    alice: Observer,
    bob: Observer,
    eve: Option<Observer>,
}

impl E91Simulation {
    /// Validates `config` and sets up Alice, Bob and, if configured, Eve.
    pub fn new(config: E91Config) -> Result<Self, SimulationError> {
        config.validate()?;

        let alice = Observer::new("Alice").with_basis_choices(config.alice_angles.clone())?;
        let bob = Observer::new("Bob").with_basis_choices(config.bob_angles.clone())?;
        let eve = config
            .eve_angles
            .clone()
            .map(|angles| Observer::new("Eve").with_basis_choices(angles))
            .transpose()?;

        Ok(Self {
            config,
            alice,
            bob,
            eve,
        })
    }

    pub fn config(&self) -> &E91Config {
        &self.config
    }

    /// Distributes `num_trials` entangled pairs, then sifts the key and tests for Eve.
    ///
    /// # Errors
    ///
    /// Aborts on the first protocol or analysis error; no partial result is returned.
    pub fn run<R: Rng + ?Sized>(mut self, rng: &mut R) -> Result<E91Result, SimulationError> {
        let num_trials = self.config.simulation.num_trials;
        let carrier = self.config.simulation.carrier_frequency();
        let analyzer = self.config.simulation.analyzer()?;

        for _ in 0..num_trials {
            let mut qubit =
                PolarizationState::create_entangled_half(self.config.reference_angle, carrier);

            // Alice reveals the first half
            self.alice.observe(&mut qubit, rng)?;

            match self.eve.as_mut() {
                // Eve measures the second half and forwards a forged photon to Bob
                Some(eve) => {
                    let result = eve.observe(&mut qubit, rng)?;
                    let mut forged = eve.intercept_and_resend(&qubit, result)?;
                    self.bob.observe(&mut forged, rng)?;
                }
                None => {
                    self.bob.observe(&mut qubit, rng)?;
                }
            }
        }

        // Sifting stage
        let shared_key = analyzer.extract_shared_key(self.alice.recording(), self.bob.recording())?;
        let eavesdropping = analyzer.detect_eavesdropping(
            self.alice.recording(),
            self.bob.recording(),
            &self.config.test_angle_diffs,
        )?;

        info!(
            pairs = num_trials,
            eavesdropper = self.eve.is_some(),
            sifted = shared_key.sifted_length(),
            correlation = shared_key.correlation,
            qber = shared_key.qber(),
            mean_deviation = eavesdropping.mean_deviation,
            suspected = eavesdropping.suspected,
            "entangled run finished"
        );

        Ok(E91Result {
            raw_length: num_trials,
            alice: self.alice.recording().clone(),
            bob: self.bob.recording().clone(),
            eve: self.eve.as_ref().map(|eve| eve.recording().clone()),
            shared_key,
            eavesdropping,
        })
    }
}

/// Runs an entangled-pair scenario described by `config`, drawing from `rng`.
///
/// `config.simulation.seed` is not consulted here. Use [`run_seeded`] to build the
/// random source from the configuration.
pub fn run<R: Rng + ?Sized>(config: &E91Config, rng: &mut R) -> Result<E91Result, SimulationError> {
    E91Simulation::new(config.clone())?.run(rng)
}

/// Runs an entangled-pair scenario with the random source from `config.simulation.rng()`.
pub fn run_seeded(config: &E91Config) -> Result<E91Result, SimulationError> {
    run(config, &mut config.simulation.rng())
}
