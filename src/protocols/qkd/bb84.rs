//! Single-photon key distribution with an optional intercept-resend attacker.
//!
//! For every trial the source picks a polarization from `source_angles` and sends one
//! photon with it to Alice and an identical one towards Bob. Alice and Bob measure with
//! their own polarizers. If Eve sits on Bob's line she measures his photon first and
//! forwards her best-guess copy instead.

use crate::analysis::{EavesdroppingReport, SharedKey};
use crate::config::{SimulationConfig, validate_angles};
use crate::core::PolarizationState;
use crate::core::errors::SimulationError;
use crate::observer::{Observer, Recording};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::f64::consts::FRAC_PI_2;
use tracing::info;

/// Configuration of a single-photon run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Bb84Config {
    #[serde(flatten)]
    pub simulation: SimulationConfig,
    /// Polarizations the source picks from, uniformly, for each trial.
    pub source_angles: Vec<f64>,
    pub alice_angles: Vec<f64>,
    pub bob_angles: Vec<f64>,
    /// Eve's basis pool. `None` means nobody listens.
    pub eve_angles: Option<Vec<f64>>,
    /// Angle differences checked against theory to detect Eve.
    pub test_angle_diffs: Vec<f64>,
}

impl Default for Bb84Config {
    fn default() -> Self {
        Self {
            simulation: SimulationConfig::default(),
            source_angles: vec![0.0, FRAC_PI_2],
            alice_angles: vec![0.0],
            bob_angles: vec![0.0],
            eve_angles: None,
            test_angle_diffs: vec![0.0],
        }
    }
}

impl Bb84Config {
    /// Puts Eve on Bob's line with the given basis pool.
    pub fn with_eavesdropper(mut self, angles: Vec<f64>) -> Self {
        self.eve_angles = Some(angles);
        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), SimulationError> {
        self.simulation.validate()?;
        validate_angles("source_angles", &self.source_angles)?;
        validate_angles("alice_angles", &self.alice_angles)?;
        validate_angles("bob_angles", &self.bob_angles)?;
        if let Some(eve) = &self.eve_angles {
            validate_angles("eve_angles", eve)?;
        }
        validate_angles("test_angle_diffs", &self.test_angle_diffs)?;
        Ok(())
    }
}

/// Single-photon run results
#[derive(Debug, Clone, Serialize)]
pub struct Bb84Result {
    /// Number of photons sent.
    pub raw_length: usize,
    /// Polarization of each photon as emitted by the source.
    pub source_angles: Vec<f64>,
    pub alice: Recording,
    pub bob: Recording,
    /// Eve's recording, if she was listening.
    pub eve: Option<Recording>,
    pub shared_key: SharedKey,
    pub eavesdropping: EavesdroppingReport,
}

/// One single-photon run. Built fresh for every scenario and consumed by [`run`].
///
/// [`run`]: Bb84Simulation::run
#[derive(Debug)]
pub struct Bb84Simulation {
    config: Bb84Config,
    alice: Observer,
    bob: Observer,
    eve: Option<Observer>,
}

impl Bb84Simulation {
    /// Validates `config` and sets up Alice, Bob and, if configured, Eve.
    pub fn new(config: Bb84Config) -> Result<Self, SimulationError> {
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

    pub fn config(&self) -> &Bb84Config {
        &self.config
    }

    /// Sends `num_trials` photon pairs, then sifts the key and tests for Eve.
    ///
    /// # Errors
    ///
    /// Aborts on the first protocol or analysis error; no partial result is returned.
    pub fn run<R: Rng + ?Sized>(mut self, rng: &mut R) -> Result<Bb84Result, SimulationError> {
        let num_trials = self.config.simulation.num_trials;
        let carrier = self.config.simulation.carrier_frequency();
        let analyzer = self.config.simulation.analyzer()?;

        let mut source_angles = Vec::with_capacity(num_trials);

        for _ in 0..num_trials {
            // Source emits two photons with the same polarization
            let idx = rng.random_range(0..self.config.source_angles.len());
            let angle = self.config.source_angles[idx];
            let mut photon_a = PolarizationState::create_independent(angle, carrier)?;
            let mut photon_b = PolarizationState::create_independent(angle, carrier)?;

            self.alice.observe(&mut photon_a, rng)?;

            // Eavesdropper intercepts and resends
            if let Some(eve) = self.eve.as_mut() {
                let result = eve.observe(&mut photon_b, rng)?;
                photon_b = eve.intercept_and_resend(&photon_b, result)?;
            }

            self.bob.observe(&mut photon_b, rng)?;

            source_angles.push(angle);
        }

        // Sifting stage
        let shared_key = analyzer.extract_shared_key(self.alice.recording(), self.bob.recording())?;
        let eavesdropping = analyzer.detect_eavesdropping(
            self.alice.recording(),
            self.bob.recording(),
            &self.config.test_angle_diffs,
        )?;

        info!(
            trials = num_trials,
            eavesdropper = self.eve.is_some(),
            sifted = shared_key.sifted_length(),
            correlation = shared_key.correlation,
            qber = shared_key.qber(),
            mean_deviation = eavesdropping.mean_deviation,
            suspected = eavesdropping.suspected,
            "single-photon run finished"
        );

        Ok(Bb84Result {
            raw_length: num_trials,
            source_angles,
            alice: self.alice.recording().clone(),
            bob: self.bob.recording().clone(),
            eve: self.eve.as_ref().map(|eve| eve.recording().clone()),
            shared_key,
            eavesdropping,
        })
    }
}

/// Runs a single-photon scenario described by `config`, drawing from `rng`.
///
/// `config.simulation.seed` is not consulted here. Use [`run_seeded`] to build the
/// random source from the configuration.
pub fn run<R: Rng + ?Sized>(
    config: &Bb84Config,
    rng: &mut R,
) -> Result<Bb84Result, SimulationError> {
    Bb84Simulation::new(config.clone())?.run(rng)
}

/// Runs a single-photon scenario with the random source from `config.simulation.rng()`.
pub fn run_seeded(config: &Bb84Config) -> Result<Bb84Result, SimulationError> {
    run(config, &mut config.simulation.rng())
}
