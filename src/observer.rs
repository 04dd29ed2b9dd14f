use crate::core::errors::{AnalysisError, ConfigurationError, ProtocolError, SimulationError};
use crate::core::{Outcome, PolarizationState, Polarizer};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Ordered (angle, outcome) pairs collected by an observer during one run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RecordingParts")]
pub struct Recording {
    angles: Vec<f64>,
    outcomes: Vec<Outcome>,
}

/// Wire form of a [`Recording`], checked for equal lengths on the way in.
#[derive(Deserialize)]
struct RecordingParts {
    angles: Vec<f64>,
    outcomes: Vec<Outcome>,
}

impl TryFrom<RecordingParts> for Recording {
    type Error = AnalysisError;

    fn try_from(parts: RecordingParts) -> Result<Self, Self::Error> {
        let (left, right) = (parts.angles.len(), parts.outcomes.len());
        Recording::from_parts(parts.angles, parts.outcomes)
            .ok_or(AnalysisError::LengthMismatch { left, right })
    }
}

impl Recording {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a recording from parallel angle and outcome sequences.
    ///
    /// Returns `None` if the sequences differ in length.
    pub fn from_parts(angles: Vec<f64>, outcomes: Vec<Outcome>) -> Option<Self> {
        (angles.len() == outcomes.len()).then_some(Self { angles, outcomes })
    }

    pub fn push(&mut self, angle: f64, outcome: Outcome) {
        self.angles.push(angle);
        self.outcomes.push(outcome);
    }

    /// Polarizer angles, one per trial.
    pub fn angles(&self) -> &[f64] {
        &self.angles
    }

    /// Measurement outcomes, one per trial.
    pub fn outcomes(&self) -> &[Outcome] {
        &self.outcomes
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn clear(&mut self) {
        self.angles.clear();
        self.outcomes.clear();
    }
}

/// A party holding a polarizer, a pool of basis angles and a recording of what it saw.
///
/// Each observation picks one angle uniformly (with replacement) from the pool, turns
/// the polarizer to it, measures and records the pair.
#[derive(Debug, Clone)]
pub struct Observer {
    name: String,
    polarizer: Polarizer,
    angle_choices: Vec<f64>,
    recording: Recording,
}

impl Observer {
    /// Creates an observer with the polarizer along the x axis and `{0}` as basis pool.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            polarizer: Polarizer::new(0.0),
            angle_choices: vec![0.0],
            recording: Recording::new(),
        }
    }

    /// Sets the basis pool, consuming and returning the observer.
    ///
    /// # Errors
    ///
    /// Same as [`Observer::set_basis_choices`].
    pub fn with_basis_choices(mut self, angles: Vec<f64>) -> Result<Self, SimulationError> {
        self.set_basis_choices(angles)?;
        Ok(self)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn polarizer(&self) -> &Polarizer {
        &self.polarizer
    }

    pub fn basis_choices(&self) -> &[f64] {
        &self.angle_choices
    }

    /// Replaces the pool of candidate basis angles.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError::EmptyBasisChoices` if `angles` is empty and
    /// `ConfigurationError::InvalidBasisAngle` if any angle is not finite.
    pub fn set_basis_choices(&mut self, angles: Vec<f64>) -> Result<(), SimulationError> {
        if angles.is_empty() {
            return Err(ProtocolError::EmptyBasisChoices.into());
        }
        if let Some(&bad) = angles.iter().find(|a| !a.is_finite()) {
            return Err(ConfigurationError::InvalidBasisAngle(bad).into());
        }

        debug!(observer = %self.name, choices = ?angles, "basis choices updated");
        self.angle_choices = angles;
        Ok(())
    }

    /// Measures `state` once in a randomly chosen basis and records the result.
    ///
    /// # Arguments
    ///
    /// * `state` - The photon or entangled half arriving at this observer.
    /// * `rng` - Random source for both the basis choice and the outcome.
    ///
    /// # Errors
    ///
    /// Propagates `ProtocolError` from the measurement. Nothing is recorded on failure.
    pub fn observe<R: Rng + ?Sized>(
        &mut self,
        state: &mut PolarizationState,
        rng: &mut R,
    ) -> Result<Outcome, ProtocolError> {
        let idx = rng.random_range(0..self.angle_choices.len());
        let angle = self.angle_choices[idx];

        self.polarizer.set_angle(angle);
        let result = self.polarizer.measure(state, rng)?;
        self.record(result);

        Ok(result)
    }

    fn record(&mut self, result: Outcome) {
        self.recording.push(self.polarizer.angle(), result);
    }

    /// Read-only view of everything observed since the last reset.
    pub fn recording(&self) -> &Recording {
        &self.recording
    }

    /// Clears the recording. Call between independent protocol runs.
    pub fn reset_recording(&mut self) {
        debug!(observer = %self.name, discarded = self.recording.len(), "recording reset");
        self.recording.clear();
    }

    /// Forges the photon an intercept-resend attacker forwards after measuring `state`.
    ///
    /// The replacement is polarized along the angle this observer last used if `outcome`
    /// is 1, and perpendicular to it otherwise.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError::NothingToResend` if this observer has not measured anything
    /// since its last reset.
    pub fn intercept_and_resend(
        &self,
        state: &PolarizationState,
        outcome: Outcome,
    ) -> Result<PolarizationState, ProtocolError> {
        if self.recording.is_empty() {
            return Err(ProtocolError::NothingToResend(self.name.clone()));
        }

        let basis_angle = self.polarizer.angle();
        debug!(observer = %self.name, basis_angle, outcome, "resending forged photon");
        Ok(state.clone_after_measurement(outcome, basis_angle)?)
    }
}
