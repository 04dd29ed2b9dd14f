use crate::core::errors::{ConfigurationError, ProtocolError};
use crate::core::utils::{
    finite_angle, jones_vector, pass_probability, projector, round_probability,
};
use ndarray::{Array1, Array2};
use num_complex::Complex64;
use rand::Rng;
use std::cell::RefCell;
use std::f64::consts::FRAC_PI_2;
use std::rc::Rc;

/// A single measurement outcome: 1 if the photon passed the polarizer, 0 otherwise.
pub type Outcome = u8;

/// Anything whose polarization can be measured along a basis angle.
pub trait Measurable {
    /// Carrier angular frequency inherited from the source. Informational only.
    fn carrier_frequency(&self) -> f64;

    /// Measures along `basis_angle` (radians), sampling the outcome from `rng`.
    ///
    /// A non-finite `basis_angle` is rejected with `ProtocolError::InvalidSetup`.
    fn measure<R: Rng + ?Sized>(
        &mut self,
        basis_angle: f64,
        rng: &mut R,
    ) -> Result<Outcome, ProtocolError>;
}

/// A photon with a fixed linear polarization.
#[derive(Clone, Debug, PartialEq)]
pub struct SinglePhoton {
    emission_angle: f64,
    carrier_frequency: f64,
}

impl SinglePhoton {
    /// Creates a photon linearly polarized at `emission_angle` radians.
    ///
    /// # Errors
    ///
    /// `InvalidBasisAngle` if `emission_angle` is not finite.
    pub fn new(emission_angle: f64, carrier_frequency: f64) -> Result<Self, ConfigurationError> {
        Ok(Self {
            emission_angle: finite_angle(emission_angle)?,
            carrier_frequency,
        })
    }

    pub fn emission_angle(&self) -> f64 {
        self.emission_angle
    }

    /// Jones vector of the polarization in |x>, |y> coordinates.
    pub fn pol_state(&self) -> Array1<Complex64> {
        jones_vector(self.emission_angle)
    }

    /// Probability of passing the polarizer `projector`, rounded before sampling.
    pub fn transmission_probability(&self, projector: &Array2<Complex64>) -> f64 {
        round_probability(pass_probability(projector, &self.pol_state()))
    }

    /// One Bernoulli trial against the polarizer `projector`, built from a finite angle.
    pub(crate) fn measured<R: Rng + ?Sized>(
        &self,
        projector: &Array2<Complex64>,
        rng: &mut R,
    ) -> Outcome {
        Outcome::from(rng.random_bool(self.transmission_probability(projector)))
    }
}

impl Measurable for SinglePhoton {
    fn carrier_frequency(&self) -> f64 {
        self.carrier_frequency
    }

    fn measure<R: Rng + ?Sized>(
        &mut self,
        basis_angle: f64,
        rng: &mut R,
    ) -> Result<Outcome, ProtocolError> {
        let basis_angle = finite_angle(basis_angle)?;
        Ok(self.measured(&projector(basis_angle), rng))
    }
}

/// Collapse status of an entangled pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PairStatus {
    Untouched,
    Collapsed {
        first_basis_angle: f64,
        first_outcome: Outcome,
    },
}

#[derive(Debug, PartialEq)]
struct EntangledPair {
    reference_angle: f64,
    carrier_frequency: f64,
    status: PairStatus,
    second_outcome: Option<Outcome>,
}

/// Shared handle to one half of an entangled photon pair.
///
/// Cloning the handle does not clone the pair: every clone sees (and mutates) the same
/// collapse status. The pair is borrowed mutably only for the duration of a single
/// `measure` call, so the two halves must be measured one after the other, never from
/// within each other.
#[derive(Debug, Clone, PartialEq)]
pub struct EntangledQubit {
    pair: Rc<RefCell<EntangledPair>>,
}

impl EntangledQubit {
    /// Creates an untouched pair whose phase origin is `reference_angle`.
    pub fn new(reference_angle: f64, carrier_frequency: f64) -> Self {
        Self {
            pair: Rc::new(RefCell::new(EntangledPair {
                reference_angle,
                carrier_frequency,
                status: PairStatus::Untouched,
                second_outcome: None,
            })),
        }
    }

    pub fn reference_angle(&self) -> f64 {
        self.pair.borrow().reference_angle
    }

    pub fn status(&self) -> PairStatus {
        self.pair.borrow().status
    }

    /// True once both halves have been revealed.
    pub fn is_exhausted(&self) -> bool {
        self.pair.borrow().second_outcome.is_some()
    }

    /// Checks if two handles point to the same pair.
    pub fn same_pair(&self, other: &EntangledQubit) -> bool {
        Rc::ptr_eq(&self.pair, &other.pair)
    }
}

impl Measurable for EntangledQubit {
    fn carrier_frequency(&self) -> f64 {
        self.pair.borrow().carrier_frequency
    }

    fn measure<R: Rng + ?Sized>(
        &mut self,
        basis_angle: f64,
        rng: &mut R,
    ) -> Result<Outcome, ProtocolError> {
        let basis_angle = finite_angle(basis_angle)?;
        let mut pair = self.pair.borrow_mut();
        let status = pair.status;

        match status {
            PairStatus::Untouched => {
                // Unpolarized marginal: the first half passes with probability 1/2
                // whatever the basis.
                let first_outcome = Outcome::from(rng.random_bool(0.5));
                pair.status = PairStatus::Collapsed {
                    first_basis_angle: basis_angle,
                    first_outcome,
                };
                Ok(first_outcome)
            }
            PairStatus::Collapsed {
                first_basis_angle,
                first_outcome,
            } => {
                if pair.second_outcome.is_some() {
                    return Err(ProtocolError::AlreadyFullyMeasured);
                }

                let delta = basis_angle - first_basis_angle;
                let p = if first_outcome == 1 {
                    delta.cos().powi(2)
                } else {
                    delta.sin().powi(2)
                };

                let second_outcome = Outcome::from(rng.random_bool(round_probability(p)));
                pair.second_outcome = Some(second_outcome);
                Ok(second_outcome)
            }
        }
    }
}

/// Polarization state of whatever travels down the quantum channel.
#[derive(Debug, Clone, PartialEq)]
pub enum PolarizationState {
    Independent(SinglePhoton),
    Entangled(EntangledQubit),
}

impl PolarizationState {
    /// A photon with fixed polarization `angle`. No randomness at creation.
    ///
    /// # Errors
    ///
    /// `InvalidBasisAngle` if `angle` is not finite.
    pub fn create_independent(
        angle: f64,
        carrier_frequency: f64,
    ) -> Result<Self, ConfigurationError> {
        SinglePhoton::new(angle, carrier_frequency).map(Self::Independent)
    }

    /// An untouched entangled half with phase origin `angle`.
    pub fn create_entangled_half(angle: f64, carrier_frequency: f64) -> Self {
        Self::Entangled(EntangledQubit::new(angle, carrier_frequency))
    }

    pub fn is_entangled(&self) -> bool {
        matches!(self, Self::Entangled(_))
    }

    /// Best-guess photon reconstructed by an intercept-resend attacker.
    ///
    /// Polarized along `basis_angle` if the attacker saw the photon pass (`outcome == 1`),
    /// and perpendicular to it otherwise.
    ///
    /// # Errors
    ///
    /// `InvalidBasisAngle` if `basis_angle` is not finite.
    pub fn clone_after_measurement(
        &self,
        outcome: Outcome,
        basis_angle: f64,
    ) -> Result<Self, ConfigurationError> {
        let angle = if outcome == 1 {
            basis_angle
        } else {
            basis_angle + FRAC_PI_2
        };
        Self::create_independent(angle, self.carrier_frequency())
    }
}

impl Measurable for PolarizationState {
    fn carrier_frequency(&self) -> f64 {
        match self {
            Self::Independent(photon) => photon.carrier_frequency(),
            Self::Entangled(qubit) => qubit.carrier_frequency(),
        }
    }

    fn measure<R: Rng + ?Sized>(
        &mut self,
        basis_angle: f64,
        rng: &mut R,
    ) -> Result<Outcome, ProtocolError> {
        match self {
            Self::Independent(photon) => photon.measure(basis_angle, rng),
            Self::Entangled(qubit) => qubit.measure(basis_angle, rng),
        }
    }
}
