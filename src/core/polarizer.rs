use crate::core::errors::ProtocolError;
use crate::core::state::{Measurable, Outcome, PolarizationState};
use crate::core::utils;
use ndarray::Array2;
use num_complex::Complex64;
use rand::Rng;

/// A linear polarizer, the measurement device of every observer.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Polarizer {
    angle: f64,
}

impl Polarizer {
    pub fn new(angle: f64) -> Self {
        Self { angle }
    }

    pub fn angle(&self) -> f64 {
        self.angle
    }

    /// Overwrites the orientation. Angles are not wrapped.
    pub fn set_angle(&mut self, angle: f64) {
        self.angle = angle;
    }

    /// Rank-1 projector onto the polarizer axis.
    pub fn photon_operation(&self) -> Array2<Complex64> {
        utils::projector(self.angle)
    }

    /// Sends `state` through the polarizer and reports whether it passed.
    ///
    /// A single photon is projected onto the polarizer axis. An entangled half only needs
    /// the angle: its statistics depend on where its partner was measured. Measuring an
    /// entangled half updates the collapse status shared by both halves.
    ///
    /// # Errors
    ///
    /// `InvalidSetup` if the polarizer angle is not finite, `AlreadyFullyMeasured` for an
    /// exhausted pair.
    pub fn measure<R: Rng + ?Sized>(
        &self,
        state: &mut PolarizationState,
        rng: &mut R,
    ) -> Result<Outcome, ProtocolError> {
        match state {
            PolarizationState::Independent(photon) => {
                utils::finite_angle(self.angle)?;
                Ok(photon.measured(&self.photon_operation(), rng))
            }
            PolarizationState::Entangled(qubit) => qubit.measure(self.angle, rng),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::errors::ConfigurationError;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::f64::consts::{FRAC_PI_2, PI};

    #[test]
    fn set_angle_overwrites_without_wrapping() {
        let mut lp = Polarizer::default();
        assert_eq!(lp.angle(), 0.0);

        lp.set_angle(3.0 * PI);
        assert_eq!(lp.angle(), 3.0 * PI);

        // cos^2 of 3pi equals cos^2 of 0
        let op = lp.photon_operation();
        assert!((op[[0, 0]].re - 1.0).abs() < 1e-12);
    }

    #[test]
    fn measures_single_photons_through_projector() {
        let mut rng = StdRng::seed_from_u64(1);
        let lp = Polarizer::new(FRAC_PI_2);

        let mut vertical = PolarizationState::create_independent(FRAC_PI_2, 1.0).unwrap();
        let mut horizontal = PolarizationState::create_independent(0.0, 1.0).unwrap();

        for _ in 0..100 {
            assert_eq!(lp.measure(&mut vertical, &mut rng), Ok(1));
            assert_eq!(lp.measure(&mut horizontal, &mut rng), Ok(0));
        }
    }

    #[test]
    fn entangled_measurement_mutates_shared_pair() {
        let mut rng = StdRng::seed_from_u64(2);
        let lp = Polarizer::new(0.3);
        let mut qubit = PolarizationState::create_entangled_half(0.0, 1.0);

        let first = lp.measure(&mut qubit, &mut rng).unwrap();
        let second = lp.measure(&mut qubit, &mut rng).unwrap();

        assert_eq!(first, second);
        assert_eq!(
            lp.measure(&mut qubit, &mut rng),
            Err(ProtocolError::AlreadyFullyMeasured)
        );
    }

    #[test]
    fn non_finite_orientation_fails_without_panicking() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut lp = Polarizer::new(f64::INFINITY);
        let mut photon = PolarizationState::create_independent(0.0, 1.0).unwrap();

        assert_eq!(
            lp.measure(&mut photon, &mut rng),
            Err(ProtocolError::InvalidSetup(
                ConfigurationError::InvalidBasisAngle(f64::INFINITY)
            ))
        );

        // Second half of a collapsed pair
        let mut qubit = PolarizationState::create_entangled_half(0.0, 1.0);
        Polarizer::new(0.0).measure(&mut qubit, &mut rng).unwrap();
        assert!(matches!(
            lp.measure(&mut qubit, &mut rng),
            Err(ProtocolError::InvalidSetup(_))
        ));

        lp.set_angle(f64::NAN);
        assert!(lp.measure(&mut photon, &mut rng).is_err());
    }
}
