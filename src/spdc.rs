//! Emission geometry of type-I spontaneous parametric down-conversion in a BBO crystal.
//!
//! A pump photon (extraordinary ray) splits into two ordinary photons at twice its
//! wavelength. Phase matching $n_o(2\lambda)\cos\theta = n_e(\lambda, \theta_{OA})$ fixes
//! the half-opening angle $\theta$ of the emission cone.

use crate::core::errors::ConfigurationError;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::f64::consts::{FRAC_PI_2, PI};

const BISECTION_STEPS: usize = 100;

/// Ray type inside the birefringent crystal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Ray {
    Ordinary,
    Extraordinary,
}

/// Linear polarization of an emitted pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Polarization {
    Horizontal,
    Vertical,
}

/// Refractive index of BBO from its Sellmeier equations.
///
/// # Arguments
///
/// * `ray` - Ordinary or extraordinary ray.
/// * `wavelength` - Vacuum wavelength in micrometres.
/// * `angle` - Angle between the ray and the optic axis, in radians. Ignored for the
///   ordinary ray.
pub fn refractive_index(ray: Ray, wavelength: f64, angle: f64) -> f64 {
    let w2 = wavelength * wavelength;
    let n_o = (2.7359 + 0.01878 / (w2 - 0.01822) + 0.01354 * w2).sqrt();

    match ray {
        Ray::Ordinary => n_o,
        Ray::Extraordinary => {
            let n_e = (2.3753 + 0.01224 / (w2 - 0.01667) + 0.01516 * w2).sqrt();
            1.0 / ((angle.cos() / n_o).powi(2) + (angle.sin() / n_e).powi(2)).sqrt()
        }
    }
}

/// Half-opening angle of the down-converted cone, in radians.
///
/// # Arguments
///
/// * `wavelength` - Pump wavelength in nanometres. Signal and idler come out at twice it.
/// * `optic_axis_angle` - Angle between the pump and the crystal optic axis, in radians.
///
/// # Errors
///
/// `InvalidWavelength` for non-finite or non-positive wavelengths, and `NoPhaseMatching`
/// when the crystal cut cannot phase-match the pump.
pub fn emission_angle(wavelength: f64, optic_axis_angle: f64) -> Result<f64, ConfigurationError> {
    if !wavelength.is_finite() || wavelength <= 0.0 {
        return Err(ConfigurationError::InvalidWavelength(wavelength));
    }

    let n_signal = refractive_index(Ray::Ordinary, 2.0 * wavelength / 1e3, 0.0);
    let n_pump = refractive_index(Ray::Extraordinary, wavelength / 1e3, optic_axis_angle);
    let mismatch = |theta: f64| n_signal * theta.cos() - n_pump;

    // mismatch decreases monotonically on [0, pi/2] and ends at -n_pump
    let at_axis = mismatch(0.0);
    if at_axis.is_nan() || at_axis < 0.0 {
        return Err(ConfigurationError::NoPhaseMatching {
            wavelength,
            optic_axis_angle,
        });
    }

    let (mut lo, mut hi) = (0.0, FRAC_PI_2);
    for _ in 0..BISECTION_STEPS {
        let mid = 0.5 * (lo + hi);
        if mismatch(mid) > 0.0 {
            lo = mid;
        } else {
            hi = mid;
        }
    }

    Ok(0.5 * (lo + hi))
}

/// One down-conversion event: a polarization-correlated photon pair leaving the crystal
/// on opposite sides of the emission cone.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EntangledPhotonPair {
    /// Pump wavelength in nanometres.
    pub wavelength: f64,
    pub optic_axis_angle: f64,
    /// Half-opening angle of the cone.
    pub theta: f64,
    /// Azimuth of the first photon around the pump axis.
    pub phi: f64,
    pub polarization: Polarization,
}

impl EntangledPhotonPair {
    /// Emits a pair with uniform azimuth and H or V polarization with equal odds.
    pub fn emit<R: Rng + ?Sized>(
        wavelength: f64,
        optic_axis_angle: f64,
        rng: &mut R,
    ) -> Result<Self, ConfigurationError> {
        let theta = emission_angle(wavelength, optic_axis_angle)?;
        let phi = 2.0 * PI * rng.random::<f64>();
        let polarization = if rng.random_bool(0.5) {
            Polarization::Vertical
        } else {
            Polarization::Horizontal
        };

        Ok(Self {
            wavelength,
            optic_axis_angle,
            theta,
            phi,
            polarization,
        })
    }

    /// Hit positions of both photons on a screen `distance` metres from the crystal,
    /// in the small-angle approximation.
    pub fn camera_hits(&self, distance: f64) -> [(f64, f64); 2] {
        let r = distance * self.theta;
        let (s, c) = self.phi.sin_cos();
        [(r * c, r * s), (-r * c, -r * s)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::f64::consts::FRAC_PI_4;

    #[test]
    fn extraordinary_index_matches_ordinary_along_axis() {
        let along = refractive_index(Ray::Extraordinary, 0.5, 0.0);
        let ordinary = refractive_index(Ray::Ordinary, 0.5, 1.0);
        assert!((along - ordinary).abs() < 1e-12);
        assert!((ordinary - 1.679_377_893_750_576).abs() < 1e-9);

        let across = refractive_index(Ray::Extraordinary, 0.5, FRAC_PI_2);
        assert!((across - 1.559_342_134_445_036_7).abs() < 1e-9);
    }

    #[test]
    fn emission_angle_solves_phase_matching() {
        let theta = emission_angle(400.0, FRAC_PI_4).unwrap();
        assert!((theta - 0.212_570_842_935_881_1).abs() < 1e-9, "theta = {theta}");

        let n_signal = refractive_index(Ray::Ordinary, 0.8, 0.0);
        let n_pump = refractive_index(Ray::Extraordinary, 0.4, FRAC_PI_4);
        assert!((n_signal * theta.cos() - n_pump).abs() < 1e-12);
    }

    #[test]
    fn emission_cone_opens_with_wavelength() {
        let short = emission_angle(300.0, FRAC_PI_4).unwrap();
        let long = emission_angle(700.0, FRAC_PI_4).unwrap();
        assert!(short < long);
    }

    #[test]
    fn shallow_cut_cannot_phase_match() {
        assert_eq!(
            emission_angle(400.0, 0.4),
            Err(ConfigurationError::NoPhaseMatching {
                wavelength: 400.0,
                optic_axis_angle: 0.4
            })
        );
        assert!(emission_angle(-1.0, FRAC_PI_4).is_err());
    }

    #[test]
    fn pair_photons_hit_opposite_sides() {
        let mut rng = StdRng::seed_from_u64(4);
        let pair = EntangledPhotonPair::emit(400.0, FRAC_PI_4, &mut rng).unwrap();
        assert!((0.0..2.0 * PI).contains(&pair.phi));

        let [(x1, y1), (x2, y2)] = pair.camera_hits(1.0);
        assert!((x1 + x2).abs() < 1e-15 && (y1 + y2).abs() < 1e-15);
        assert!(((x1 * x1 + y1 * y1).sqrt() - pair.theta).abs() < 1e-12);
    }

    #[test]
    fn pair_polarization_is_balanced() {
        let mut rng = StdRng::seed_from_u64(5);
        let n = 4000;
        let vertical = (0..n)
            .map(|_| EntangledPhotonPair::emit(400.0, FRAC_PI_4, &mut rng).unwrap())
            .filter(|p| p.polarization == Polarization::Vertical)
            .count();

        let ratio = vertical as f64 / n as f64;
        assert!((ratio - 0.5).abs() < 0.03, "ratio = {ratio}");
    }
}
