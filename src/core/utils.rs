//! Utility functions for polarization optics.
//!
//! This module contains helper functions for:
//! - Jones vectors and rank-1 projectors of linear polarizations.
//! - Matrix helpers (outer product, trace, Hermiticity check).
//! - Probability rounding before Bernoulli sampling.
//! - Wavelength to carrier frequency conversion.

use crate::core::errors::ConfigurationError;
use ndarray::{Array1, Array2};
use num_complex::Complex64;

/// Speed of light used for carrier frequency conversion, in m/s.
pub const SPEED_OF_LIGHT: f64 = 3e8;

/// Number of decimals kept in outcome probabilities before sampling.
pub const PROBABILITY_DECIMALS: i32 = 5;

/// Jones vector of a linear polarization at `angle` radians: $(\cos\theta, \sin\theta)$.
pub fn jones_vector(angle: f64) -> Array1<Complex64> {
    Array1::from(vec![
        Complex64::new(angle.cos(), 0.0),
        Complex64::new(angle.sin(), 0.0),
    ])
}

/// Computes the outer product of two vectors $|a\rangle\langle b|$.
pub fn outer_product(a: &Array1<Complex64>, b: &Array1<Complex64>) -> Array2<Complex64> {
    let n = a.len();
    let m = b.len();
    let mut res = Array2::zeros((n, m));

    for i in 0..n {
        for j in 0..m {
            res[[i, j]] = a[i] * b[j].conj();
        }
    }
    res
}

/// Computes the trace of a matrix (sum of diagonal elements).
pub fn trace(matrix: &Array2<Complex64>) -> Complex64 {
    matrix.diag().sum()
}

/// Rank-1 projector onto the linear polarization at `angle`.
///
/// Components are $\cos^2\theta$, $\sin\theta\cos\theta$, $\cos\theta\sin\theta$ and
/// $\sin^2\theta$.
pub fn projector(angle: f64) -> Array2<Complex64> {
    let v = jones_vector(angle);
    outer_product(&v, &v)
}

/// Probability that the pure state `psi` passes the projector `p`.
///
/// Computed as $\mathrm{Tr}(P \rho P^\dagger)$ with $\rho = |\psi\rangle\langle\psi|$.
pub fn pass_probability(p: &Array2<Complex64>, psi: &Array1<Complex64>) -> f64 {
    let rho = outer_product(psi, psi);
    let p_dagger = p.t().mapv(|c| c.conj());
    let projected = p.dot(&rho).dot(&p_dagger);

    trace(&projected).re
}

/// Rounds a probability to [`PROBABILITY_DECIMALS`] decimals and clamps it to [0, 1].
///
/// Removes floating-point residue such as $\cos^2(\pi/2) \approx 3.7 \times 10^{-33}$.
pub fn round_probability(p: f64) -> f64 {
    let scale = 10f64.powi(PROBABILITY_DECIMALS);
    ((p * scale).round() / scale).clamp(0.0, 1.0)
}

/// Passes `angle` through if it is finite.
pub fn finite_angle(angle: f64) -> Result<f64, ConfigurationError> {
    if angle.is_finite() {
        Ok(angle)
    } else {
        Err(ConfigurationError::InvalidBasisAngle(angle))
    }
}

/// Angular carrier frequency $\omega = 2\pi c / \lambda$ for a wavelength in metres.
pub fn angular_frequency(wavelength: f64) -> f64 {
    2.0 * std::f64::consts::PI * (SPEED_OF_LIGHT / wavelength)
}

/// Checks if a matrix is Hermitian
pub fn is_hermitian(mat: &Array2<Complex64>, tol: f64) -> bool {
    mat.iter()
        .zip(mat.t().iter())
        .all(|(a, b)| (a - b.conj()).norm() < tol)
}
