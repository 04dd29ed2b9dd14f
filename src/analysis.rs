//! Correlation analysis between two observers' recordings.
//!
//! After a run, the observers publicly compare their polarizer angles (never their
//! outcomes). Trials measured with the same angle form the shared key. Trials measured
//! with other angle differences are compared against the quantum prediction
//! $\cos(2\Delta)$; a large average deviation means someone disturbed the channel.
//!
//! The check is a heuristic stand-in for a Bell (CHSH) test, not a rigorous one.

use crate::core::Outcome;
use crate::core::errors::{AnalysisError, ConfigurationError};
use crate::observer::Recording;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Mean deviation from theory above which eavesdropping is suspected.
pub const DEFAULT_DETECTION_THRESHOLD: f64 = 0.1;

/// Key material agreed by two observers on same-basis trials.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SharedKey {
    /// The key as held by the first observer.
    pub key: Vec<Outcome>,
    /// The same trials as seen by the second observer.
    pub partner_key: Vec<Outcome>,
    /// Pearson correlation between the two sides.
    pub correlation: f64,
}

impl SharedKey {
    /// Number of trials where both observers used the same basis.
    pub fn sifted_length(&self) -> usize {
        self.key.len()
    }

    /// Number of positions where the two sides disagree.
    pub fn errors(&self) -> usize {
        self.key
            .iter()
            .zip(&self.partner_key)
            .filter(|(a, b)| a != b)
            .count()
    }

    /// Quantum Bit Error Rate in percentage.
    pub fn qber(&self) -> f64 {
        if self.key.is_empty() {
            0.0
        } else {
            (self.errors() as f64 / self.key.len() as f64) * 100.0
        }
    }
}

/// Correlation measured at one basis-angle difference.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CorrelationSample {
    pub angle_diff: f64,
    pub correlation: f64,
    pub theory: f64,
    pub deviation: f64,
}

/// Outcome of the eavesdropping test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EavesdroppingReport {
    /// One entry per tested angle difference, in the order given.
    pub samples: Vec<CorrelationSample>,
    pub mean_deviation: f64,
    pub threshold: f64,
    pub suspected: bool,
}

/// Compares two index-aligned recordings taken on the same stream of trials.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CorrelationAnalyzer {
    threshold: f64,
}

impl Default for CorrelationAnalyzer {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_DETECTION_THRESHOLD,
        }
    }
}

impl CorrelationAnalyzer {
    /// Creates an analyzer flagging eavesdropping above `threshold` mean deviation.
    pub fn new(threshold: f64) -> Result<Self, ConfigurationError> {
        if !threshold.is_finite() || threshold < 0.0 {
            return Err(ConfigurationError::InvalidThreshold(threshold));
        }
        Ok(Self { threshold })
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Keeps the trials where the two polarizer angles differ by exactly `target_diff`.
    ///
    /// Angles are compared with exact floating-point equality, so both recordings must
    /// draw their angles from the same vocabulary (computed the same way).
    pub fn filter_by_basis_difference(
        &self,
        a: &Recording,
        b: &Recording,
        target_diff: f64,
    ) -> Result<(Vec<Outcome>, Vec<Outcome>), AnalysisError> {
        if a.len() != b.len() {
            return Err(AnalysisError::LengthMismatch {
                left: a.len(),
                right: b.len(),
            });
        }

        let (sub_a, sub_b): (Vec<Outcome>, Vec<Outcome>) = a
            .angles()
            .iter()
            .zip(b.angles())
            .zip(a.outcomes().iter().zip(b.outcomes()))
            .filter(|((angle_a, angle_b), _)| (*angle_a - *angle_b).abs() == target_diff)
            .map(|(_, (&out_a, &out_b))| (out_a, out_b))
            .unzip();

        Ok((sub_a, sub_b))
    }

    /// Pearson correlation coefficient of two outcome sequences.
    pub fn compute_correlation(
        &self,
        sub_a: &[Outcome],
        sub_b: &[Outcome],
    ) -> Result<f64, AnalysisError> {
        if sub_a.len() != sub_b.len() {
            return Err(AnalysisError::LengthMismatch {
                left: sub_a.len(),
                right: sub_b.len(),
            });
        }
        let n = sub_a.len();
        if n < 2 {
            return Err(AnalysisError::InsufficientSample { matched: n });
        }

        let mean = |xs: &[Outcome]| xs.iter().map(|&x| f64::from(x)).sum::<f64>() / n as f64;
        let mean_a = mean(sub_a);
        let mean_b = mean(sub_b);

        let mut cov = 0.0;
        let mut var_a = 0.0;
        let mut var_b = 0.0;
        for (&x, &y) in sub_a.iter().zip(sub_b) {
            let dx = f64::from(x) - mean_a;
            let dy = f64::from(y) - mean_b;
            cov += dx * dy;
            var_a += dx * dx;
            var_b += dy * dy;
        }

        if var_a == 0.0 || var_b == 0.0 {
            return Err(AnalysisError::DegenerateSample);
        }

        Ok((cov / (var_a.sqrt() * var_b.sqrt())).clamp(-1.0, 1.0))
    }

    /// Quantum-mechanical prediction $\cos(2\Delta)$ for polarizers `target_diff` apart.
    pub fn theoretical_correlation(target_diff: f64) -> f64 {
        (2.0 * target_diff).cos()
    }

    /// Absolute gap between measured and predicted correlation at `target_diff`.
    pub fn deviation_from_theory(
        &self,
        a: &Recording,
        b: &Recording,
        target_diff: f64,
    ) -> Result<f64, AnalysisError> {
        Ok(self.sample(a, b, target_diff)?.deviation)
    }

    fn sample(
        &self,
        a: &Recording,
        b: &Recording,
        target_diff: f64,
    ) -> Result<CorrelationSample, AnalysisError> {
        let (sub_a, sub_b) = self.filter_by_basis_difference(a, b, target_diff)?;
        let correlation = self.compute_correlation(&sub_a, &sub_b)?;
        let theory = Self::theoretical_correlation(target_diff);

        Ok(CorrelationSample {
            angle_diff: target_diff,
            correlation,
            theory,
            deviation: (correlation - theory).abs(),
        })
    }

    /// Averages the deviation from theory over `test_diffs` and compares it to the
    /// threshold.
    pub fn detect_eavesdropping(
        &self,
        a: &Recording,
        b: &Recording,
        test_diffs: &[f64],
    ) -> Result<EavesdroppingReport, AnalysisError> {
        if test_diffs.is_empty() {
            return Err(AnalysisError::NoTestAngles);
        }

        let samples = test_diffs
            .iter()
            .map(|&diff| self.sample(a, b, diff))
            .collect::<Result<Vec<_>, _>>()?;

        let mean_deviation =
            samples.iter().map(|s| s.deviation).sum::<f64>() / samples.len() as f64;
        let suspected = mean_deviation > self.threshold;

        if suspected {
            warn!(
                mean_deviation,
                threshold = self.threshold,
                "correlations deviate from theory, someone is eavesdropping"
            );
        } else {
            debug!(mean_deviation, threshold = self.threshold, "channel looks clean");
        }

        Ok(EavesdroppingReport {
            samples,
            mean_deviation,
            threshold: self.threshold,
            suspected,
        })
    }

    /// Sifts the same-basis trials into a shared key.
    pub fn extract_shared_key(
        &self,
        a: &Recording,
        b: &Recording,
    ) -> Result<SharedKey, AnalysisError> {
        let (key, partner_key) = self.filter_by_basis_difference(a, b, 0.0)?;
        let correlation = self.compute_correlation(&key, &partner_key)?;

        Ok(SharedKey {
            key,
            partner_key,
            correlation,
        })
    }
}
