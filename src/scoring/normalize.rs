//! Population normalization.
//!
//! Places a raw score within a reference sample of earlier raw scores as a
//! z-score and a percentile. The percentile assumes the sample is roughly
//! normal: `100 * Φ(z)` with Φ computed through the error function.
//!
//! A sample too small or too uniform to estimate a spread (fewer than two
//! finite values, or zero standard deviation) yields the neutral `z = 0`,
//! `percentile = 50` instead of an error.

use serde::{Deserialize, Serialize};
use statrs::function::erf::erf;
use statrs::statistics::Statistics;

/// Neutral z-score reported when normalization is unavailable.
pub const NEUTRAL_Z_SCORE: f64 = 0.0;

/// Neutral percentile reported when normalization is unavailable.
pub const NEUTRAL_PERCENTILE: f64 = 50.0;

/// Where a raw score sits within a reference population.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Normalization {
    pub z_score: f64,
    pub percentile: f64,
    /// Finite values actually used from the sample
    pub sample_size: usize,
    /// False when the neutral default was substituted
    pub available: bool,
}

impl Normalization {
    fn neutral(sample_size: usize) -> Self {
        Self {
            z_score: NEUTRAL_Z_SCORE,
            percentile: NEUTRAL_PERCENTILE,
            sample_size,
            available: false,
        }
    }
}

/// Normalize `raw_score` against `sample`. Non-finite sample entries are ignored.
pub fn normalize(raw_score: f64, sample: &[f64]) -> Normalization {
    let values: Vec<f64> = sample.iter().copied().filter(|v| v.is_finite()).collect();
    if values.len() < 2 {
        return Normalization::neutral(values.len());
    }

    let mean = values.iter().mean();
    let std_dev = values.iter().std_dev();
    if !std_dev.is_finite() || std_dev <= 0.0 {
        return Normalization::neutral(values.len());
    }

    let z_score = (raw_score - mean) / std_dev;
    let percentile = (100.0 * standard_normal_cdf(z_score)).clamp(0.0, 100.0);

    Normalization {
        z_score: round2(z_score),
        percentile: round2(percentile),
        sample_size: values.len(),
        available: true,
    }
}

/// Φ(z) for the standard normal distribution.
pub fn standard_normal_cdf(z: f64) -> f64 {
    0.5 * (1.0 + erf(z / std::f64::consts::SQRT_2))
}

/// Round to two decimal places.
pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
