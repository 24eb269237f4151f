//! Confidence intervals for round and ablation scores

use serde::{Deserialize, Serialize};

/// Sample size at which the normal approximation takes over
pub const LARGE_SAMPLE_THRESHOLD: usize = 30;

/// Critical value used for large samples and unrecognized confidence levels
pub const DEFAULT_CRITICAL_VALUE: f64 = 1.96;

/// Mean with a symmetric confidence interval
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ConfidenceInterval {
    pub mean: f64,
    pub lower: f64,
    pub upper: f64,
}

impl ConfidenceInterval {
    pub fn width(&self) -> f64 {
        self.upper - self.lower
    }
}

/// Fixed critical values for small samples. This is a coarse lookup, not a
/// t-table.
fn small_sample_critical_value(confidence: f64) -> f64 {
    const TABLE: [(f64, f64); 3] = [(0.90, 1.645), (0.95, 1.96), (0.99, 2.576)];

    TABLE
        .iter()
        .find(|(level, _)| (level - confidence).abs() < 1e-9)
        .map(|(_, value)| *value)
        .unwrap_or(DEFAULT_CRITICAL_VALUE)
}

/// Compute the mean and confidence interval of `scores`.
///
/// - empty input gives all zeros
/// - a single value collapses the interval onto it
/// - below [`LARGE_SAMPLE_THRESHOLD`] the critical value comes from a lookup
///   for 0.90 / 0.95 / 0.99 (1.96 otherwise)
/// - at or above the threshold 1.96 is used whatever `confidence` is
pub fn confidence_interval(scores: &[f64], confidence: f64) -> ConfidenceInterval {
    if scores.is_empty() {
        return ConfidenceInterval::default();
    }

    let n = scores.len() as f64;
    let mean = scores.iter().sum::<f64>() / n;

    if scores.len() == 1 {
        return ConfidenceInterval {
            mean,
            lower: mean,
            upper: mean,
        };
    }

    let variance = scores.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / (n - 1.0);
    let std_dev = variance.sqrt();

    let critical = if scores.len() < LARGE_SAMPLE_THRESHOLD {
        small_sample_critical_value(confidence)
    } else {
        DEFAULT_CRITICAL_VALUE
    };

    let margin = critical * (std_dev / n.sqrt());

    ConfidenceInterval {
        mean,
        lower: mean - margin,
        upper: mean + margin,
    }
}
