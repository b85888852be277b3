//! Monte-Carlo estimates accumulated in log space.

use dlcoal_core_maths::{log_add, log_sub};

/// Relative standard error above which an estimate is considered unreliable
const MAX_RELATIVE_STD_ERROR: f64 = 0.1;
/// Effective sample size below which an estimate is considered unreliable
const MIN_EFFECTIVE_SAMPLE_SIZE: f64 = 10.0;
/// Rounding slack of the effective sample size, which is computed in log
/// space
const EFFECTIVE_SAMPLE_SIZE_SLACK: f64 = 1e-9;

/// A log-probability together with a summary of its Monte-Carlo error
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Estimate {
    pub log_prob: f64,
    /// Number of Monte-Carlo draws, zero if the value is exact
    pub nsamples: u64,
    /// Kish's effective sample size of the importance weights
    pub effective_sample_size: f64,
    /// Standard error of the probability relative to its estimate
    pub relative_std_error: f64,
}

impl Estimate {
    #[must_use]
    pub fn exact(log_prob: f64) -> Self {
        Self {
            log_prob,
            nsamples: 0,
            effective_sample_size: f64::INFINITY,
            relative_std_error: 0.0,
        }
    }

    /// Whether the Monte-Carlo error is too large to trust the estimate.
    ///
    /// Such estimates are still returned, callers may retry with more
    /// samples.
    #[must_use]
    pub fn is_low_confidence(&self) -> bool {
        self.nsamples > 0
            && (self.relative_std_error.is_nan()
                || self.relative_std_error > MAX_RELATIVE_STD_ERROR
                || self.effective_sample_size
                    < MIN_EFFECTIVE_SAMPLE_SIZE * (1.0 - EFFECTIVE_SAMPLE_SIZE_SLACK))
    }
}

/// Associative accumulator of importance-weighted samples, where each
/// sample contributes its value `x = w f` and its weight `w`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LogSampleSum {
    ln_sum: f64,
    ln_sum_squares: f64,
    ln_weights: f64,
    ln_weight_squares: f64,
    count: u64,
}

impl Default for LogSampleSum {
    fn default() -> Self {
        Self {
            ln_sum: f64::NEG_INFINITY,
            ln_sum_squares: f64::NEG_INFINITY,
            ln_weights: f64::NEG_INFINITY,
            ln_weight_squares: f64::NEG_INFINITY,
            count: 0,
        }
    }
}

impl LogSampleSum {
    #[must_use]
    pub fn single(ln_value: f64, ln_weight: f64) -> Self {
        Self {
            ln_sum: ln_value,
            ln_sum_squares: 2.0 * ln_value,
            ln_weights: ln_weight,
            ln_weight_squares: 2.0 * ln_weight,
            count: 1,
        }
    }

    #[must_use]
    pub fn combine(self, other: Self) -> Self {
        Self {
            ln_sum: log_add(self.ln_sum, other.ln_sum),
            ln_sum_squares: log_add(self.ln_sum_squares, other.ln_sum_squares),
            ln_weights: log_add(self.ln_weights, other.ln_weights),
            ln_weight_squares: log_add(self.ln_weight_squares, other.ln_weight_squares),
            count: self.count + other.count,
        }
    }

    #[must_use]
    pub fn count(&self) -> u64 {
        self.count
    }

    /// `ln` of the sample mean, with its relative standard error and the
    /// effective sample size of the weights
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn estimate(&self) -> Estimate {
        if self.count == 0 {
            return Estimate {
                log_prob: f64::NEG_INFINITY,
                nsamples: 0,
                effective_sample_size: 0.0,
                relative_std_error: f64::NAN,
            };
        }

        let ln_count = (self.count as f64).ln();
        let ln_mean = self.ln_sum - ln_count;

        // Var(x) / mean(x)^2 = N sum(x^2) / sum(x)^2 - 1
        let relative_std_error = if self.ln_sum == f64::NEG_INFINITY {
            f64::NAN
        } else {
            let ln_ratio = ln_count + self.ln_sum_squares - 2.0 * self.ln_sum;
            let ln_excess = log_sub(ln_ratio, 0.0);

            if ln_excess.is_nan() {
                0.0
            } else {
                (ln_excess - ln_count).exp().sqrt()
            }
        };

        let effective_sample_size = if self.ln_weights == f64::NEG_INFINITY {
            0.0
        } else {
            (2.0 * self.ln_weights - self.ln_weight_squares).exp()
        };

        Estimate {
            log_prob: ln_mean,
            nsamples: self.count,
            effective_sample_size,
            relative_std_error,
        }
    }
}
