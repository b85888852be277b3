//! Arithmetic on probabilities stored as natural logarithms.

/// `ln(n!)`, summed exactly for the small counts that occur in
/// lineage bookkeeping.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn ln_factorial(n: usize) -> f64 {
    (2..=n).map(|i| (i as f64).ln()).sum()
}

/// `ln(n choose k)`, `-inf` if `k > n`.
#[must_use]
pub fn ln_choose(n: usize, k: usize) -> f64 {
    if k > n {
        return f64::NEG_INFINITY;
    }

    ln_factorial(n) - ln_factorial(k) - ln_factorial(n - k)
}

/// `ln(e^a + e^b)` without leaving log space.
#[must_use]
pub fn log_add(a: f64, b: f64) -> f64 {
    let (hi, lo) = if a >= b { (a, b) } else { (b, a) };

    if hi == f64::NEG_INFINITY {
        return f64::NEG_INFINITY;
    }
    if hi == f64::INFINITY {
        return f64::INFINITY;
    }

    hi + (lo - hi).exp().ln_1p()
}

/// `ln(e^a - e^b)` for `a >= b`, `NaN` otherwise.
#[must_use]
pub fn log_sub(a: f64, b: f64) -> f64 {
    if b == f64::NEG_INFINITY {
        return a;
    }
    if a < b {
        return f64::NAN;
    }

    a + (-(b - a).exp_m1()).ln()
}

/// `ln(sum_i e^{x_i})`, `-inf` for an empty iterator.
#[must_use]
pub fn log_sum_exp<I: IntoIterator<Item = f64>>(values: I) -> f64 {
    let values: Vec<f64> = values.into_iter().collect();

    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    if !max.is_finite() {
        return max;
    }

    max + values.iter().map(|x| (x - max).exp()).sum::<f64>().ln()
}
