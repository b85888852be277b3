//! Kingman coalescent combinatorics.

use contracts::debug_requires;

use crate::log_space::{ln_choose, ln_factorial};

/// Probability that `a` lineages coalesce down to exactly `b` lineages
/// within time `t` in a population of (haploid) size `n`.
///
/// This is Tavaré's (1984) alternating sum over the pure-death process of
/// lineage counts. The result is clamped to `[0, 1]` as the alternating
/// terms lose precision for large `a`.
#[must_use]
#[debug_requires(t >= 0.0, "branch length is non-negative")]
#[debug_requires(n > 0.0, "population size is positive")]
#[allow(clippy::cast_precision_loss)]
pub fn prob_coal_counts(a: usize, b: usize, t: f64, n: f64) -> f64 {
    if b > a {
        return 0.0;
    }
    if b == 0 {
        return if a == 0 { 1.0 } else { 0.0 };
    }
    if a == b && a == 1 {
        return 1.0;
    }
    if t == 0.0 {
        return if a == b { 1.0 } else { 0.0 };
    }
    if t == f64::INFINITY {
        return if b == 1 { 1.0 } else { 0.0 };
    }

    let (af, bf) = (a as f64, b as f64);

    // Product over y < k of (b + y)(a - y) / (a + y), starting at k = b
    let mut product: f64 = (0..b)
        .map(|y| {
            let y = y as f64;
            (bf + y) * (af - y) / (af + y)
        })
        .product();

    let mut sum = 0.0;

    for k in b..=a {
        if k > b {
            let y = (k - 1) as f64;
            product *= (bf + y) * (af - y) / (af + y);
        }

        let kf = k as f64;
        let sign = if (k - b) % 2 == 0 { 1.0 } else { -1.0 };

        let ln_weight = -kf * (kf - 1.0) * t / (2.0 * n) + (2.0 * kf - 1.0).ln()
            - ln_factorial(b)
            - ln_factorial(k - b)
            - (bf + kf - 1.0).ln();

        sum += sign * ln_weight.exp() * product;
    }

    sum.clamp(0.0, 1.0)
}

/// `ln H(u, v)`, the log number of labelled merge histories that take `u`
/// lineages down to `v`, i.e. `ln prod_{i = v+1}^{u} C(i, 2)`.
#[must_use]
pub fn ln_num_labeled_histories(u: usize, v: usize) -> f64 {
    if v >= u {
        return 0.0;
    }

    ((v + 1)..=u).map(|i| ln_choose(i, 2)).sum()
}

/// Rate `k (k - 1) / (2 n)` of the next coalescence among `k` lineages.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn coalescence_rate(k: usize, n: f64) -> f64 {
    if k < 2 {
        return 0.0;
    }

    (k as f64) * ((k - 1) as f64) / (2.0 * n)
}
