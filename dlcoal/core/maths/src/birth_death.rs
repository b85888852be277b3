//! Kendall's (1948) linear birth-death process, started from one lineage.

use contracts::debug_requires;

use crate::log_space::ln_choose;

/// Relative tolerance below which birth and death rates are treated as equal.
const CRITICAL_TOLERANCE: f64 = 1e-12;

/// The two coefficients of the geometric lineage-count distribution after
/// time `t`: `P(N = 0) = p0` and `P(N = k) = (1 - p0)(1 - u) u^{k-1}`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KendallCoefficients {
    pub p0: f64,
    pub u: f64,
}

impl KendallCoefficients {
    #[must_use]
    #[debug_requires(t >= 0.0 && birth >= 0.0 && death >= 0.0)]
    pub fn new(t: f64, birth: f64, death: f64) -> Self {
        if t == 0.0 || (birth == 0.0 && death == 0.0) {
            return Self { p0: 0.0, u: 0.0 };
        }

        let r = birth - death;

        if r.abs() <= CRITICAL_TOLERANCE * birth.max(death) {
            let a = birth * t / (1.0 + birth * t);

            return Self { p0: a, u: a };
        }

        let (numerator, denominator) = if r > 0.0 {
            // 1 - e^{-rt} and lambda - mu e^{-rt}
            let one_minus_e = -(-r * t).exp_m1();

            (one_minus_e, r + death * one_minus_e)
        } else {
            // Multiplied through by e^{rt} to keep both terms finite
            let f_minus_one = (r * t).exp_m1();

            (f_minus_one, birth * f_minus_one + r)
        };

        if !numerator.is_finite() || !denominator.is_finite() {
            // Only reachable with infinite t
            return if r > 0.0 {
                Self {
                    p0: death / birth,
                    u: 1.0,
                }
            } else {
                Self { p0: 1.0, u: 0.0 }
            };
        }

        Self {
            p0: (death * numerator / denominator).clamp(0.0, 1.0),
            u: (birth * numerator / denominator).clamp(0.0, 1.0),
        }
    }

    /// `ln P(N = k)`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn ln_prob_count(&self, k: usize) -> f64 {
        match k {
            0 => self.p0.ln(),
            1 => (-self.p0).ln_1p() + (-self.u).ln_1p(),
            _ => (-self.p0).ln_1p() + (-self.u).ln_1p() + ((k - 1) as f64) * self.u.ln(),
        }
    }

    /// Probability that none of the lineages alive after time `t` survive,
    /// given each of them independently goes extinct with probability `doom`.
    #[must_use]
    #[debug_requires((0.0..=1.0).contains(&doom))]
    pub fn prob_extinct(&self, doom: f64) -> f64 {
        if doom == 0.0 {
            return self.p0;
        }

        let tail = (1.0 - self.p0) * (1.0 - self.u) * doom / (1.0 - self.u * doom);

        (self.p0 + tail).clamp(0.0, 1.0)
    }

    /// `ln` of the probability that exactly one of the lineages alive after
    /// time `t` survives, given each of them independently goes extinct with
    /// probability `doom`.
    #[must_use]
    #[debug_requires((0.0..=1.0).contains(&doom))]
    pub fn ln_prob_single_survivor(&self, doom: f64) -> f64 {
        (-self.p0).ln_1p() + (-self.u).ln_1p() + (-doom).ln_1p()
            - 2.0 * (-self.u * doom).ln_1p()
    }

    /// `ln sum_{i=0}^{max_doomed} C(b + i, i) P(N = b + i) doom^i`, the
    /// probability that exactly `b` of the lineages survive, where up to
    /// `max_doomed` further lineages may each be doomed with probability
    /// `doom`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn ln_prob_surviving(&self, b: usize, doom: f64, max_doomed: usize) -> f64 {
        if doom == 0.0 {
            return self.ln_prob_count(b);
        }

        let ln_doom = doom.ln();

        crate::log_space::log_sum_exp(
            (0..=max_doomed)
                .map(|i| ln_choose(b + i, i) + self.ln_prob_count(b + i) + (i as f64) * ln_doom),
        )
    }
}

/// Composite Simpson quadrature of `f` over `[a, b]` with `intervals` (even)
/// subintervals.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn simpson<F: Fn(f64) -> f64>(f: F, a: f64, b: f64, intervals: usize) -> f64 {
    let intervals = (intervals.max(2) + 1) & !1;

    if b <= a {
        return 0.0;
    }

    let h = (b - a) / (intervals as f64);

    let inner: f64 = (1..intervals)
        .map(|i| {
            let weight = if i % 2 == 1 { 4.0 } else { 2.0 };
            weight * f(a + (i as f64) * h)
        })
        .sum();

    (f(a) + inner + f(b)) * h / 3.0
}
