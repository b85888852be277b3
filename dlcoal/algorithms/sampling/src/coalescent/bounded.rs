//! Waiting times of a coalescent that is conditioned to have merged all of
//! its lineages into one before a deadline.

use dlcoal_core::cogs::{distribution::UniformOpenClosedUnit, RngCore, SampledDistribution};
use dlcoal_core_maths::coalescent::{coalescence_rate, prob_coal_counts};

/// Resolution of the tabulated inverse CDF
const GRID_POINTS: usize = 128;

/// Samples the time until the next of `k >= 2` lineages coalesce, given that
/// all of them must have coalesced into one within `remaining` time.
#[allow(clippy::cast_precision_loss)]
pub fn sample_bounded_wait<G: RngCore>(k: usize, remaining: f64, n: f64, rng: &mut G) -> f64 {
    if remaining <= 0.0 {
        return 0.0;
    }

    let rate = coalescence_rate(k, n);
    let u01 = UniformOpenClosedUnit::sample(rng);

    if k == 2 {
        // Exponential truncated to (0, remaining)
        let wait = -(u01 * (-rate * remaining).exp_m1()).ln_1p() / rate;

        return wait.clamp(0.0, remaining);
    }

    // Unnormalised density of the next wait s:
    //  rate e^{-rate s} P(k - 1 lineages coalesce within remaining - s)
    let step = remaining / (GRID_POINTS as f64);
    let density =
        |s: f64| (-rate * s).exp() * prob_coal_counts(k - 1, 1, (remaining - s).max(0.0), n);

    let mut cumulative = Vec::with_capacity(GRID_POINTS + 1);
    cumulative.push(0.0);

    let mut previous = density(0.0);
    for i in 1..=GRID_POINTS {
        let current = density((i as f64) * step);
        let area = cumulative[i - 1] + 0.5 * (previous + current) * step;

        cumulative.push(area);
        previous = current;
    }

    let total = cumulative[GRID_POINTS];

    if !(total > 0.0 && total.is_finite()) {
        // The deadline is so tight that the density underflows, so the
        // remaining k - 1 merges are spread evenly
        return u01 * remaining / ((k - 1) as f64);
    }

    let target = u01 * total;
    let bin = cumulative
        .partition_point(|area| *area < target)
        .clamp(1, GRID_POINTS);

    let (lower, upper) = (cumulative[bin - 1], cumulative[bin]);
    let fraction = if upper > lower {
        (target - lower) / (upper - lower)
    } else {
        0.5
    };

    (((bin - 1) as f64 + fraction) * step).clamp(0.0, remaining)
}
