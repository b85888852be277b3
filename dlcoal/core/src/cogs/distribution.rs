use core::num::NonZeroUsize;

use dlcoal_core_bond::{ClosedUnitF64, NonNegativeF64, PositiveF64};

use crate::cogs::RngCore;

pub trait Distribution {
    type Parameters;
    type Sample;
}

#[allow(clippy::module_name_repetitions)]
pub trait SampledDistribution: Distribution {
    fn sample_with<R: Samples<Self>>(rng: &mut R, params: Self::Parameters) -> Self::Sample;

    fn sample<R: Samples<Self>>(rng: &mut R) -> Self::Sample
    where
        Self: Distribution<Parameters = ()>,
    {
        Self::sample_with(rng, ())
    }
}

impl<D: Distribution> SampledDistribution for D {
    fn sample_with<R: Samples<Self>>(rng: &mut R, params: Self::Parameters) -> Self::Sample {
        <R as Samples<Self>>::sample_with(rng, params)
    }
}

pub trait Samples<D: Distribution + ?Sized>: RngCore {
    #[must_use]
    fn sample_with(&mut self, params: D::Parameters) -> D::Sample;
}

/// `U[0, 1)`
pub enum UniformClosedOpenUnit {}

impl Distribution for UniformClosedOpenUnit {
    type Parameters = ();
    type Sample = f64;
}

impl<R: RngCore> Samples<UniformClosedOpenUnit> for R {
    #[allow(clippy::cast_precision_loss)]
    fn sample_with(&mut self, _params: ()) -> f64 {
        // 53 random mantissa bits
        ((self.sample_u64() >> 11) as f64) * f64::from_bits(0x3CA0_0000_0000_0000_u64)
    }
}

/// `U(0, 1]`
pub enum UniformOpenClosedUnit {}

impl Distribution for UniformOpenClosedUnit {
    type Parameters = ();
    type Sample = f64;
}

impl<R: RngCore> Samples<UniformOpenClosedUnit> for R {
    #[allow(clippy::cast_precision_loss)]
    fn sample_with(&mut self, _params: ()) -> f64 {
        (((self.sample_u64() >> 11) + 1) as f64) * f64::from_bits(0x3CA0_0000_0000_0000_u64)
    }
}

pub struct Length<T>(pub T);

pub enum IndexUsize {}

impl Distribution for IndexUsize {
    type Parameters = Length<NonZeroUsize>;
    type Sample = usize;
}

impl<R: RngCore> Samples<IndexUsize> for R {
    #[allow(clippy::cast_precision_loss)]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn sample_with(&mut self, Length(length): Length<NonZeroUsize>) -> usize {
        let u01 = UniformClosedOpenUnit::sample(self);

        let index = (u01 * (length.get() as f64)).floor() as usize;

        // Ensure index < length despite usize->f64->usize precision loss
        index.min(length.get() - 1)
    }
}

pub struct Lambda(pub PositiveF64);

pub enum Exponential {}

impl Distribution for Exponential {
    type Parameters = Lambda;
    type Sample = NonNegativeF64;
}

impl<R: RngCore> Samples<Exponential> for R {
    fn sample_with(&mut self, Lambda(lambda): Lambda) -> NonNegativeF64 {
        let u01 = UniformOpenClosedUnit::sample(self);

        // Inverse transform sample: X = -ln(U(0,1]) / lambda
        NonNegativeF64::new(-u01.ln() / lambda.get()).unwrap_or_else(|_| NonNegativeF64::zero())
    }
}

pub enum Bernoulli {}

impl Distribution for Bernoulli {
    type Parameters = ClosedUnitF64;
    type Sample = bool;
}

impl<R: RngCore> Samples<Bernoulli> for R {
    fn sample_with(&mut self, probability: ClosedUnitF64) -> bool {
        UniformClosedOpenUnit::sample(self) < probability.get()
    }
}
