pub mod rng;
pub use rng::{RngCore, SeedableRng, SplittableRng};

pub mod distribution;
pub use distribution::{Distribution, SampledDistribution, Samples};
