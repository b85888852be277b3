#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod birth_death;
pub mod coalescent;
pub mod estimate;
pub mod joint;

mod error;
pub use error::ProbabilityError;

#[cfg(test)]
mod test_utils;
