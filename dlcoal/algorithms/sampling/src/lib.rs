#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod birth_death;
pub mod coalescent;
pub mod pipeline;

mod error;
pub use error::SamplingError;
