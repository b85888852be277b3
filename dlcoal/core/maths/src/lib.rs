#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod birth_death;
pub mod coalescent;
pub mod log_space;

pub use log_space::{ln_choose, ln_factorial, log_add, log_sub, log_sum_exp};
