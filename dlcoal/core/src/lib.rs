#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

#[macro_use]
extern crate contracts;

pub mod cogs;
pub mod locus;
pub mod reconciliation;
pub mod tree;
