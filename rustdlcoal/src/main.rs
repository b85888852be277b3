#![deny(clippy::pedantic)]

#[macro_use]
extern crate log;

use anyhow::Result;
use log::LevelFilter;
use structopt::StructOpt;

mod args;
mod cli;
mod minimal_logger;

use crate::{
    args::{CommandArgs, RustdlcoalArgs},
    minimal_logger::MinimalLogger,
};

static MINIMAL_LOGGER: MinimalLogger = MinimalLogger;

fn main() -> Result<()> {
    // Set up the minimal logger to stdout/stderr
    log::set_logger(&MINIMAL_LOGGER)?;
    log::set_max_level(LevelFilter::Info);

    let args = RustdlcoalArgs::from_args();

    let verbosity = |command: &CommandArgs| {
        log::set_max_level(match command.verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        });
    };

    match args {
        RustdlcoalArgs::Simulate(simulate_args) => {
            verbosity(&simulate_args);

            cli::simulate::simulate_with_logger(simulate_args)
        },
        RustdlcoalArgs::Score(score_args) => {
            verbosity(&score_args);

            cli::score::score_with_logger(score_args)
        },
    }
}
