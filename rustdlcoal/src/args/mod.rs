use std::{fs, path::PathBuf};

use anyhow::{Context, Result};
use structopt::StructOpt;

pub mod config;
pub mod parse;

#[derive(Debug, StructOpt)]
#[allow(clippy::module_name_repetitions)]
pub enum RustdlcoalArgs {
    /// Samples gene trees inside a species tree and optionally scores them
    Simulate(CommandArgs),
    /// Samples one gene tree inside a species tree and scores its topology
    Score(CommandArgs),
}

#[derive(Debug, StructOpt)]
#[allow(clippy::module_name_repetitions)]
pub struct CommandArgs {
    /// Path to the RON configuration file
    #[structopt(parse(from_os_str))]
    pub config: PathBuf,
    /// Log per-draw details (-v) or per-branch details (-vv)
    #[structopt(short, long, parse(from_occurrences))]
    pub verbose: u8,
}

impl CommandArgs {
    pub fn read_config(&self) -> Result<String> {
        fs::read_to_string(&self.config)
            .with_context(|| format!("Failed to read the configuration file {:?}.", self.config))
    }
}
