use anyhow::{Context, Result};

use dlcoal_algorithms_sampling::pipeline::sample_dlcoal;
use dlcoal_core::cogs::SeedableRng;
use dlcoal_impls_std::cogs::rng::chacha::ChaCha;

use crate::args::{config::SimulateArgs, parse::try_parse, CommandArgs};

use super::{log_draw, log_scores, Model};

#[allow(clippy::module_name_repetitions)]
pub fn simulate_with_logger(command_args: CommandArgs) -> Result<()> {
    let config = command_args.read_config()?;

    let simulate_args: SimulateArgs = try_parse("simulate", &config)?;
    info!("Parsed simulation arguments:\n{:#?}", simulate_args);

    let species_tree = simulate_args
        .species
        .build()
        .context("Failed to build the species tree.")?;

    let seed = simulate_args.rng.seed()?;
    info!("Seeding the generator with {}.", seed);

    let mut rng = ChaCha::seed_from_u64(seed);

    let model = Model {
        species_tree: &species_tree,
        population: simulate_args.population,
        duplication: simulate_args.duplication,
        loss: simulate_args.loss,
    };

    info!("Starting {} draws ...", simulate_args.draws);

    for draw in 1..=simulate_args.draws.get() {
        let (coal_tree, extra) = sample_dlcoal(
            &species_tree,
            model.population,
            model.duplication,
            model.loss,
            &simulate_args.sample,
            &mut rng,
        )
        .with_context(|| format!("Failed to sample draw {}.", draw))?;

        log_draw(draw, &coal_tree, &extra);

        if let Some(options) = &simulate_args.score {
            log_scores(draw, &model, &coal_tree, &extra, options, &mut rng)?;
        }
    }

    info!("Finished all {} draws.", simulate_args.draws);

    Ok(())
}
