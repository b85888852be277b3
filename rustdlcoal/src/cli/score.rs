use anyhow::{Context, Result};

use dlcoal_algorithms_sampling::pipeline::sample_dlcoal;
use dlcoal_core::cogs::SeedableRng;
use dlcoal_impls_std::cogs::rng::chacha::ChaCha;

use crate::args::{config::ScoreArgs, parse::try_parse, CommandArgs};

use super::{log_draw, log_scores, Model};

#[allow(clippy::module_name_repetitions)]
pub fn score_with_logger(command_args: CommandArgs) -> Result<()> {
    let config = command_args.read_config()?;

    let score_args: ScoreArgs = try_parse("score", &config)?;
    info!("Parsed scoring arguments:\n{:#?}", score_args);

    let species_tree = score_args
        .species
        .build()
        .context("Failed to build the species tree.")?;

    let seed = score_args.rng.seed()?;
    info!("Seeding the generator with {}.", seed);

    let mut rng = ChaCha::seed_from_u64(seed);

    let model = Model {
        species_tree: &species_tree,
        population: score_args.population,
        duplication: score_args.duplication,
        loss: score_args.loss,
    };

    let (coal_tree, extra) = sample_dlcoal(
        &species_tree,
        model.population,
        model.duplication,
        model.loss,
        &score_args.sample,
        &mut rng,
    )
    .context("Failed to sample the gene tree to score.")?;

    log_draw(1, &coal_tree, &extra);

    log_scores(1, &model, &coal_tree, &extra, &score_args.score, &mut rng)
}
