use anyhow::{Context, Result};

use dlcoal_algorithms_probability::{
    coalescent::prob_locus_coal_recon_topology,
    joint::{prob_dlcoal_recon_topology, ReconProbabilityOptions},
};
use dlcoal_algorithms_sampling::pipeline::DLCoalExtra;
use dlcoal_core::locus::{CoalescentTree, LocusEvent, SpeciesTree};
use dlcoal_core_bond::{NonNegativeF64, PositiveF64};
use dlcoal_impls_std::cogs::rng::chacha::ChaCha;

pub mod score;
pub mod simulate;

/// The model parameters shared by all subcommands
struct Model<'a> {
    species_tree: &'a SpeciesTree,
    population: PositiveF64,
    duplication: NonNegativeF64,
    loss: NonNegativeF64,
}

fn log_draw(draw: u64, coal_tree: &CoalescentTree, extra: &DLCoalExtra) {
    let duplications = extra
        .locus_tree
        .preorder()
        .into_iter()
        .filter(|locus| extra.locus_tree.node(*locus).data().event == LocusEvent::Duplication)
        .count();

    info!(
        "Draw {}: {} genes inside {} locus nodes with {} duplications, accepted after {} \
         attempt(s).",
        draw,
        coal_tree.leaves().len(),
        extra.locus_tree.len(),
        duplications,
        extra.attempts,
    );

    debug!(
        "Draw {}: sampled the genes {:?}.",
        draw,
        coal_tree
            .leaves()
            .into_iter()
            .filter_map(|gene| coal_tree.node(gene).name())
            .collect::<Vec<_>>()
    );
}

fn log_scores(
    draw: u64,
    model: &Model,
    coal_tree: &CoalescentTree,
    extra: &DLCoalExtra,
    options: &ReconProbabilityOptions,
    rng: &mut ChaCha,
) -> Result<()> {
    let coal_log_prob = prob_locus_coal_recon_topology(
        coal_tree,
        &extra.coal_recon,
        &extra.locus_tree,
        model.population,
        &extra.daughters,
    )
    .with_context(|| format!("Failed to score the coalescent topology of draw {}.", draw))?;

    let estimate = prob_dlcoal_recon_topology(
        coal_tree,
        &extra.coal_recon,
        &extra.locus_tree,
        &extra.locus_recon,
        &extra.daughters,
        model.species_tree,
        model.population,
        model.duplication,
        model.loss,
        options,
        rng,
    )
    .with_context(|| format!("Failed to score the joint topology of draw {}.", draw))?;

    info!(
        "Draw {}: the coalescent topology has log-probability {} given its locus tree, and \
         {} under the joint model.",
        draw, coal_log_prob, estimate.log_prob,
    );

    if estimate.nsamples > 0 {
        info!(
            "Draw {}: the joint estimate from {} samples has a relative standard error of {:.4} \
             and an effective sample size of {:.1}.",
            draw, estimate.nsamples, estimate.relative_std_error, estimate.effective_sample_size,
        );
    }

    Ok(())
}
