//! Full draws of a gene tree inside a species tree, with bounded
//! accept / reject.

use std::num::NonZeroU64;

use serde::{Deserialize, Serialize};

use dlcoal_core::{
    cogs::RngCore,
    locus::{
        count_gene_leaves, remove_lost_lineages, CoalescentTree, DaughterSet, LocusTree,
        RestructuredLocusTree, SpeciesTree,
    },
    reconciliation::Reconciliation,
};
use dlcoal_core_bond::{NonNegativeF64, PositiveF64};

use crate::{
    birth_death::{sample_locus_tree, LocusSample},
    coalescent::{default_gene_name, sample_locus_coal_tree, CoalescentSample},
    SamplingError,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct PipelineOptions {
    /// Prune lost gene copies and merge single-child nodes afterwards
    pub remove_single: bool,
    /// Prefix for naming the internal nodes of the gene tree
    pub name_internal: Option<String>,
    /// Minimum number of extant gene copies
    pub minsize: usize,
    /// Require a duplicated clade with more than one extant gene copy
    pub reject: bool,
    pub max_attempts: NonZeroU64,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            remove_single: true,
            name_internal: Some(String::from("n")),
            minsize: 0,
            reject: false,
            max_attempts: NonZeroU64::new(1_000_000).unwrap_or(NonZeroU64::MIN),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DLCoalExtra {
    pub locus_tree: LocusTree,
    pub locus_recon: Reconciliation,
    pub daughters: DaughterSet,
    pub coal_recon: Reconciliation,
    /// Number of draws it took until one was accepted
    pub attempts: NonZeroU64,
}

/// Samples a locus tree inside the species tree and a gene tree inside that
/// locus tree, redrawing both until `options` accepts them.
///
/// # Errors
///
/// Returns `SamplingError::Exhausted` if no draw is accepted within
/// `options.max_attempts` attempts, or any error of the two samplers.
pub fn sample_dlcoal<G: RngCore>(
    species_tree: &SpeciesTree,
    n: PositiveF64,
    duprate: NonNegativeF64,
    lossrate: NonNegativeF64,
    options: &PipelineOptions,
    rng: &mut G,
) -> Result<(CoalescentTree, DLCoalExtra), SamplingError> {
    for attempt in 1..=options.max_attempts.get() {
        let LocusSample {
            locus_tree,
            locus_recon,
            daughters,
        } = sample_locus_tree(species_tree, duprate, lossrate, rng)?;

        let gene_leaves = count_gene_leaves(&locus_tree);

        if gene_leaves < options.minsize {
            log::debug!(
                "Rejected draw {}: only {} < {} extant gene copies.",
                attempt,
                gene_leaves,
                options.minsize
            );

            continue;
        }

        if options.reject && !has_duplicated_clade(&locus_tree, &daughters) {
            log::debug!("Rejected draw {}: no duplicated clade.", attempt);

            continue;
        }

        let CoalescentSample {
            mut coal_tree,
            mut coal_recon,
        } = sample_locus_coal_tree(&locus_tree, n, None, &daughters, default_gene_name, rng)?;

        let (locus_tree, locus_recon, daughters) = if options.remove_single && gene_leaves > 0 {
            let RestructuredLocusTree {
                locus_tree,
                map,
                daughters,
            } = remove_lost_lineages(&locus_tree, &daughters, true);

            coal_recon = coal_recon.remap_targets(&map);
            let locus_recon = Reconciliation::from_locus_tree(&locus_tree);

            (locus_tree, locus_recon, daughters)
        } else {
            (locus_tree, locus_recon, daughters)
        };

        if let Some(prefix) = &options.name_internal {
            name_internal_nodes(&mut coal_tree, prefix);
        }

        log::trace!(
            "Accepted draw {} with {} gene copies.",
            attempt,
            gene_leaves
        );

        return Ok((
            coal_tree,
            DLCoalExtra {
                locus_tree,
                locus_recon,
                daughters,
                coal_recon,
                attempts: NonZeroU64::new(attempt).unwrap_or(NonZeroU64::MIN),
            },
        ));
    }

    Err(SamplingError::Exhausted {
        attempts: options.max_attempts,
    })
}

/// Whether any daughter lineage left more than one extant gene copy
fn has_duplicated_clade(locus_tree: &LocusTree, daughters: &DaughterSet) -> bool {
    daughters.iter().any(|daughter| {
        locus_tree
            .subtree_leaves(*daughter)
            .into_iter()
            .filter(|leaf| locus_tree.node(*leaf).data().is_gene_leaf())
            .nth(1)
            .is_some()
    })
}

fn name_internal_nodes(coal_tree: &mut CoalescentTree, prefix: &str) {
    let mut counter = 0_usize;

    for gene in coal_tree.preorder() {
        let node = coal_tree.node(gene);

        if !node.is_leaf() && node.name().is_none() {
            counter += 1;

            coal_tree.set_name(gene, Some(format!("{}{}", prefix, counter)));
        }
    }
}
