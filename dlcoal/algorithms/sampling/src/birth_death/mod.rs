//! Gene duplication and loss along the branches of a species tree.

use dlcoal_core::{
    cogs::{
        distribution::{Bernoulli, Exponential, Lambda},
        RngCore, SampledDistribution,
    },
    locus::{DaughterSet, LocusEvent, LocusNode, LocusTree, SpeciesTree},
    reconciliation::Reconciliation,
    tree::NodeId,
};
use dlcoal_core_bond::{ClosedUnitF64, NonNegativeF64, PositiveF64};

use crate::SamplingError;

#[derive(Debug, Clone)]
pub struct LocusSample {
    pub locus_tree: LocusTree,
    /// Species branch of every locus node
    pub locus_recon: Reconciliation,
    pub daughters: DaughterSet,
}

/// A gene copy travelling down a species branch
struct LocusLineage {
    species: NodeId,
    parent: Option<NodeId>,
    /// Length of the locus branch accumulated since `parent`
    dist: f64,
    /// Time left until the bottom of the species branch
    remaining: f64,
    daughter: bool,
}

/// Simulates a linear birth-death process of gene copies down every branch
/// of the species tree, including the branch above its root.
///
/// # Errors
///
/// Returns `SamplingError::EmptySpeciesTree` if the species tree has no root.
pub fn sample_locus_tree<G: RngCore>(
    species_tree: &SpeciesTree,
    duprate: NonNegativeF64,
    lossrate: NonNegativeF64,
    rng: &mut G,
) -> Result<LocusSample, SamplingError> {
    let species_root = species_tree
        .root()
        .ok_or(SamplingError::EmptySpeciesTree)?;

    let event_rate = PositiveF64::new((duprate + lossrate).get()).ok();
    let duplication_probability = event_rate
        .and_then(|rate| ClosedUnitF64::new(duprate.get() / rate.get()).ok())
        .unwrap_or_else(ClosedUnitF64::zero);

    let mut locus_tree = LocusTree::new();
    let mut daughters = DaughterSet::default();

    let mut lineages = vec![LocusLineage {
        species: species_root,
        parent: None,
        dist: 0.0,
        remaining: species_tree.node(species_root).dist(),
        daughter: false,
    }];

    while let Some(mut lineage) = lineages.pop() {
        let wait = event_rate.map_or(f64::INFINITY, |lambda| {
            Exponential::sample_with(rng, Lambda(lambda)).get()
        });

        let event = if wait < lineage.remaining {
            lineage.dist += wait;
            lineage.remaining -= wait;

            if Bernoulli::sample_with(rng, duplication_probability) {
                LocusEvent::Duplication
            } else {
                LocusEvent::Loss
            }
        } else {
            lineage.dist += lineage.remaining;
            lineage.remaining = 0.0;

            if species_tree.node(lineage.species).is_leaf() {
                LocusEvent::Leaf
            } else {
                LocusEvent::Speciation
            }
        };

        let node = locus_tree.add_node(
            None,
            lineage.dist,
            LocusNode {
                event,
                species: lineage.species,
            },
        );

        match lineage.parent {
            Some(parent) => locus_tree.add_child(parent, node),
            None => locus_tree.set_root(node),
        }

        if lineage.daughter {
            daughters.insert(node);
        }

        match event {
            LocusEvent::Duplication => {
                // Either copy is equally likely to be the new one
                let daughter = usize::from(Bernoulli::sample_with(rng, ClosedUnitF64::half()));

                // Pushed in reverse so that the first copy is explored first
                for copy in (0..2).rev() {
                    lineages.push(LocusLineage {
                        species: lineage.species,
                        parent: Some(node),
                        dist: 0.0,
                        remaining: lineage.remaining,
                        daughter: copy == daughter,
                    });
                }
            },
            LocusEvent::Speciation => {
                for child in species_tree.node(lineage.species).children().iter().rev() {
                    lineages.push(LocusLineage {
                        species: *child,
                        parent: Some(node),
                        dist: 0.0,
                        remaining: species_tree.node(*child).dist(),
                        daughter: false,
                    });
                }
            },
            LocusEvent::Leaf => {
                let species_name = species_tree
                    .node(lineage.species)
                    .name()
                    .map_or_else(|| lineage.species.get().to_string(), String::from);

                locus_tree.set_name(node, Some(format!("{}_{}", species_name, node.get())));
            },
            LocusEvent::Loss => (),
        }
    }

    log::trace!(
        "Sampled a locus tree with {} nodes and {} duplications.",
        locus_tree.len(),
        daughters.len()
    );

    Ok(LocusSample {
        locus_recon: Reconciliation::from_locus_tree(&locus_tree),
        locus_tree,
        daughters,
    })
}

#[cfg(test)]
mod test;
