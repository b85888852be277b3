//! The multispecies coalescent of gene copies inside a locus tree.

use core::num::NonZeroUsize;

use fnv::FnvHashMap;

use dlcoal_core::{
    cogs::{
        distribution::{Exponential, IndexUsize, Lambda, Length},
        RngCore, SampledDistribution,
    },
    locus::{CoalescentTree, DaughterSet, LocusEvent, LocusTree},
    reconciliation::Reconciliation,
    tree::NodeId,
};
use dlcoal_core_bond::PositiveF64;
use dlcoal_core_maths::coalescent::coalescence_rate;

use crate::SamplingError;

mod bounded;

#[derive(Debug, Clone)]
pub struct CoalescentSample {
    pub coal_tree: CoalescentTree,
    /// Locus branch of every coalescent node
    pub coal_recon: Reconciliation,
}

/// A gene lineage waiting to coalesce
#[derive(Debug, Clone, Copy)]
struct GeneLineage {
    node: NodeId,
    /// Length of the lineage from its node up to the bottom of the current
    /// locus branch
    length: f64,
}

/// How the lineages inside one locus branch coalesce
#[derive(Debug, Clone, Copy, PartialEq)]
enum BranchKind {
    /// Coalesce until the top of the branch is reached
    Censored(f64),
    /// Coalesce into a single lineage before the top of the branch
    Bounded(f64),
    /// Coalesce into a single lineage, however long it takes
    Root,
}

/// Names the `index`th gene sampled from a locus leaf: the first gene keeps
/// the leaf's name, later ones get an `_index` suffix.
#[must_use]
pub fn default_gene_name(locus_name: &str, index: usize) -> String {
    if index == 0 {
        String::from(locus_name)
    } else {
        format!("{}_{}", locus_name, index)
    }
}

/// Samples a gene tree inside the locus tree.
///
/// Every locus leaf contributes `leaf_counts[leaf]` genes (one if no counts
/// are given), named with `namefunc(leaf_name, index)`. Daughter branches
/// start from a single gene copy at their duplication, so all of their
/// lineages must have coalesced by its top.
///
/// # Errors
///
/// Returns `SamplingError::EmptyLocusTree` if the locus tree has no root, or
/// `SamplingError::MissingLeafCount` if `leaf_counts` misses a locus leaf.
pub fn sample_locus_coal_tree<G: RngCore, F: FnMut(&str, usize) -> String>(
    locus_tree: &LocusTree,
    n: PositiveF64,
    leaf_counts: Option<&FnvHashMap<NodeId, usize>>,
    daughters: &DaughterSet,
    mut namefunc: F,
    rng: &mut G,
) -> Result<CoalescentSample, SamplingError> {
    let locus_root = locus_tree.root().ok_or(SamplingError::EmptyLocusTree)?;

    let mut coal_tree = CoalescentTree::new();
    let mut coal_recon = Reconciliation::default();

    let mut outgoing: Vec<Vec<GeneLineage>> = vec![Vec::new(); locus_tree.len()];

    for locus in locus_tree.postorder() {
        let node = locus_tree.node(locus);

        let mut lineages = if node.is_leaf() {
            let count = match (node.data().event, leaf_counts) {
                (LocusEvent::Leaf, None) => 1,
                (LocusEvent::Leaf, Some(counts)) => *counts
                    .get(&locus)
                    .ok_or(SamplingError::MissingLeafCount(locus))?,
                _ => 0,
            };

            let locus_name = node
                .name()
                .map_or_else(|| locus.get().to_string(), String::from);

            (0..count)
                .map(|index| {
                    let gene = coal_tree.add_node(Some(namefunc(&locus_name, index)), 0.0, ());
                    coal_recon.insert(gene, locus);

                    GeneLineage {
                        node: gene,
                        length: 0.0,
                    }
                })
                .collect()
        } else {
            node.children()
                .iter()
                .flat_map(|child| std::mem::take(&mut outgoing[child.get()]))
                .collect::<Vec<_>>()
        };

        let kind = if locus == locus_root {
            BranchKind::Root
        } else if daughters.contains(&locus) {
            BranchKind::Bounded(node.dist())
        } else {
            BranchKind::Censored(node.dist())
        };

        coalesce_in_branch(
            &mut coal_tree,
            &mut coal_recon,
            &mut lineages,
            locus,
            kind,
            n,
            rng,
        );

        outgoing[locus.get()] = lineages;
    }

    let coal_root = if let [root] = outgoing[locus_root.get()][..] {
        root.node
    } else {
        // Every gene copy was lost, so the gene tree only has its origin
        let origin = coal_tree.add_node(None, 0.0, ());
        coal_recon.insert(origin, locus_root);

        origin
    };

    coal_tree.set_dist(coal_root, 0.0);
    coal_tree.set_root(coal_root);

    Ok(CoalescentSample {
        coal_tree,
        coal_recon,
    })
}

fn coalesce_in_branch<G: RngCore>(
    coal_tree: &mut CoalescentTree,
    coal_recon: &mut Reconciliation,
    lineages: &mut Vec<GeneLineage>,
    locus: NodeId,
    kind: BranchKind,
    n: PositiveF64,
    rng: &mut G,
) {
    let mut time = 0.0;

    while lineages.len() > 1 {
        let k = lineages.len();

        let wait = match kind {
            BranchKind::Bounded(length) => {
                bounded::sample_bounded_wait(k, length - time, n.get(), rng)
            },
            BranchKind::Censored(_) | BranchKind::Root => {
                match PositiveF64::new(coalescence_rate(k, n.get())) {
                    Ok(lambda) => Exponential::sample_with(rng, Lambda(lambda)).get(),
                    Err(_) => f64::INFINITY,
                }
            },
        };

        if let BranchKind::Censored(length) = kind {
            if time + wait >= length {
                break;
            }
        }

        time += wait;

        let (Some(k_lineages), Some(k_others)) = (NonZeroUsize::new(k), NonZeroUsize::new(k - 1))
        else {
            break;
        };

        // Uniformly chosen unordered pair
        let first = IndexUsize::sample_with(rng, Length(k_lineages));
        let mut second = IndexUsize::sample_with(rng, Length(k_others));
        if second >= first {
            second += 1;
        }

        let parent = coal_tree.add_node(None, 0.0, ());
        coal_recon.insert(parent, locus);

        for index in [first.max(second), first.min(second)] {
            let child = lineages.swap_remove(index);

            coal_tree.set_dist(child.node, child.length + time);
            coal_tree.add_child(parent, child.node);
        }

        lineages.push(GeneLineage {
            node: parent,
            length: -time,
        });
    }

    let length = match kind {
        BranchKind::Censored(length) | BranchKind::Bounded(length) => length,
        BranchKind::Root => time,
    };

    for lineage in lineages.iter_mut() {
        lineage.length += length;
    }
}

#[cfg(test)]
mod test;
