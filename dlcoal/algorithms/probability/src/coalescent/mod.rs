//! Probability of a reconciled gene tree topology under the multispecies
//! coalescent inside a known locus tree.

use dlcoal_core::{
    locus::{CoalescentTree, DaughterSet, LocusEvent, LocusTree},
    reconciliation::Reconciliation,
    tree::NodeId,
};
use dlcoal_core_bond::PositiveF64;
use dlcoal_core_maths::{
    coalescent::{ln_num_labeled_histories, prob_coal_counts},
    ln_factorial, log_add,
};

use crate::ProbabilityError;

/// Gene lineages at the bottom and the top of a locus branch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LineageCounts {
    pub entering: usize,
    pub leaving: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BranchKind {
    Censored,
    Daughter,
    Root,
}

#[derive(Debug, Clone, Copy)]
struct BranchTopology {
    locus: NodeId,
    kind: BranchKind,
    counts: LineageCounts,
    /// `ln O(x) - ln H(u, v)`, the fraction of merge sequences inside the
    /// branch that produce the observed forest
    ln_merge_orders: f64,
}

/// The per-branch lineage counts and merge orders of a reconciled gene tree,
/// which only depend on its topology and not on any branch lengths.
#[derive(Debug, Clone)]
pub struct CoalescentTopology {
    /// Locus branches in post-order
    branches: Vec<BranchTopology>,
    /// A coalescence with more than two children has probability zero
    has_polytomy: bool,
}

impl CoalescentTopology {
    /// Validates the reconciliation of `coal_tree` into `locus_tree` and
    /// counts the lineages and merge orders of every locus branch.
    ///
    /// # Errors
    ///
    /// Returns a `ProbabilityError` if either tree is empty, a coalescent
    /// node is not reconciled to a locus node, a coalescent leaf is not
    /// reconciled to an extant locus leaf, the reconciliation is not
    /// monotonic, or a locus branch has more coalescences than lineages.
    pub fn new(
        coal_tree: &CoalescentTree,
        coal_recon: &Reconciliation,
        locus_tree: &LocusTree,
        daughters: &DaughterSet,
    ) -> Result<Self, ProbabilityError> {
        let coal_root = coal_tree.root().ok_or(ProbabilityError::EmptyCoalescentTree)?;
        let locus_root = locus_tree.root().ok_or(ProbabilityError::EmptyLocusTree)?;

        let genes = coal_tree.preorder_from(coal_root);

        let mut attached = vec![false; locus_tree.len()];
        for locus in locus_tree.preorder_from(locus_root) {
            attached[locus.get()] = true;
        }

        let mut recon = vec![None; coal_tree.len()];
        for gene in &genes {
            let locus = coal_recon
                .get(*gene)
                .ok_or(ProbabilityError::UnmappedCoalescentNode(*gene))?;

            if !(locus_tree.contains(locus) && attached[locus.get()]) {
                return Err(ProbabilityError::InvalidCoalescentTarget { gene: *gene, locus });
            }

            recon[gene.get()] = Some(locus);
        }
        let recon_of = |gene: NodeId| recon[gene.get()].unwrap_or(locus_root);

        let mut entering = vec![0_usize; locus_tree.len()];
        let mut coalescences = vec![0_usize; locus_tree.len()];
        let mut has_polytomy = false;

        // Number of coalescences below each gene inside its own locus branch
        let mut nested = vec![0_usize; coal_tree.len()];
        let mut ln_nested = vec![0.0_f64; locus_tree.len()];

        for gene in genes.iter().rev() {
            let node = coal_tree.node(*gene);
            let locus = recon_of(*gene);

            for child in node.children() {
                if !locus_tree.is_ancestor_or_self(locus, recon_of(*child)) {
                    return Err(ProbabilityError::NonMonotonicReconciliation {
                        gene: *gene,
                        child: *child,
                    });
                }
            }

            match node.children().len() {
                0 => {
                    if !(locus_tree.node(locus).is_leaf()
                        && locus_tree.node(locus).data().event == LocusEvent::Leaf)
                    {
                        return Err(ProbabilityError::LeafNotOnLocusLeaf {
                            gene: *gene,
                            locus,
                        });
                    }

                    entering[locus.get()] += 1;
                },
                1 => (),
                children => {
                    has_polytomy |= children > 2;

                    coalescences[locus.get()] += 1;
                },
            }

            let is_coalescence = node.children().len() >= 2;
            nested[gene.get()] = usize::from(is_coalescence)
                + node
                    .children()
                    .iter()
                    .filter(|child| recon_of(**child) == locus)
                    .map(|child| nested[child.get()])
                    .sum::<usize>();

            if is_coalescence {
                #[allow(clippy::cast_precision_loss)]
                let ln_subtree = (nested[gene.get()] as f64).ln();
                ln_nested[locus.get()] += ln_subtree;
            }
        }

        let mut branches = Vec::new();

        for locus in locus_tree.postorder_from(locus_root) {
            let node = locus_tree.node(locus);

            let entering_lineages = if node.is_leaf() {
                entering[locus.get()]
            } else {
                node.children()
                    .iter()
                    .map(|child| entering[child.get()])
                    .sum()
            };
            let merges = coalescences[locus.get()];

            if merges > 0 && merges >= entering_lineages {
                return Err(ProbabilityError::TooManyCoalescences { locus });
            }

            let leaving = entering_lineages - merges;

            let kind = if locus == locus_root {
                if entering_lineages > 0 && leaving != 1 {
                    return Err(ProbabilityError::UnresolvedRoot { lineages: leaving });
                }

                BranchKind::Root
            } else if daughters.contains(&locus) {
                BranchKind::Daughter
            } else {
                BranchKind::Censored
            };

            // ln O(x) = ln m! - sum_y ln s_y
            let ln_merge_orders = ln_factorial(merges) - ln_nested[locus.get()]
                - ln_num_labeled_histories(entering_lineages, leaving);

            // Reuse the slot as the number of lineages leaving the branch
            entering[locus.get()] = leaving;

            branches.push(BranchTopology {
                locus,
                kind,
                counts: LineageCounts {
                    entering: entering_lineages,
                    leaving,
                },
                ln_merge_orders,
            });
        }

        Ok(Self {
            branches,
            has_polytomy,
        })
    }

    /// Lineage counts of every locus branch reachable from the root,
    /// indexed by locus node
    #[must_use]
    pub fn lineage_counts(&self, locus_len: usize) -> Vec<LineageCounts> {
        let mut counts = vec![LineageCounts::default(); locus_len];

        for branch in &self.branches {
            counts[branch.locus.get()] = branch.counts;
        }

        counts
    }

    /// Log-probability of the topology given the length of every locus
    /// branch
    #[must_use]
    pub fn ln_prob<F: Fn(NodeId) -> f64>(&self, dist: F, n: PositiveF64) -> f64 {
        self.ln_prob_with_hidden_daughters(dist, |_| 0.0, n)
    }

    /// Log-probability of the topology given the length of every locus
    /// branch, where `hidden(x)` is the expected number of unobserved
    /// duplications along the branch above `x` whose mother copy was lost.
    ///
    /// Each such duplication leaves a daughter copy behind, inside which all
    /// gene lineages must have coalesced by the time of the duplication. The
    /// number of these duplications is Poisson distributed, so a branch
    /// either has none, and is censored as usual, or has at least one, and
    /// must be fully resolved.
    #[must_use]
    pub fn ln_prob_with_hidden_daughters<F: Fn(NodeId) -> f64, H: Fn(NodeId) -> f64>(
        &self,
        dist: F,
        hidden: H,
        n: PositiveF64,
    ) -> f64 {
        if self.has_polytomy {
            return f64::NEG_INFINITY;
        }

        let mut ln_prob = 0.0;

        for branch in &self.branches {
            let LineageCounts { entering, leaving } = branch.counts;

            ln_prob += match branch.kind {
                BranchKind::Censored => {
                    let ln_censored =
                        prob_coal_counts(entering, leaving, dist(branch.locus), n.get()).ln()
                            + branch.ln_merge_orders;

                    let expected = hidden(branch.locus);

                    if expected > 0.0 {
                        let ln_resolved = if entering == 0 || leaving == 1 {
                            branch.ln_merge_orders
                        } else {
                            f64::NEG_INFINITY
                        };

                        log_add(
                            -expected + ln_censored,
                            (-(-expected).exp_m1()).ln() + ln_resolved,
                        )
                    } else {
                        ln_censored
                    }
                },
                BranchKind::Daughter if entering > 0 && leaving != 1 => f64::NEG_INFINITY,
                BranchKind::Daughter | BranchKind::Root => branch.ln_merge_orders,
            };
        }

        ln_prob
    }
}

/// Counts the gene lineages entering and leaving every locus branch.
///
/// # Errors
///
/// Returns a `ProbabilityError` if the reconciliation is invalid, see
/// [`CoalescentTopology::new`].
pub fn count_lineages_per_branch(
    coal_tree: &CoalescentTree,
    coal_recon: &Reconciliation,
    locus_tree: &LocusTree,
) -> Result<Vec<LineageCounts>, ProbabilityError> {
    CoalescentTopology::new(coal_tree, coal_recon, locus_tree, &DaughterSet::default())
        .map(|topology| topology.lineage_counts(locus_tree.len()))
}

/// Log-probability that the multispecies coalescent inside `locus_tree`
/// produces the reconciled topology of `coal_tree`, with all coalescence
/// times integrated out.
///
/// # Errors
///
/// Returns a `ProbabilityError` if the reconciliation is invalid, see
/// [`CoalescentTopology::new`].
pub fn prob_locus_coal_recon_topology(
    coal_tree: &CoalescentTree,
    coal_recon: &Reconciliation,
    locus_tree: &LocusTree,
    n: PositiveF64,
    daughters: &DaughterSet,
) -> Result<f64, ProbabilityError> {
    let topology = CoalescentTopology::new(coal_tree, coal_recon, locus_tree, daughters)?;

    Ok(topology.ln_prob(|locus| locus_tree.node(locus).dist(), n))
}
