//! Birth-death prior of a reconciled locus tree topology, with the
//! unobserved duplicate lineages that are doomed to go extinct summed out.

use dlcoal_core::{
    locus::{remove_lost_lineages, DaughterSet, LocusEvent, LocusTree, SpeciesTree},
    tree::NodeId,
};
use dlcoal_core_bond::{ClosedUnitF64, NonNegativeF64};
use dlcoal_core_maths::{
    birth_death::{simpson, KendallCoefficients},
    ln_factorial,
};

use crate::ProbabilityError;

const QUADRATURE_INTERVALS: usize = 256;

/// Probabilities that a single gene copy leaves no extant descendants, from
/// the top and from the bottom of every species branch
#[derive(Debug, Clone)]
pub struct DoomTable {
    top: Vec<ClosedUnitF64>,
    bottom: Vec<ClosedUnitF64>,
}

impl DoomTable {
    /// # Errors
    ///
    /// Returns `ProbabilityError::EmptySpeciesTree` if the species tree has
    /// no root, or `ProbabilityError::InvalidSpeciesBranch` if a branch
    /// length is negative or not a number.
    pub fn new(
        species_tree: &SpeciesTree,
        duprate: NonNegativeF64,
        lossrate: NonNegativeF64,
    ) -> Result<Self, ProbabilityError> {
        let species_root = species_tree
            .root()
            .ok_or(ProbabilityError::EmptySpeciesTree)?;

        let mut top = vec![ClosedUnitF64::one(); species_tree.len()];
        let mut bottom = vec![ClosedUnitF64::one(); species_tree.len()];

        for species in species_tree.postorder_from(species_root) {
            let node = species_tree.node(species);

            if node.dist().is_nan() || node.dist() < 0.0 {
                return Err(ProbabilityError::InvalidSpeciesBranch { species });
            }

            // Extant species sample every gene copy that reaches them
            let doom_bottom = if node.is_leaf() {
                ClosedUnitF64::zero()
            } else {
                ClosedUnitF64::new(
                    node.children()
                        .iter()
                        .map(|child| top[child.get()].get())
                        .product(),
                )
                .map_err(|_| ProbabilityError::InvalidSpeciesBranch { species })?
            };

            let doom_top = ClosedUnitF64::new(
                KendallCoefficients::new(node.dist(), duprate.get(), lossrate.get())
                    .prob_extinct(doom_bottom.get()),
            )
            .map_err(|_| ProbabilityError::InvalidSpeciesBranch { species })?;

            bottom[species.get()] = doom_bottom;
            top[species.get()] = doom_top;
        }

        Ok(Self { top, bottom })
    }

    #[must_use]
    pub fn top(&self, species: NodeId) -> ClosedUnitF64 {
        self.top[species.get()]
    }

    #[must_use]
    pub fn bottom(&self, species: NodeId) -> ClosedUnitF64 {
        self.bottom[species.get()]
    }
}

/// An observed duplication inside a species branch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Duplication {
    pub locus: NodeId,
    pub species: NodeId,
    /// Number of duplications in the subtree of this one, including itself,
    /// that happened inside the same species branch
    pub nested: usize,
}

/// The duplication/loss prior of a locus tree topology, split into the terms
/// that are fixed and the survival term of the species root branch, whose
/// length may be unknown.
#[derive(Debug, Clone)]
pub struct DupLossTopology {
    ln_fixed: f64,
    root_tips: usize,
    root_doom: ClosedUnitF64,
    duprate: NonNegativeF64,
    lossrate: NonNegativeF64,
    maxdoom: usize,
    /// Parents are listed before their children
    duplications: Vec<Duplication>,
}

impl DupLossTopology {
    /// Walks the species branches top-down and accounts for the locus
    /// lineages that each of them contains.
    ///
    /// `locus_tree` must not contain any lost lineages or duplications with
    /// a single child, see [`remove_lost_lineages`]. Every locus node is
    /// read as reconciled to its `species`.
    ///
    /// # Errors
    ///
    /// Returns a `ProbabilityError` if either tree is empty or the locus
    /// tree is not a valid duplication/loss history inside the species
    /// tree. Locus branches that span several species branches are only
    /// accepted if `add_spec` is set.
    #[allow(clippy::too_many_lines, clippy::cast_precision_loss)]
    pub fn new(
        locus_tree: &LocusTree,
        species_tree: &SpeciesTree,
        doom: &DoomTable,
        duprate: NonNegativeF64,
        lossrate: NonNegativeF64,
        maxdoom: usize,
        add_spec: bool,
    ) -> Result<Self, ProbabilityError> {
        let locus_root = locus_tree.root().ok_or(ProbabilityError::EmptyLocusTree)?;
        let species_root = species_tree
            .root()
            .ok_or(ProbabilityError::EmptySpeciesTree)?;

        for locus in locus_tree.preorder_from(locus_root) {
            let species = locus_tree.node(locus).data().species;

            if !species_tree.contains(species) {
                return Err(ProbabilityError::InvalidLocusTarget { locus, species });
            }
        }

        let is_duplication_in = |locus: NodeId, species: NodeId| {
            let data = locus_tree.node(locus).data();

            data.species == species && data.event == LocusEvent::Duplication
        };

        let mut ln_fixed = 0.0;
        let mut root_tips = 0;
        let mut duplications = Vec::new();

        let mut leaf_genes = vec![0_usize; species_tree.len()];
        let mut nested = vec![0_usize; locus_tree.len()];

        let mut entries = vec![(species_root, locus_root)];

        while let Some((species, entry)) = entries.pop() {
            if !species_tree.is_ancestor_or_self(species, locus_tree.node(entry).data().species) {
                return Err(ProbabilityError::BranchOutsideSpecies { locus: entry });
            }

            let species_node = species_tree.node(species);

            // Reconstructed tree of the lineage inside this species branch
            let mut branch_duplications = Vec::new();
            let mut tips = Vec::new();
            let mut stack = vec![entry];

            while let Some(locus) = stack.pop() {
                let node = locus_tree.node(locus);

                if is_duplication_in(locus, species) {
                    if node.children().len() != 2 {
                        return Err(ProbabilityError::NonBinaryDuplication { locus });
                    }

                    branch_duplications.push(locus);
                    stack.extend(node.children().iter().rev());
                } else {
                    tips.push(locus);
                }
            }

            for duplication in branch_duplications.iter().rev() {
                nested[duplication.get()] = 1 + locus_tree
                    .node(*duplication)
                    .children()
                    .iter()
                    .filter(|child| is_duplication_in(**child, species))
                    .map(|child| nested[child.get()])
                    .sum::<usize>();
            }

            // (b - 1) ln 2 - sum_v ln s_v
            for duplication in &branch_duplications {
                ln_fixed += core::f64::consts::LN_2 - (nested[duplication.get()] as f64).ln();

                duplications.push(Duplication {
                    locus: *duplication,
                    species,
                    nested: nested[duplication.get()],
                });
            }

            for tip in &tips {
                let tip_node = locus_tree.node(*tip);
                let tip_species = tip_node.data().species;

                if tip_species != species {
                    if !add_spec {
                        return Err(ProbabilityError::ImpliedSpeciation { locus: *tip });
                    }

                    let child = species_child_towards(species_tree, species, tip_species)
                        .ok_or(ProbabilityError::BranchOutsideSpecies { locus: *tip })?;

                    // The copies in every other child species were lost
                    ln_fixed += species_node
                        .children()
                        .iter()
                        .filter(|other| **other != child)
                        .map(|other| doom.top(*other).get().ln())
                        .sum::<f64>();

                    entries.push((child, *tip));

                    continue;
                }

                match tip_node.data().event {
                    LocusEvent::Leaf if species_node.is_leaf() => {
                        leaf_genes[species.get()] += 1;
                    },
                    LocusEvent::Speciation if !species_node.is_leaf() => {
                        let mut reached = Vec::with_capacity(tip_node.children().len());

                        for child in tip_node.children() {
                            let target = species_child_towards(
                                species_tree,
                                species,
                                locus_tree.node(*child).data().species,
                            )
                            .ok_or(ProbabilityError::InvalidSpeciation { locus: *tip })?;

                            if reached.contains(&target) {
                                return Err(ProbabilityError::InvalidSpeciation { locus: *tip });
                            }

                            reached.push(target);
                            entries.push((target, *child));
                        }

                        ln_fixed += species_node
                            .children()
                            .iter()
                            .filter(|other| !reached.contains(other))
                            .map(|other| doom.top(*other).get().ln())
                            .sum::<f64>();
                    },
                    LocusEvent::Speciation => {
                        return Err(ProbabilityError::InvalidSpeciation { locus: *tip })
                    },
                    _ => return Err(ProbabilityError::InvalidLeaf { locus: *tip }),
                }
            }

            if species == species_root {
                root_tips = tips.len();
            } else {
                ln_fixed += KendallCoefficients::new(species_node.dist(), duprate.get(), lossrate.get())
                    .ln_prob_surviving(tips.len(), doom.bottom(species).get(), maxdoom);
            }
        }

        // Gene copies within an extant species are exchangeable
        ln_fixed -= leaf_genes.iter().map(|genes| ln_factorial(*genes)).sum::<f64>();

        log::trace!(
            "Reconstructed {} duplications, {} lineages leave the root branch.",
            duplications.len(),
            root_tips
        );

        Ok(Self {
            ln_fixed,
            root_tips,
            root_doom: doom.bottom(species_root),
            duprate,
            lossrate,
            maxdoom,
            duplications,
        })
    }

    /// Number of observed lineages at the bottom of the species root branch
    #[must_use]
    pub fn root_tips(&self) -> usize {
        self.root_tips
    }

    #[must_use]
    pub fn duplications(&self) -> &[Duplication] {
        &self.duplications
    }

    /// Log-prior of the topology, excluding the survival term of the root
    /// branch
    #[must_use]
    pub fn ln_prob_below_root(&self) -> f64 {
        self.ln_fixed
    }

    /// Log-prior of the topology if the species root branch has length
    /// `t_root`
    #[must_use]
    pub fn ln_prob(&self, t_root: NonNegativeF64) -> f64 {
        if self.ln_fixed == f64::NEG_INFINITY {
            return f64::NEG_INFINITY;
        }

        self.ln_fixed
            + KendallCoefficients::new(t_root.get(), self.duprate.get(), self.lossrate.get())
                .ln_prob_surviving(self.root_tips, self.root_doom.get(), self.maxdoom)
    }
}

/// The child of `ancestor` on the path down to `descendant`
fn species_child_towards(
    species_tree: &SpeciesTree,
    ancestor: NodeId,
    descendant: NodeId,
) -> Option<NodeId> {
    let mut current = descendant;

    loop {
        let parent = species_tree.node(current).parent()?;

        if parent == ancestor {
            return Some(current);
        }

        current = parent;
    }
}

/// Density of the age of an observed duplication, measured up from the
/// bottom of its species branch, in the reconstructed birth-death process
#[derive(Debug, Clone, Copy)]
pub struct NodeAgeDensity {
    duprate: f64,
    lossrate: f64,
    doom: ClosedUnitF64,
    ln_normaliser: f64,
}

impl NodeAgeDensity {
    /// Normalises the density over a branch of the given `length`, at whose
    /// bottom every lineage is doomed with probability `doom`
    #[must_use]
    pub fn new(
        length: f64,
        duprate: NonNegativeF64,
        lossrate: NonNegativeF64,
        doom: ClosedUnitF64,
    ) -> Self {
        let unnormalised = Self {
            duprate: duprate.get(),
            lossrate: lossrate.get(),
            doom,
            ln_normaliser: 0.0,
        };

        let normaliser = simpson(
            |age| unnormalised.unnormalised(age),
            0.0,
            length,
            QUADRATURE_INTERVALS,
        );

        Self {
            ln_normaliser: normaliser.ln(),
            ..unnormalised
        }
    }

    fn unnormalised(&self, age: f64) -> f64 {
        let KendallCoefficients { p0, u } = KendallCoefficients::new(age, self.duprate, self.lossrate);

        (1.0 - p0) * (1.0 - u) / (1.0 - u * self.doom.get()).powi(2)
    }

    #[must_use]
    pub fn ln_density(&self, age: f64) -> f64 {
        if !self.ln_normaliser.is_finite() {
            return f64::NEG_INFINITY;
        }

        self.unnormalised(age).ln() - self.ln_normaliser
    }
}

/// Expected number of unobserved duplications along a single observed
/// lineage, between the ages `younger` and `older` above the bottom of a
/// species branch, that left only their daughter copy with descendants.
///
/// Along a surviving lineage, duplications with one doomed copy occur at
/// rate `2 λ E(age)`, where `E` is the extinction probability of the new
/// copy, and the survivor is the daughter half of the time. The integral
/// of `2 λ E` is read off `d ln P1 / d age = 2 λ E - (λ + μ)`, with `P1` the
/// probability of exactly one surviving descendant.
#[must_use]
pub fn expected_hidden_daughters(
    younger: f64,
    older: f64,
    duprate: NonNegativeF64,
    lossrate: NonNegativeF64,
    doom: ClosedUnitF64,
) -> f64 {
    if duprate.is_zero() || older <= younger {
        return 0.0;
    }

    let ln_single_survivor = |age: f64| {
        KendallCoefficients::new(age, duprate.get(), lossrate.get())
            .ln_prob_single_survivor(doom.get())
    };

    let expected = 0.5
        * (ln_single_survivor(older) - ln_single_survivor(younger)
            + (duprate.get() + lossrate.get()) * (older - younger));

    if expected.is_nan() {
        0.0
    } else {
        expected.max(0.0)
    }
}

/// Log-prior of the duplication/loss history in `locus_tree` under the
/// birth-death process inside `species_tree`, whose root branch lasts for
/// `t_root`. Lost lineages are removed first, so only the observed part of
/// the history matters.
///
/// # Errors
///
/// Returns a `ProbabilityError` if the locus tree is not a valid
/// duplication/loss history inside the species tree, see
/// [`DupLossTopology::new`].
pub fn prob_dup_loss_topology(
    locus_tree: &LocusTree,
    species_tree: &SpeciesTree,
    duprate: NonNegativeF64,
    lossrate: NonNegativeF64,
    t_root: NonNegativeF64,
    maxdoom: usize,
    add_spec: bool,
) -> Result<f64, ProbabilityError> {
    let observed = remove_lost_lineages(locus_tree, &DaughterSet::default(), false);
    let doom = DoomTable::new(species_tree, duprate, lossrate)?;

    let topology = DupLossTopology::new(
        &observed.locus_tree,
        species_tree,
        &doom,
        duprate,
        lossrate,
        maxdoom,
        add_spec,
    )?;

    Ok(topology.ln_prob(t_root))
}
