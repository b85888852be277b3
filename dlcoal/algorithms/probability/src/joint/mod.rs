//! Joint probability of a reconciled gene tree topology under gene
//! duplication, loss and the multispecies coalescent.
//!
//! The observed duplications fix the topology of the locus tree, but not
//! the times of its duplications. These are integrated out by importance
//! sampling: every Monte-Carlo draw places the duplications uniformly into
//! their allowed windows and is weighted by the node age density of the
//! reconstructed birth-death process.
//!
//! Duplications whose mother copy left no sampled descendants are not part
//! of the observed locus tree. They still force the gene lineages of their
//! daughter copy to coalesce, and are marginalised per locus branch.

use core::{
    f64::consts::LN_2,
    num::{NonZeroU32, NonZeroU64},
};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use dlcoal_core::{
    cogs::{
        distribution::{Exponential, Lambda, UniformClosedOpenUnit},
        SampledDistribution, SeedableRng, SplittableRng,
    },
    locus::{
        remove_lost_lineages, CoalescentTree, DaughterSet, LocusEvent, LocusNode, LocusTree,
        SpeciesTree,
    },
    reconciliation::Reconciliation,
    tree::NodeId,
};
use dlcoal_core_bond::{NonNegativeF64, PositiveF64};

use crate::{
    birth_death::{expected_hidden_daughters, DoomTable, DupLossTopology, NodeAgeDensity},
    coalescent::CoalescentTopology,
    estimate::{Estimate, LogSampleSum},
    ProbabilityError,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReconProbabilityOptions {
    /// Length of the branch above the species root, used if the species
    /// root has no branch length of its own
    pub pretime: Option<PositiveF64>,
    /// Mean of the exponential prior on the length of the branch above the
    /// species root, used if neither the species root nor `pretime` fix it
    pub premean: Option<PositiveF64>,
    /// Maximum number of doomed lineages summed over per species branch
    pub maxdoom: usize,
    pub nsamples: NonZeroU64,
    /// Accept locus branches that span several species branches
    pub add_spec: bool,
}

impl Default for ReconProbabilityOptions {
    fn default() -> Self {
        Self {
            pretime: None,
            premean: None,
            maxdoom: 20,
            nsamples: NonZeroU64::new(100).unwrap_or(NonZeroU64::MIN),
            add_spec: true,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum RootTime {
    Fixed(NonNegativeF64),
    Exponential { mean: PositiveF64 },
}

/// Times of the species branches, measured from the top of the branch above
/// the species root
struct SpeciesClock<'a> {
    species_tree: &'a SpeciesTree,
    species_root: NodeId,
    depths: &'a [f64],
    t_root: f64,
}

impl SpeciesClock<'_> {
    fn bottom(&self, species: NodeId) -> f64 {
        self.t_root + self.depths[species.get()]
    }

    fn top(&self, species: NodeId) -> f64 {
        if species == self.species_root {
            0.0
        } else {
            self.bottom(species) - self.species_tree.node(species).dist()
        }
    }

    /// Expected number of hidden daughter-only duplications along every
    /// locus branch, given the times of all locus nodes
    fn expected_hidden_daughters(
        &self,
        locus_tree: &LocusTree,
        times: &[f64],
        doom: &DoomTable,
        duprate: NonNegativeF64,
        lossrate: NonNegativeF64,
    ) -> Vec<f64> {
        locus_tree
            .node_ids()
            .map(|locus| {
                let Some(parent) = locus_tree.node(locus).parent() else {
                    return 0.0;
                };
                let (start, end) = (times[parent.get()], times[locus.get()]);

                let mut expected = 0.0;
                let mut species = Some(locus_tree.node(locus).data().species);

                // Walk up the species branches that the locus branch spans
                while let Some(current) = species {
                    let (top, bottom) = (self.top(current), self.bottom(current));
                    let (from, to) = (top.max(start), bottom.min(end));

                    if to > from {
                        expected += expected_hidden_daughters(
                            bottom - to,
                            bottom - from,
                            duprate,
                            lossrate,
                            doom.bottom(current),
                        );
                    }

                    if top <= start {
                        break;
                    }

                    species = self.species_tree.node(current).parent();
                }

                expected
            })
            .collect()
    }
}

/// Log-probability of the reconciled topology of `coal_tree` under the
/// joint duplication, loss and coalescent model inside `species_tree`.
///
/// Lost lineages of `locus_tree` are removed first, `locus_recon` places
/// every locus node into its species branch. The topology of the observed
/// duplication/loss history is scored exactly, while its duplication times
/// are integrated out with `options.nsamples` Monte-Carlo draws. The draws
/// use independent streams split off `rng`, and are combined in a fixed
/// order, such that the estimate is reproducible for a given `rng`.
///
/// # Errors
///
/// Returns a `ProbabilityError` if the reconciliations are invalid or the
/// locus tree is not a valid duplication/loss history inside the species
/// tree.
#[allow(clippy::too_many_arguments, clippy::too_many_lines)]
pub fn prob_dlcoal_recon_topology<G: SplittableRng + Send + Sync>(
    coal_tree: &CoalescentTree,
    coal_recon: &Reconciliation,
    locus_tree: &LocusTree,
    locus_recon: &Reconciliation,
    daughters: &DaughterSet,
    species_tree: &SpeciesTree,
    n: PositiveF64,
    duprate: NonNegativeF64,
    lossrate: NonNegativeF64,
    options: &ReconProbabilityOptions,
    rng: &mut G,
) -> Result<Estimate, ProbabilityError> {
    let species_root = species_tree
        .root()
        .ok_or(ProbabilityError::EmptySpeciesTree)?;
    let locus_root = locus_tree.root().ok_or(ProbabilityError::EmptyLocusTree)?;
    let coal_root = coal_tree
        .root()
        .ok_or(ProbabilityError::EmptyCoalescentTree)?;

    for locus in locus_tree.preorder_from(locus_root) {
        let species = locus_recon
            .get(locus)
            .ok_or(ProbabilityError::UnmappedLocusNode(locus))?;

        if !species_tree.contains(species) {
            return Err(ProbabilityError::InvalidLocusTarget { locus, species });
        }
    }

    for daughter in daughters {
        let is_copy = locus_tree.contains(*daughter)
            && locus_tree.node(*daughter).parent().map_or(false, |parent| {
                locus_tree.node(parent).data().event == LocusEvent::Duplication
            });

        if !is_copy {
            return Err(ProbabilityError::InvalidDaughter { locus: *daughter });
        }
    }

    let reconciled = locus_tree.map_data(|locus, node| LocusNode {
        species: locus_recon.get(locus).unwrap_or(node.data().species),
        ..*node.data()
    });

    let observed = remove_lost_lineages(&reconciled, daughters, false);

    if observed.locus_tree.root().is_none() {
        return Err(ProbabilityError::NoExtantGenes);
    }

    let observed_recon = coal_recon.remap_targets(&observed.map);

    let mut attached = vec![false; locus_tree.len()];
    for locus in locus_tree.preorder_from(locus_root) {
        attached[locus.get()] = true;
    }

    for gene in coal_tree.preorder_from(coal_root) {
        let locus = coal_recon
            .get(gene)
            .ok_or(ProbabilityError::UnmappedCoalescentNode(gene))?;

        if !(locus_tree.contains(locus) && attached[locus.get()]) {
            return Err(ProbabilityError::InvalidCoalescentTarget { gene, locus });
        }

        if observed_recon.get(gene).is_none() {
            return Err(ProbabilityError::ReconciledToLostLineage { gene });
        }
    }

    let topology = CoalescentTopology::new(
        coal_tree,
        &observed_recon,
        &observed.locus_tree,
        &observed.daughters,
    )?;

    let doom = DoomTable::new(species_tree, duprate, lossrate)?;
    let prior = DupLossTopology::new(
        &observed.locus_tree,
        species_tree,
        &doom,
        duprate,
        lossrate,
        options.maxdoom,
        options.add_spec,
    )?;

    if prior.ln_prob_below_root() == f64::NEG_INFINITY {
        return Ok(Estimate::exact(f64::NEG_INFINITY));
    }

    let species_root_dist = species_tree.node(species_root).dist();

    let root_time = if species_root_dist > 0.0 {
        RootTime::Fixed(
            NonNegativeF64::new(species_root_dist).unwrap_or_else(|_| NonNegativeF64::infinity()),
        )
    } else if let Some(pretime) = options.pretime {
        RootTime::Fixed(pretime.into())
    } else if let Some(premean) = options.premean {
        RootTime::Exponential { mean: premean }
    } else if prior.root_tips() > 1 {
        return Err(ProbabilityError::DuplicationAboveRoot);
    } else {
        RootTime::Fixed(NonNegativeF64::zero())
    };

    let observed_dist = |locus: NodeId| observed.locus_tree.node(locus).dist();

    let species_depths = species_tree.depths();
    let depths: &[f64] = &species_depths;
    let clock_at = |t_root: f64| SpeciesClock {
        species_tree,
        species_root,
        depths,
        t_root,
    };
    let speciation_times = |clock: &SpeciesClock| -> Vec<f64> {
        observed
            .locus_tree
            .node_ids()
            .map(|locus| clock.bottom(observed.locus_tree.node(locus).data().species))
            .collect()
    };

    if let RootTime::Fixed(t_root) = root_time {
        if prior.duplications().is_empty() {
            let clock = clock_at(t_root.get());
            let hidden = clock.expected_hidden_daughters(
                &observed.locus_tree,
                &speciation_times(&clock),
                &doom,
                duprate,
                lossrate,
            );

            return Ok(Estimate::exact(
                prior.ln_prob(t_root)
                    + topology.ln_prob_with_hidden_daughters(
                        observed_dist,
                        |locus| hidden[locus.get()],
                        n,
                    ),
            ));
        }
    }

    #[allow(clippy::cast_precision_loss)]
    let ln_daughters = -(prior.duplications().len() as f64) * LN_2;

    log::debug!(
        "Integrating over the times of {} duplications with {} samples.",
        prior.duplications().len(),
        options.nsamples
    );

    // The root branch density is drawn with the root time if that is random
    let mut densities: Vec<Option<NodeAgeDensity>> = vec![None; species_tree.len()];
    for duplication in prior.duplications() {
        let species = duplication.species;

        let length = match root_time {
            _ if species != species_root => species_tree.node(species).dist(),
            RootTime::Fixed(t_root) => t_root.get(),
            RootTime::Exponential { .. } => continue,
        };

        densities[species.get()] = Some(NodeAgeDensity::new(
            length,
            duprate,
            lossrate,
            doom.bottom(species),
        ));
    }

    let is_duplication = |locus: NodeId| {
        prior
            .duplications()
            .iter()
            .any(|duplication| duplication.locus == locus)
    };
    let timed_by_duplication: Vec<bool> = observed
        .locus_tree
        .node_ids()
        .map(|locus| {
            is_duplication(locus)
                || observed
                    .locus_tree
                    .node(locus)
                    .parent()
                    .map_or(false, is_duplication)
        })
        .collect();

    let sample = |mut rng: G| -> LogSampleSum {
        let (t_root, ln_root_prior) = match root_time {
            RootTime::Fixed(t_root) => (t_root, 0.0),
            RootTime::Exponential { mean } => {
                let unit = Exponential::sample_with(
                    &mut rng,
                    Lambda(PositiveF64::from(NonZeroU32::MIN)),
                );
                let t_root = unit * NonNegativeF64::from(mean);

                (t_root, prior.ln_prob(t_root))
            },
        };
        let clock = clock_at(t_root.get());

        let mut times = speciation_times(&clock);

        let root_density = match root_time {
            RootTime::Exponential { .. } => Some(NodeAgeDensity::new(
                clock.t_root,
                duprate,
                lossrate,
                doom.bottom(species_root),
            )),
            RootTime::Fixed(_) => None,
        };

        let mut ln_weight = 0.0;

        for duplication in prior.duplications() {
            let earliest = observed
                .locus_tree
                .node(duplication.locus)
                .parent()
                .map_or(0.0, |parent| times[parent.get()])
                .max(clock.top(duplication.species));
            let latest = clock.bottom(duplication.species);
            let window = (latest - earliest).max(0.0);

            let time = earliest + UniformClosedOpenUnit::sample(&mut rng) * window;
            times[duplication.locus.get()] = time;

            let ln_density = densities[duplication.species.get()]
                .or(root_density)
                .map_or(f64::NEG_INFINITY, |density| density.ln_density(latest - time));

            #[allow(clippy::cast_precision_loss)]
            let ln_nested = (duplication.nested as f64).ln();

            ln_weight += ln_nested + ln_density + window.ln();
        }

        let dist = |locus: NodeId| {
            if timed_by_duplication[locus.get()] {
                observed
                    .locus_tree
                    .node(locus)
                    .parent()
                    .map_or(0.0, |parent| times[locus.get()] - times[parent.get()])
            } else {
                observed_dist(locus)
            }
        };

        let hidden =
            clock.expected_hidden_daughters(&observed.locus_tree, &times, &doom, duprate, lossrate);

        let ln_prob_coal =
            topology.ln_prob_with_hidden_daughters(dist, |locus| hidden[locus.get()], n);

        LogSampleSum::single(ln_root_prior + ln_weight + ln_prob_coal, ln_weight)
    };

    let base = G::seed_from_u64(rng.sample_u64());

    let sum = (0..options.nsamples.get())
        .into_par_iter()
        .map(|stream| sample(base.clone().split_to_stream(stream)))
        .collect::<Vec<LogSampleSum>>()
        .into_iter()
        .fold(LogSampleSum::default(), LogSampleSum::combine);

    let estimate = sum.estimate();

    let ln_fixed = match root_time {
        RootTime::Fixed(t_root) => prior.ln_prob(t_root),
        RootTime::Exponential { .. } => 0.0,
    };

    let estimate = Estimate {
        log_prob: ln_fixed + ln_daughters + estimate.log_prob,
        ..estimate
    };

    if estimate.is_low_confidence() && estimate.log_prob.is_finite() {
        log::warn!(
            "The estimate {} from {} samples is unreliable: its relative standard error is {} \
             and its effective sample size is {}.",
            estimate.log_prob,
            estimate.nsamples,
            estimate.relative_std_error,
            estimate.effective_sample_size
        );
    }

    Ok(estimate)
}
