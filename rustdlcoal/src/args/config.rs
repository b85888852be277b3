use std::num::NonZeroU64;

use anyhow::Result;
use fnv::FnvHashSet;
use serde::{Deserialize, Serialize};

use dlcoal_algorithms_probability::joint::ReconProbabilityOptions;
use dlcoal_algorithms_sampling::pipeline::PipelineOptions;
use dlcoal_core::{locus::SpeciesTree, tree::NodeId};
use dlcoal_core_bond::{NonNegativeF64, PositiveF64};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SimulateArgs {
    pub species: SpeciesTreeConfig,
    pub population: PositiveF64,
    pub duplication: NonNegativeF64,
    pub loss: NonNegativeF64,
    #[serde(alias = "randomness")]
    #[serde(default)]
    pub rng: RngConfig,
    #[serde(default = "default_draws")]
    pub draws: NonZeroU64,
    #[serde(default)]
    pub sample: PipelineOptions,
    /// Score every draw with these options
    #[serde(default)]
    pub score: Option<ReconProbabilityOptions>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScoreArgs {
    pub species: SpeciesTreeConfig,
    pub population: PositiveF64,
    pub duplication: NonNegativeF64,
    pub loss: NonNegativeF64,
    #[serde(alias = "randomness")]
    #[serde(default)]
    pub rng: RngConfig,
    #[serde(default)]
    pub sample: PipelineOptions,
    #[serde(default)]
    pub score: ReconProbabilityOptions,
}

fn default_draws() -> NonZeroU64 {
    NonZeroU64::MIN
}

/// A species tree node with the length of the branch above it
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
#[allow(clippy::module_name_repetitions)]
pub struct SpeciesTreeConfig {
    pub name: String,
    #[serde(default = "NonNegativeF64::zero")]
    pub dist: NonNegativeF64,
    #[serde(default)]
    pub children: Vec<SpeciesTreeConfig>,
}

impl SpeciesTreeConfig {
    /// # Errors
    ///
    /// Fails if two species share the same name.
    pub fn build(&self) -> Result<SpeciesTree> {
        let mut tree = SpeciesTree::new();
        let mut names = FnvHashSet::default();

        let root = self.add_to(&mut tree, &mut names)?;
        tree.set_root(root);

        Ok(tree)
    }

    fn add_to<'a>(
        &'a self,
        tree: &mut SpeciesTree,
        names: &mut FnvHashSet<&'a str>,
    ) -> Result<NodeId> {
        anyhow::ensure!(
            names.insert(&self.name),
            "The species name {:?} is not unique.",
            self.name
        );

        let node = tree.add_node(Some(self.name.clone()), self.dist.get(), ());

        for child in &self.children {
            let child = child.add_to(tree, names)?;
            tree.add_child(node, child);
        }

        Ok(node)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub enum RngConfig {
    Entropy,
    Seed(u64),
}

impl Default for RngConfig {
    fn default() -> Self {
        Self::Entropy
    }
}

impl RngConfig {
    /// # Errors
    ///
    /// Fails if no entropy seed can be drawn from the operating system.
    pub fn seed(self) -> Result<u64> {
        match self {
            Self::Seed(seed) => Ok(seed),
            Self::Entropy => {
                let mut entropy = [0_u8; 8];

                getrandom::getrandom(&mut entropy)
                    .map_err(|err| anyhow::anyhow!("Failed to draw an entropy seed: {}", err))?;

                Ok(u64::from_le_bytes(entropy))
            },
        }
    }
}
