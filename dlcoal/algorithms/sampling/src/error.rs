use std::num::NonZeroU64;

use dlcoal_core::tree::NodeId;

#[derive(thiserror::Error, displaydoc::Display, Debug, Clone, PartialEq, Eq)]
pub enum SamplingError {
    /// the species tree has no root
    EmptySpeciesTree,
    /// the locus tree has no root
    EmptyLocusTree,
    /// no gene count was given for locus leaf {0}
    MissingLeafCount(NodeId),
    /// no draw was accepted within {attempts} attempts
    Exhausted { attempts: NonZeroU64 },
}
