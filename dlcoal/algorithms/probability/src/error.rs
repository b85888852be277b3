use dlcoal_core::tree::NodeId;

#[allow(clippy::enum_variant_names)]
#[derive(thiserror::Error, displaydoc::Display, Debug, Clone, PartialEq, Eq)]
pub enum ProbabilityError {
    /// the coalescent tree has no root
    EmptyCoalescentTree,
    /// the locus tree has no root
    EmptyLocusTree,
    /// the species tree has no root
    EmptySpeciesTree,
    /// species branch {species} has a negative or undefined length
    InvalidSpeciesBranch { species: NodeId },
    /// the locus tree has no extant gene copies
    NoExtantGenes,
    /// coalescent node {0} is not reconciled to the locus tree
    UnmappedCoalescentNode(NodeId),
    /// locus node {0} is not reconciled to the species tree
    UnmappedLocusNode(NodeId),
    /// coalescent node {gene} is reconciled to locus node {locus}, which does not exist
    InvalidCoalescentTarget { gene: NodeId, locus: NodeId },
    /// locus node {locus} is reconciled to species node {species}, which does not exist
    InvalidLocusTarget { locus: NodeId, species: NodeId },
    /// coalescent leaf {gene} is reconciled to locus node {locus}, which is not an extant gene copy
    LeafNotOnLocusLeaf { gene: NodeId, locus: NodeId },
    /// coalescent node {gene} is reconciled below the locus branch of its child {child}
    NonMonotonicReconciliation { gene: NodeId, child: NodeId },
    /// coalescent node {gene} is reconciled to a lost gene copy
    ReconciledToLostLineage { gene: NodeId },
    /// locus branch {locus} has more coalescences than lineages
    TooManyCoalescences { locus: NodeId },
    /// {lineages} lineages are left uncoalesced at the locus root
    UnresolvedRoot { lineages: usize },
    /// locus node {locus} is not reconciled below the species branch of its parent
    BranchOutsideSpecies { locus: NodeId },
    /// locus branch {locus} crosses a species boundary, but implied speciations are disabled
    ImpliedSpeciation { locus: NodeId },
    /// locus node {locus} is not a valid speciation
    InvalidSpeciation { locus: NodeId },
    /// locus leaf {locus} is not reconciled to an extant species
    InvalidLeaf { locus: NodeId },
    /// locus node {locus} is a duplication without exactly two copies
    NonBinaryDuplication { locus: NodeId },
    /// locus node {locus} is a daughter but not the child of a duplication
    InvalidDaughter { locus: NodeId },
    /// duplications predate the species root, but there is no time before the root
    DuplicationAboveRoot,
}
