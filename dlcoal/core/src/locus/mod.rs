use fnv::FnvHashSet;
use serde::{Deserialize, Serialize};

use crate::tree::{IdMap, NodeId, Tree};

/// What happened at the bottom of a locus tree branch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LocusEvent {
    /// The lineage was copied into every child species branch
    Speciation,
    /// The lineage was duplicated within its species branch
    Duplication,
    /// The lineage went extinct
    Loss,
    /// The lineage survived to an extant species
    Leaf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocusNode {
    pub event: LocusEvent,
    /// The species branch, named by its bottom node, that contains this node
    pub species: NodeId,
}

pub type SpeciesTree = Tree;
pub type LocusTree = Tree<LocusNode>;
pub type CoalescentTree = Tree;

/// Locus tree nodes that start a new gene copy below a duplication
pub type DaughterSet = FnvHashSet<NodeId>;

impl LocusNode {
    #[must_use]
    pub fn is_gene_leaf(&self) -> bool {
        self.event == LocusEvent::Leaf
    }
}

/// Number of locus leaves that carry an extant gene copy
#[must_use]
pub fn count_gene_leaves(locus_tree: &LocusTree) -> usize {
    locus_tree
        .leaves()
        .into_iter()
        .filter(|leaf| locus_tree.node(*leaf).data().is_gene_leaf())
        .count()
}

/// A locus tree rebuilt by [`remove_lost_lineages`]
#[derive(Debug, Clone)]
pub struct RestructuredLocusTree {
    pub locus_tree: LocusTree,
    /// Map from the old locus nodes onto the rebuilt ones
    pub map: IdMap,
    pub daughters: DaughterSet,
}

/// Prunes lost gene lineages and merges the duplications that are left with
/// a single child. Speciations that are left with a single child are only
/// merged if `collapse_speciations` is set, since they carry implied losses.
///
/// Daughters are kept if their duplication survived.
#[must_use]
pub fn remove_lost_lineages(
    locus_tree: &LocusTree,
    daughters: &DaughterSet,
    collapse_speciations: bool,
) -> RestructuredLocusTree {
    let (pruned, prune_map) = locus_tree.prune(|_, node| node.data().event != LocusEvent::Loss);
    let (collapsed, collapse_map) = pruned.collapse_single_children_where(|_, node| {
        collapse_speciations || node.data().event == LocusEvent::Duplication
    });

    let map = prune_map.then(&collapse_map);

    let daughters = daughters
        .iter()
        .filter_map(|daughter| {
            let new_daughter = map.get(*daughter)?;
            let new_parent = collapsed.node(new_daughter).parent()?;

            let duplication_survived = locus_tree
                .node(*daughter)
                .parent()
                .and_then(|parent| map.get(parent))
                == Some(new_parent)
                && collapsed.node(new_parent).data().event == LocusEvent::Duplication;

            duplication_survived.then_some(new_daughter)
        })
        .collect();

    RestructuredLocusTree {
        locus_tree: collapsed,
        map,
        daughters,
    }
}

#[cfg(test)]
mod test;
