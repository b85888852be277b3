use crate::{
    locus::LocusTree,
    tree::{IdMap, NodeId},
};

/// Map from the nodes of one tree onto the nodes of another, e.g. from a
/// coalescent tree onto the locus tree branches its events happened in.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Reconciliation {
    map: Vec<Option<NodeId>>,
}

impl Reconciliation {
    #[must_use]
    pub fn with_len(len: usize) -> Self {
        Self {
            map: vec![None; len],
        }
    }

    /// The species reconciliation carried by every locus tree node
    #[must_use]
    pub fn from_locus_tree(locus_tree: &LocusTree) -> Self {
        Self {
            map: locus_tree
                .node_ids()
                .map(|id| Some(locus_tree.node(id).data().species))
                .collect(),
        }
    }

    pub fn insert(&mut self, from: NodeId, to: NodeId) {
        if from.get() >= self.map.len() {
            self.map.resize(from.get() + 1, None);
        }

        self.map[from.get()] = Some(to);
    }

    #[must_use]
    pub fn get(&self, from: NodeId) -> Option<NodeId> {
        self.map.get(from.get()).copied().flatten()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.map.iter().filter(|to| to.is_some()).count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, NodeId)> + '_ {
        self.map
            .iter()
            .enumerate()
            .filter_map(|(from, to)| to.map(|to| (NodeId::new(from), to)))
    }

    /// Rewrites the targets of the map after the target tree has been
    /// rebuilt. Entries whose target no longer exists are dropped.
    #[must_use]
    pub fn remap_targets(&self, target: &IdMap) -> Self {
        let mut remapped = Self::with_len(self.map.len());

        for (from, to) in self.iter() {
            if let Some(to) = target.get(to) {
                remapped.insert(from, to);
            }
        }

        remapped
    }
}

#[cfg(test)]
mod test;
