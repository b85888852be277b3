//! Rooted, ordered trees stored in an arena.
//!
//! Nodes are addressed by [`NodeId`]s, which stay valid for the lifetime of
//! the tree. Restructuring operations such as [`Tree::prune`] and
//! [`Tree::collapse_single_children`] build a new tree and return an
//! [`IdMap`] from the old to the new ids, so that any maps keyed by node can
//! be rewritten alongside.

use core::fmt;

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(usize);

impl NodeId {
    #[must_use]
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    #[must_use]
    pub const fn get(self) -> usize {
        self.0
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        write!(fmt, "#{}", self.0)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        write!(fmt, "#{}", self.0)
    }
}

#[derive(Debug, Clone)]
pub struct Node<D> {
    name: Option<String>,
    dist: f64,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    data: D,
}

impl<D> Node<D> {
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Length of the branch above this node
    #[must_use]
    pub fn dist(&self) -> f64 {
        self.dist
    }

    #[must_use]
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    #[must_use]
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    #[must_use]
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    #[must_use]
    pub fn data(&self) -> &D {
        &self.data
    }
}

#[derive(Debug, Clone)]
pub struct Tree<D = ()> {
    nodes: Vec<Node<D>>,
    root: Option<NodeId>,
}

impl<D> Default for Tree<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D> Tree<D> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            root: None,
        }
    }

    #[debug_ensures(ret.get() + 1 == self.nodes.len())]
    pub fn add_node(&mut self, name: Option<String>, dist: f64, data: D) -> NodeId {
        let id = NodeId(self.nodes.len());

        self.nodes.push(Node {
            name,
            dist,
            parent: None,
            children: Vec::new(),
            data,
        });

        id
    }

    #[debug_requires(self.nodes[child.0].parent.is_none(), "child is not yet attached")]
    #[debug_requires(parent != child, "a node cannot be its own child")]
    pub fn add_child(&mut self, parent: NodeId, child: NodeId) {
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
    }

    #[debug_requires(self.nodes[root.0].parent.is_none(), "the root has no parent")]
    pub fn set_root(&mut self, root: NodeId) {
        self.root = Some(root);
    }

    #[must_use]
    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    /// Number of nodes in the arena, including any unreachable from the root
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    #[must_use]
    pub fn contains(&self, id: NodeId) -> bool {
        id.0 < self.nodes.len()
    }

    #[must_use]
    pub fn node(&self, id: NodeId) -> &Node<D> {
        &self.nodes[id.0]
    }

    pub fn set_dist(&mut self, id: NodeId, dist: f64) {
        self.nodes[id.0].dist = dist;
    }

    pub fn set_name(&mut self, id: NodeId, name: Option<String>) {
        self.nodes[id.0].name = name;
    }

    pub fn data_mut(&mut self, id: NodeId) -> &mut D {
        &mut self.nodes[id.0].data
    }

    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> {
        (0..self.nodes.len()).map(NodeId)
    }

    #[must_use]
    pub fn find_by_name(&self, name: &str) -> Option<NodeId> {
        self.node_ids()
            .find(|id| self.nodes[id.0].name.as_deref() == Some(name))
    }

    /// Pre-order (parents before children, children in order) traversal of
    /// the subtree below `start`
    #[must_use]
    pub fn preorder_from(&self, start: NodeId) -> Vec<NodeId> {
        let mut order = Vec::new();
        let mut stack = vec![start];

        while let Some(id) = stack.pop() {
            order.push(id);
            stack.extend(self.nodes[id.0].children.iter().rev());
        }

        order
    }

    /// Post-order (children before parents) traversal of the subtree below
    /// `start`
    #[must_use]
    pub fn postorder_from(&self, start: NodeId) -> Vec<NodeId> {
        let mut order = Vec::new();
        let mut stack = vec![(start, false)];

        while let Some((id, expanded)) = stack.pop() {
            if expanded {
                order.push(id);
            } else {
                stack.push((id, true));
                stack.extend(self.nodes[id.0].children.iter().rev().map(|c| (*c, false)));
            }
        }

        order
    }

    #[must_use]
    pub fn preorder(&self) -> Vec<NodeId> {
        self.root
            .map_or_else(Vec::new, |root| self.preorder_from(root))
    }

    #[must_use]
    pub fn postorder(&self) -> Vec<NodeId> {
        self.root
            .map_or_else(Vec::new, |root| self.postorder_from(root))
    }

    #[must_use]
    pub fn subtree_leaves(&self, start: NodeId) -> Vec<NodeId> {
        self.preorder_from(start)
            .into_iter()
            .filter(|id| self.nodes[id.0].is_leaf())
            .collect()
    }

    #[must_use]
    pub fn leaves(&self) -> Vec<NodeId> {
        self.root
            .map_or_else(Vec::new, |root| self.subtree_leaves(root))
    }

    #[must_use]
    pub fn is_ancestor_or_self(&self, ancestor: NodeId, descendant: NodeId) -> bool {
        let mut current = Some(descendant);

        while let Some(id) = current {
            if id == ancestor {
                return true;
            }

            current = self.nodes[id.0].parent;
        }

        false
    }

    /// Distance from the root node down to every node reachable from it,
    /// indexed by node id (`NaN` for unreachable nodes)
    #[must_use]
    pub fn depths(&self) -> Vec<f64> {
        let mut depths = vec![f64::NAN; self.nodes.len()];

        for id in self.preorder() {
            depths[id.0] = match self.nodes[id.0].parent {
                Some(parent) => depths[parent.0] + self.nodes[id.0].dist,
                None => 0.0,
            };
        }

        depths
    }

    /// Rebuilds the tree with the same shape, mapping every node's payload
    pub fn map_data<E, F: FnMut(NodeId, &Node<D>) -> E>(&self, mut map: F) -> Tree<E> {
        Tree {
            nodes: self
                .nodes
                .iter()
                .enumerate()
                .map(|(index, node)| Node {
                    name: node.name.clone(),
                    dist: node.dist,
                    parent: node.parent,
                    children: node.children.clone(),
                    data: map(NodeId(index), node),
                })
                .collect(),
            root: self.root,
        }
    }
}

impl<D: Clone> Tree<D> {
    /// Removes every subtree that contains no leaf for which `keep_leaf`
    /// holds. Removed nodes map to `None`.
    #[must_use]
    pub fn prune<F: Fn(NodeId, &Node<D>) -> bool>(&self, keep_leaf: F) -> (Self, IdMap) {
        let mut alive = vec![false; self.nodes.len()];

        for id in self.postorder() {
            let node = &self.nodes[id.0];

            alive[id.0] = if node.is_leaf() {
                keep_leaf(id, node)
            } else {
                node.children.iter().any(|child| alive[child.0])
            };
        }

        let mut pruned = Tree::new();
        let mut map = IdMap(vec![None; self.nodes.len()]);

        let mut stack: Vec<(NodeId, Option<NodeId>)> = self
            .root
            .filter(|root| alive[root.0])
            .map(|root| (root, None))
            .into_iter()
            .collect();

        while let Some((id, parent)) = stack.pop() {
            let node = &self.nodes[id.0];

            let new_id = pruned.add_node(node.name.clone(), node.dist, node.data.clone());

            match parent {
                Some(parent) => pruned.add_child(parent, new_id),
                None => pruned.set_root(new_id),
            }

            map.0[id.0] = Some(new_id);

            stack.extend(
                node.children
                    .iter()
                    .rev()
                    .filter(|child| alive[child.0])
                    .map(|child| (*child, Some(new_id))),
            );
        }

        (pruned, map)
    }

    /// Merges every node with exactly one child into that child, adding up
    /// their branch lengths. A single-child root is collapsed as well.
    ///
    /// A merged node maps to the surviving node below it, since the merged
    /// branch is named by its bottom node.
    #[must_use]
    pub fn collapse_single_children(&self) -> (Self, IdMap) {
        self.collapse_single_children_where(|_, _| true)
    }

    /// Like [`Tree::collapse_single_children`], but only merges the
    /// single-child nodes for which `collapse` holds.
    #[must_use]
    pub fn collapse_single_children_where<F: Fn(NodeId, &Node<D>) -> bool>(
        &self,
        collapse: F,
    ) -> (Self, IdMap) {
        let merges = |id: NodeId| match self.nodes[id.0].children[..] {
            [only_child] if collapse(id, &self.nodes[id.0]) => Some(only_child),
            _ => None,
        };

        let mut collapsed = Tree::new();
        let mut map = IdMap(vec![None; self.nodes.len()]);

        let mut stack: Vec<(NodeId, Option<NodeId>, f64)> =
            self.root.map(|root| (root, None, 0.0)).into_iter().collect();

        while let Some((id, parent, extra)) = stack.pop() {
            let node = &self.nodes[id.0];

            if let Some(only_child) = merges(id) {
                stack.push((only_child, parent, extra + node.dist));
                continue;
            }

            let new_id =
                collapsed.add_node(node.name.clone(), node.dist + extra, node.data.clone());

            match parent {
                Some(parent) => collapsed.add_child(parent, new_id),
                None => collapsed.set_root(new_id),
            }

            map.0[id.0] = Some(new_id);

            stack.extend(
                node.children
                    .iter()
                    .rev()
                    .map(|child| (*child, Some(new_id), 0.0)),
            );
        }

        for id in self.postorder() {
            if let Some(only_child) = merges(id) {
                map.0[id.0] = map.0[only_child.0];
            }
        }

        (collapsed, map)
    }
}

/// Map from the node ids of a tree to the node ids of a tree rebuilt from it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdMap(Vec<Option<NodeId>>);

impl IdMap {
    #[must_use]
    pub fn identity(len: usize) -> Self {
        Self((0..len).map(|index| Some(NodeId(index))).collect())
    }

    #[must_use]
    pub fn get(&self, old: NodeId) -> Option<NodeId> {
        self.0.get(old.0).copied().flatten()
    }

    /// Composes `self: A -> B` with `then: B -> C`
    #[must_use]
    pub fn then(&self, then: &IdMap) -> IdMap {
        IdMap(
            self.0
                .iter()
                .map(|new| new.and_then(|new| then.get(new)))
                .collect(),
        )
    }
}
