use crate::tree::NodeId;

use super::{
    count_gene_leaves, remove_lost_lineages, DaughterSet, LocusEvent, LocusNode, LocusTree,
};

/// A speciation into species 1 and 2, where the copy in species 1 was
/// duplicated and its daughter copy was lost, and the copy in species 2 was
/// lost.
///
/// `((a:1,lost:1)dup:1,lost:2)spec:0`
fn locus_tree_with_losses() -> (LocusTree, [NodeId; 5]) {
    let mut tree = LocusTree::new();

    let node = |event, species| LocusNode {
        event,
        species: NodeId::new(species),
    };

    let spec = tree.add_node(None, 0.0, node(LocusEvent::Speciation, 0));
    let dup = tree.add_node(None, 1.0, node(LocusEvent::Duplication, 1));
    let a = tree.add_node(Some(String::from("a")), 1.0, node(LocusEvent::Leaf, 1));
    let lost_daughter = tree.add_node(None, 1.0, node(LocusEvent::Loss, 1));
    let lost = tree.add_node(None, 2.0, node(LocusEvent::Loss, 2));

    tree.set_root(spec);
    tree.add_child(spec, dup);
    tree.add_child(dup, a);
    tree.add_child(dup, lost_daughter);
    tree.add_child(spec, lost);

    (tree, [spec, dup, a, lost_daughter, lost])
}

#[test]
fn test_count_gene_leaves() {
    let (tree, _) = locus_tree_with_losses();

    assert_eq!(count_gene_leaves(&tree), 1);
}

#[test]
fn test_remove_lost_lineages_keeps_speciations() {
    let (tree, [spec, dup, a, lost_daughter, lost]) = locus_tree_with_losses();

    let mut daughters = DaughterSet::default();
    daughters.insert(lost_daughter);

    let restructured = remove_lost_lineages(&tree, &daughters, false);
    let new_tree = &restructured.locus_tree;

    assert_eq!(new_tree.len(), 2);
    assert!(restructured.daughters.is_empty());
    assert_eq!(restructured.map.get(lost), None);
    assert_eq!(restructured.map.get(dup), restructured.map.get(a));

    let new_spec = restructured.map.get(spec).unwrap();
    let new_a = restructured.map.get(a).unwrap();

    assert_eq!(new_tree.root(), Some(new_spec));
    assert_eq!(new_tree.node(new_spec).children(), &[new_a]);
    assert_eq!(new_tree.node(new_a).dist(), 2.0);
    assert_eq!(new_tree.node(new_a).data().event, LocusEvent::Leaf);
}

#[test]
fn test_remove_lost_lineages_collapses_speciations() {
    let (tree, [spec, _dup, a, _lost_daughter, _lost]) = locus_tree_with_losses();

    let restructured = remove_lost_lineages(&tree, &DaughterSet::default(), true);

    assert_eq!(restructured.locus_tree.len(), 1);
    assert_eq!(restructured.map.get(spec), restructured.map.get(a));
    assert_eq!(restructured.locus_tree.root(), restructured.map.get(a));
}

#[test]
fn test_surviving_daughter_is_kept() {
    let (mut tree, [_spec, dup, _a, lost_daughter, _lost]) = locus_tree_with_losses();

    // Let the daughter survive instead
    *tree.data_mut(lost_daughter) = LocusNode {
        event: LocusEvent::Leaf,
        species: NodeId::new(1),
    };

    let mut daughters = DaughterSet::default();
    daughters.insert(lost_daughter);

    let restructured = remove_lost_lineages(&tree, &daughters, false);

    let new_daughter = restructured.map.get(lost_daughter).unwrap();

    assert!(restructured.daughters.contains(&new_daughter));
    assert_eq!(
        restructured.locus_tree.node(new_daughter).parent(),
        restructured.map.get(dup)
    );
}
