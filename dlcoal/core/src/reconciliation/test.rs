use crate::{
    locus::{LocusEvent, LocusNode, LocusTree},
    tree::{NodeId, Tree},
};

use super::Reconciliation;

#[test]
fn test_insert_and_get() {
    let mut recon = Reconciliation::with_len(2);

    assert!(recon.is_empty());

    recon.insert(NodeId::new(1), NodeId::new(7));
    recon.insert(NodeId::new(4), NodeId::new(0));

    assert_eq!(recon.get(NodeId::new(0)), None);
    assert_eq!(recon.get(NodeId::new(1)), Some(NodeId::new(7)));
    assert_eq!(recon.get(NodeId::new(4)), Some(NodeId::new(0)));
    assert_eq!(recon.get(NodeId::new(9)), None);
    assert_eq!(recon.len(), 2);
    assert_eq!(
        recon.iter().collect::<Vec<_>>(),
        vec![
            (NodeId::new(1), NodeId::new(7)),
            (NodeId::new(4), NodeId::new(0))
        ]
    );
}

#[test]
fn test_from_locus_tree_and_remap() {
    let species = NodeId::new(3);

    let mut locus_tree = LocusTree::new();
    let top = locus_tree.add_node(
        None,
        1.0,
        LocusNode {
            event: LocusEvent::Duplication,
            species,
        },
    );
    let leaf = locus_tree.add_node(
        Some(String::from("a")),
        1.0,
        LocusNode {
            event: LocusEvent::Leaf,
            species,
        },
    );
    let lost = locus_tree.add_node(
        None,
        0.5,
        LocusNode {
            event: LocusEvent::Loss,
            species,
        },
    );
    locus_tree.set_root(top);
    locus_tree.add_child(top, leaf);
    locus_tree.add_child(top, lost);

    let locus_recon = Reconciliation::from_locus_tree(&locus_tree);
    assert_eq!(locus_recon.len(), 3);
    assert_eq!(locus_recon.get(lost), Some(species));

    let mut coal_recon = Reconciliation::default();
    coal_recon.insert(NodeId::new(0), leaf);
    coal_recon.insert(NodeId::new(1), top);

    let (pruned, prune_map) = locus_tree.prune(|_, node| node.data().event != LocusEvent::Loss);
    let (collapsed, collapse_map) = pruned.collapse_single_children();
    let map = prune_map.then(&collapse_map);

    let remapped = coal_recon.remap_targets(&map);
    let new_leaf = collapsed.root();

    assert_eq!(remapped.get(NodeId::new(0)), new_leaf);
    assert_eq!(remapped.get(NodeId::new(1)), new_leaf);

    let empty: Tree = Tree::new();
    assert!(empty.leaves().is_empty());
}
