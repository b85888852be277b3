use fnv::FnvHashMap;

use dlcoal_core::{
    cogs::SeedableRng,
    locus::{DaughterSet, LocusEvent, LocusNode, LocusTree},
    tree::NodeId,
};
use dlcoal_core_bond::PositiveF64;
use dlcoal_impls_std::cogs::rng::chacha::ChaCha;

use super::{default_gene_name, sample_locus_coal_tree};
use crate::SamplingError;

fn locus_node(event: LocusEvent) -> LocusNode {
    LocusNode {
        event,
        species: NodeId::new(0),
    }
}

/// `(a:t,b:t)root:0` where the root is a duplication of kind `event`
fn cherry(t: f64, event: LocusEvent) -> (LocusTree, [NodeId; 3]) {
    let mut tree = LocusTree::new();

    let root = tree.add_node(None, 0.0, locus_node(event));
    let a = tree.add_node(Some(String::from("a")), t, locus_node(LocusEvent::Leaf));
    let b = tree.add_node(Some(String::from("b")), t, locus_node(LocusEvent::Leaf));

    tree.set_root(root);
    tree.add_child(root, a);
    tree.add_child(root, b);

    (tree, [root, a, b])
}

fn population(n: f64) -> PositiveF64 {
    PositiveF64::new(n).unwrap()
}

#[test]
fn test_single_leaf_with_many_genes() {
    let mut tree = LocusTree::new();
    let leaf = tree.add_node(Some(String::from("a")), 10.0, locus_node(LocusEvent::Leaf));
    tree.set_root(leaf);

    let mut counts = FnvHashMap::default();
    counts.insert(leaf, 3);

    let mut rng = ChaCha::seed_from_u64(42);

    let sample = sample_locus_coal_tree(
        &tree,
        population(100.0),
        Some(&counts),
        &DaughterSet::default(),
        default_gene_name,
        &mut rng,
    )
    .unwrap();

    assert_eq!(sample.coal_tree.len(), 5);
    assert!(sample.coal_tree.node_ids().all(|gene| sample.coal_recon.get(gene) == Some(leaf)));

    let mut names: Vec<&str> = sample
        .coal_tree
        .leaves()
        .into_iter()
        .filter_map(|gene| sample.coal_tree.node(gene).name())
        .collect();
    names.sort_unstable();

    assert_eq!(names, vec!["a", "a_1", "a_2"]);
}

#[test]
fn test_no_surviving_genes() {
    let mut tree = LocusTree::new();
    let lost = tree.add_node(None, 10.0, locus_node(LocusEvent::Loss));
    tree.set_root(lost);

    let mut rng = ChaCha::seed_from_u64(1);

    let sample = sample_locus_coal_tree(
        &tree,
        population(1.0),
        None,
        &DaughterSet::default(),
        default_gene_name,
        &mut rng,
    )
    .unwrap();

    assert_eq!(sample.coal_tree.len(), 1);
    assert_eq!(sample.coal_recon.get(NodeId::new(0)), Some(lost));
}

#[test]
fn test_missing_leaf_count() {
    let (tree, [_, a, b]) = cherry(1.0, LocusEvent::Speciation);

    let mut counts = FnvHashMap::default();
    counts.insert(a, 2);

    let mut rng = ChaCha::seed_from_u64(1);

    assert_eq!(
        sample_locus_coal_tree(
            &tree,
            population(1.0),
            Some(&counts),
            &DaughterSet::default(),
            default_gene_name,
            &mut rng,
        )
        .map(|_| ()),
        Err(SamplingError::MissingLeafCount(b))
    );
}

#[test]
fn test_gene_tree_is_ultrametric() {
    let (tree, [_, a, b]) = cherry(3.0, LocusEvent::Speciation);

    let mut counts = FnvHashMap::default();
    counts.insert(a, 4);
    counts.insert(b, 3);

    let mut rng = ChaCha::seed_from_u64(9);

    for _ in 0..100 {
        let sample = sample_locus_coal_tree(
            &tree,
            population(2.0),
            Some(&counts),
            &DaughterSet::default(),
            default_gene_name,
            &mut rng,
        )
        .unwrap();

        let depths = sample.coal_tree.depths();
        let leaves = sample.coal_tree.leaves();

        assert_eq!(leaves.len(), 7);

        for gene in sample.coal_tree.preorder() {
            assert!(sample.coal_tree.node(gene).dist() >= 0.0);
        }

        for leaf in &leaves {
            assert!((depths[leaf.get()] - depths[leaves[0].get()]).abs() < 1e-9);
        }
    }
}

#[test]
fn test_censored_coalescence_frequency() {
    let (tree, [_, a, b]) = cherry(50.0, LocusEvent::Speciation);

    let mut counts = FnvHashMap::default();
    counts.insert(a, 2);
    counts.insert(b, 1);

    let n = 50.0;
    let mut rng = ChaCha::seed_from_u64(2022);

    let draws = 20_000;
    let mut coalesced_in_a = 0_u32;

    for _ in 0..draws {
        let sample = sample_locus_coal_tree(
            &tree,
            population(n),
            Some(&counts),
            &DaughterSet::default(),
            default_gene_name,
            &mut rng,
        )
        .unwrap();

        if sample
            .coal_tree
            .node_ids()
            .any(|gene| {
                !sample.coal_tree.node(gene).is_leaf() && sample.coal_recon.get(gene) == Some(a)
            })
        {
            coalesced_in_a += 1;
        }
    }

    let frequency = f64::from(coalesced_in_a) / f64::from(draws);
    let expected = 1.0 - (-50.0_f64 / n).exp();

    // Five binomial standard errors
    assert!((frequency - expected).abs() < 0.02, "{} vs {}", frequency, expected);
}

#[test]
fn test_daughter_branch_coalesces_completely() {
    let (tree, [_, a, b]) = cherry(0.5, LocusEvent::Duplication);

    let mut counts = FnvHashMap::default();
    counts.insert(a, 4);
    counts.insert(b, 2);

    let mut daughters = DaughterSet::default();
    daughters.insert(a);

    let mut rng = ChaCha::seed_from_u64(3);

    for _ in 0..200 {
        let sample = sample_locus_coal_tree(
            &tree,
            population(1000.0),
            Some(&counts),
            &daughters,
            default_gene_name,
            &mut rng,
        )
        .unwrap();

        let coalescences_in_a = sample
            .coal_tree
            .node_ids()
            .filter(|gene| {
                !sample.coal_tree.node(*gene).is_leaf() && sample.coal_recon.get(*gene) == Some(a)
            })
            .count();

        assert_eq!(coalescences_in_a, 3);

        // Every gene from the daughter finds a parent inside its branch
        for gene in sample.coal_tree.leaves() {
            if sample.coal_recon.get(gene) == Some(a) {
                assert!(sample.coal_tree.node(gene).dist() <= 0.5 + 1e-9);
            }
        }
    }
}
