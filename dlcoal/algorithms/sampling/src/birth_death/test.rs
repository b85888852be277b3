use dlcoal_core::{
    cogs::SeedableRng,
    locus::{count_gene_leaves, LocusEvent, SpeciesTree},
    tree::NodeId,
};
use dlcoal_core_bond::NonNegativeF64;
use dlcoal_impls_std::cogs::rng::chacha::ChaCha;

use super::sample_locus_tree;
use crate::SamplingError;

/// `((A:1000,B:1000)AB:500,(C:700,D:700)CD:800)R:0`
fn species_tree() -> SpeciesTree {
    let mut tree = SpeciesTree::new();

    let root = tree.add_node(Some(String::from("R")), 0.0, ());
    tree.set_root(root);

    for (clade, clade_dist, leaves) in [
        ("AB", 500.0, [("A", 1000.0), ("B", 1000.0)]),
        ("CD", 800.0, [("C", 700.0), ("D", 700.0)]),
    ] {
        let clade = tree.add_node(Some(String::from(clade)), clade_dist, ());
        tree.add_child(root, clade);

        for (leaf, leaf_dist) in leaves {
            let leaf = tree.add_node(Some(String::from(leaf)), leaf_dist, ());
            tree.add_child(clade, leaf);
        }
    }

    tree
}

fn rate(value: f64) -> NonNegativeF64 {
    NonNegativeF64::new(value).unwrap()
}

#[test]
fn test_zero_rates_copy_species_tree() {
    let species = species_tree();
    let mut rng = ChaCha::seed_from_u64(42);

    let sample = sample_locus_tree(&species, rate(0.0), rate(0.0), &mut rng).unwrap();
    let locus = &sample.locus_tree;

    assert_eq!(locus.len(), species.len());
    assert!(sample.daughters.is_empty());

    for (locus_node, species_node) in locus.preorder().into_iter().zip(species.preorder()) {
        assert_eq!(locus.node(locus_node).data().species, species_node);
        assert_eq!(sample.locus_recon.get(locus_node), Some(species_node));
        assert_eq!(locus.node(locus_node).dist(), species.node(species_node).dist());
        assert_eq!(
            locus.node(locus_node).children().len(),
            species.node(species_node).children().len()
        );
    }

    let leaf_names: Vec<&str> = locus
        .leaves()
        .into_iter()
        .filter_map(|leaf| locus.node(leaf).name())
        .collect();

    assert_eq!(leaf_names.len(), 4);
    assert!(leaf_names[0].starts_with("A_"));
    assert!(leaf_names[3].starts_with("D_"));
}

#[test]
fn test_duplications_have_one_daughter() {
    let species = species_tree();
    let mut rng = ChaCha::seed_from_u64(7);

    for _ in 0..50 {
        let sample = sample_locus_tree(&species, rate(0.002), rate(0.001), &mut rng).unwrap();
        let locus = &sample.locus_tree;

        for id in locus.preorder() {
            let node = locus.node(id);

            match node.data().event {
                LocusEvent::Duplication => {
                    assert_eq!(node.children().len(), 2);
                    assert_eq!(
                        node.children()
                            .iter()
                            .filter(|child| sample.daughters.contains(child))
                            .count(),
                        1
                    );

                    for child in node.children() {
                        assert_eq!(locus.node(*child).data().species, node.data().species);
                    }
                },
                LocusEvent::Speciation => {
                    let species_children = species.node(node.data().species).children();

                    assert_eq!(node.children().len(), species_children.len());
                },
                LocusEvent::Leaf => {
                    assert!(species.node(node.data().species).is_leaf());
                },
                LocusEvent::Loss => assert!(node.is_leaf()),
            }
        }

        for daughter in &sample.daughters {
            let parent = locus.node(*daughter).parent().unwrap();

            assert_eq!(locus.node(parent).data().event, LocusEvent::Duplication);
        }
    }
}

#[test]
fn test_certain_loss_leaves_no_genes() {
    let mut species = SpeciesTree::new();
    let root = species.add_node(Some(String::from("A")), 1e6, ());
    species.set_root(root);

    let mut rng = ChaCha::seed_from_u64(1);

    let sample = sample_locus_tree(&species, rate(0.0), rate(1.0), &mut rng).unwrap();

    assert_eq!(count_gene_leaves(&sample.locus_tree), 0);
    assert_eq!(sample.locus_tree.len(), 1);
    assert_eq!(
        sample.locus_tree.node(NodeId::new(0)).data().event,
        LocusEvent::Loss
    );
}

#[test]
fn test_mean_gene_count_matches_birth_death() {
    let mut species = SpeciesTree::new();
    let root = species.add_node(Some(String::from("A")), 2.0, ());
    species.set_root(root);

    let (birth, death) = (0.5, 0.2);
    let mut rng = ChaCha::seed_from_u64(2021);

    let draws = 20_000;
    let total: usize = (0..draws)
        .map(|_| {
            let sample = sample_locus_tree(&species, rate(birth), rate(death), &mut rng).unwrap();

            count_gene_leaves(&sample.locus_tree)
        })
        .sum();

    #[allow(clippy::cast_precision_loss)]
    let mean = (total as f64) / f64::from(draws);
    let expected = ((birth - death) * 2.0_f64).exp();

    // Five standard errors of the mean
    assert!((mean - expected).abs() < 0.07, "{} vs {}", mean, expected);
}

#[test]
fn test_empty_species_tree() {
    let mut rng = ChaCha::seed_from_u64(0);

    assert!(matches!(
        sample_locus_tree(&SpeciesTree::new(), rate(0.1), rate(0.1), &mut rng),
        Err(SamplingError::EmptySpeciesTree)
    ));
}
