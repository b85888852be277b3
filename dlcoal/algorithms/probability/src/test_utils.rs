use std::collections::BTreeMap;

use dlcoal_core::{
    locus::{CoalescentTree, DaughterSet, LocusEvent, LocusNode, LocusTree, SpeciesTree},
    reconciliation::Reconciliation,
    tree::NodeId,
};

pub fn species_node(
    tree: &mut SpeciesTree,
    name: &str,
    dist: f64,
    children: &[NodeId],
) -> NodeId {
    let id = tree.add_node(Some(String::from(name)), dist, ());

    for child in children {
        tree.add_child(id, *child);
    }

    id
}

pub fn locus_node(
    tree: &mut LocusTree,
    name: Option<&str>,
    dist: f64,
    event: LocusEvent,
    species: NodeId,
    children: &[NodeId],
) -> NodeId {
    let id = tree.add_node(name.map(String::from), dist, LocusNode { event, species });

    for child in children {
        tree.add_child(id, *child);
    }

    id
}

/// Genes `{leaf}`, `{leaf}_1`, ... sampled at a locus leaf
pub fn genes(locus_tree: &LocusTree, leaf: NodeId, count: usize) -> Vec<Lineage> {
    let name = locus_tree.node(leaf).name().unwrap_or("gene");

    (0..count)
        .map(|index| {
            let gene = if index == 0 {
                String::from(name)
            } else {
                format!("{}_{}", name, index)
            };

            Lineage::Gene(gene, leaf)
        })
        .collect()
}

#[derive(Debug, Clone)]
pub enum Lineage {
    Gene(String, NodeId),
    Merge(Box<Lineage>, Box<Lineage>, NodeId),
}

impl Lineage {
    fn key(&self) -> String {
        match self {
            Self::Gene(name, _) => name.clone(),
            Self::Merge(left, right, locus) => {
                let mut keys = [left.key(), right.key()];
                keys.sort();

                format!("({},{})@{}", keys[0], keys[1], locus.get())
            },
        }
    }

    fn build(&self, coal_tree: &mut CoalescentTree, coal_recon: &mut Reconciliation) -> NodeId {
        match self {
            Self::Gene(name, locus) => {
                let gene = coal_tree.add_node(Some(name.clone()), 0.0, ());
                coal_recon.insert(gene, *locus);
                gene
            },
            Self::Merge(left, right, locus) => {
                let gene = coal_tree.add_node(None, 0.0, ());
                coal_recon.insert(gene, *locus);

                for child in [left, right] {
                    let child = child.build(coal_tree, coal_recon);
                    coal_tree.add_child(gene, child);
                }

                gene
            },
        }
    }
}

fn forest_key(forest: &[Lineage]) -> String {
    let mut keys: Vec<String> = forest.iter().map(Lineage::key).collect();
    keys.sort();
    keys.join(";")
}

/// All distinct forests that pairwise merges inside one locus branch can
/// turn `pool` into
fn merge_outcomes(pool: Vec<Lineage>, locus: NodeId, complete: bool) -> Vec<Vec<Lineage>> {
    let mut outcomes = BTreeMap::new();
    let mut seen = BTreeMap::new();

    if !complete || pool.len() <= 1 {
        outcomes.insert(forest_key(&pool), pool.clone());
    }

    let mut frontier = vec![pool];

    while let Some(forest) = frontier.pop() {
        for i in 0..forest.len() {
            for j in (i + 1)..forest.len() {
                let mut merged: Vec<Lineage> = forest
                    .iter()
                    .enumerate()
                    .filter(|(k, _)| *k != i && *k != j)
                    .map(|(_, lineage)| lineage.clone())
                    .collect();
                merged.push(Lineage::Merge(
                    Box::new(forest[i].clone()),
                    Box::new(forest[j].clone()),
                    locus,
                ));

                let key = forest_key(&merged);

                if seen.insert(key.clone(), ()).is_none() {
                    if !complete || merged.len() == 1 {
                        outcomes.insert(key, merged.clone());
                    }

                    frontier.push(merged);
                }
            }
        }
    }

    outcomes.into_values().collect()
}

/// Enumerates every reconciled gene tree topology that the coalescent can
/// produce inside `locus_tree`, given the genes sampled at its leaves
pub fn enumerate_topologies(
    locus_tree: &LocusTree,
    leaf_genes: &BTreeMap<NodeId, Vec<Lineage>>,
    daughters: &DaughterSet,
) -> Vec<(CoalescentTree, Reconciliation)> {
    let root = locus_tree.root().unwrap();
    let mut outgoing: BTreeMap<NodeId, Vec<Vec<Lineage>>> = BTreeMap::new();

    for locus in locus_tree.postorder() {
        let node = locus_tree.node(locus);

        let pools: Vec<Vec<Lineage>> = if node.is_leaf() {
            vec![leaf_genes.get(&locus).cloned().unwrap_or_default()]
        } else {
            node.children()
                .iter()
                .fold(vec![Vec::new()], |pools, child| {
                    let mut combined = Vec::new();

                    for pool in &pools {
                        for forest in &outgoing[child] {
                            let mut pool = pool.clone();
                            pool.extend(forest.iter().cloned());
                            combined.push(pool);
                        }
                    }

                    combined
                })
        };

        let complete = locus == root || daughters.contains(&locus);

        let mut outcomes = BTreeMap::new();
        for pool in pools {
            for forest in merge_outcomes(pool, locus, complete) {
                outcomes.insert(forest_key(&forest), forest);
            }
        }

        outgoing.insert(locus, outcomes.into_values().collect());
    }

    outgoing[&root]
        .iter()
        .map(|forest| {
            let mut coal_tree = CoalescentTree::new();
            let mut coal_recon = Reconciliation::default();

            let coal_root = forest[0].build(&mut coal_tree, &mut coal_recon);
            coal_tree.set_root(coal_root);

            (coal_tree, coal_recon)
        })
        .collect()
}

/// Canonical key of a reconciled gene tree topology
pub fn topology_key(coal_tree: &CoalescentTree, coal_recon: &Reconciliation) -> String {
    fn key(coal_tree: &CoalescentTree, coal_recon: &Reconciliation, gene: NodeId) -> String {
        let node = coal_tree.node(gene);

        if node.is_leaf() {
            return String::from(node.name().unwrap_or_default());
        }

        let mut keys: Vec<String> = node
            .children()
            .iter()
            .map(|child| key(coal_tree, coal_recon, *child))
            .collect();
        keys.sort();

        format!(
            "({})@{}",
            keys.join(","),
            coal_recon.get(gene).map_or(usize::MAX, NodeId::get)
        )
    }

    key(coal_tree, coal_recon, coal_tree.root().unwrap())
}
