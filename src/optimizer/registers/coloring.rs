use std::collections::{BTreeMap, BTreeSet};

use super::interference::InterferenceGraph;

/// Register assignment: virtual register -> color in `[0, K)`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Coloring {
    colors: BTreeMap<String, usize>,
}

impl Coloring {
    pub fn get(&self, node: &str) -> Option<usize> {
        self.colors.get(node).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.colors.iter().map(|(node, &color)| (node.as_str(), color))
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    /// Number of distinct colors in use. Colors are handed out lowest-first,
    /// so these are always `0..colors_needed()`.
    pub fn colors_needed(&self) -> usize {
        self.colors.values().collect::<BTreeSet<_>>().len()
    }
}

/// Simplification got stuck: every node left has at least K neighbors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Infeasible {
    pub remaining: Vec<String>,
}

/// Simplify/select coloring without spilling.
///
/// Repeatedly removes a node with fewer than `k` neighbors among the nodes
/// still present (lowest name first) until none are left, then colors nodes
/// in reverse removal order with the lowest color none of their
/// already-colored neighbors use. Those neighbors are exactly the ones that
/// were still present when the node was removed, so fewer than `k` colors
/// are taken and one is always free.
///
/// When no node can be removed the whole allocation fails, even if some
/// other elimination order or a smarter heuristic would have found a
/// coloring.
pub fn color(
    graph: &InterferenceGraph,
    nodes: &BTreeSet<String>,
    k: usize,
) -> Result<Coloring, Infeasible> {
    let names: Vec<&str> = nodes.iter().map(String::as_str).collect();
    let index: BTreeMap<&str, usize> = names.iter().enumerate().map(|(i, &n)| (n, i)).collect();
    let adjacency: Vec<Vec<usize>> = names
        .iter()
        .map(|&name| {
            graph
                .neighbors(name)
                .filter_map(|neighbor| index.get(neighbor).copied())
                .collect()
        })
        .collect();

    let mut removed = vec![false; names.len()];
    let mut stack = Vec::with_capacity(names.len());

    while stack.len() < names.len() {
        let candidate = (0..names.len()).find(|&node| {
            !removed[node]
                && adjacency[node]
                    .iter()
                    .filter(|&&neighbor| !removed[neighbor])
                    .count()
                    < k
        });

        let Some(node) = candidate else {
            let remaining = (0..names.len())
                .filter(|&node| !removed[node])
                .map(|node| names[node].to_string())
                .collect();
            return Err(Infeasible { remaining });
        };

        removed[node] = true;
        stack.push(node);
    }

    let mut assigned: Vec<Option<usize>> = vec![None; names.len()];
    while let Some(node) = stack.pop() {
        let taken: BTreeSet<usize> = adjacency[node]
            .iter()
            .filter_map(|&neighbor| assigned[neighbor])
            .collect();
        // degree < k at removal time guarantees a free color
        let free = (0..k).find(|c| !taken.contains(c)).unwrap_or_default();
        assigned[node] = Some(free);
    }

    let colors = names
        .iter()
        .zip(assigned)
        .filter_map(|(name, color)| color.map(|c| (name.to_string(), c)))
        .collect();

    Ok(Coloring { colors })
}
