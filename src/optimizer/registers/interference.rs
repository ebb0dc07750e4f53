use std::collections::{BTreeMap, BTreeSet};

use crate::analysis::{Liveness, ProgramPoint};

/// Undirected simple graph over virtual registers.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct InterferenceGraph {
    adjacency: BTreeMap<String, BTreeSet<String>>,
}

impl InterferenceGraph {
    /// Every register used or defined becomes a node. An edge joins `d` and
    /// `v` when some point defines `d` while `v` is live out of it.
    ///
    /// Parameters are defined together on entry, so everything live into the
    /// first point interferes pairwise.
    pub fn build(points: &[ProgramPoint], liveness: &Liveness) -> Self {
        let mut graph = InterferenceGraph::default();

        if let Some(entry) = liveness.live_in.first() {
            for a in entry {
                for b in entry {
                    graph.add_edge(a, b);
                }
            }
        }

        for (idx, point) in points.iter().enumerate() {
            for name in point.uses.iter().chain(point.defs.iter()) {
                graph.add_node(name);
            }
            for def in &point.defs {
                for live in &liveness.live_out[idx] {
                    graph.add_edge(def, live);
                }
            }
        }

        graph
    }

    pub fn add_node(&mut self, node: &str) {
        if !self.adjacency.contains_key(node) {
            self.adjacency.insert(node.to_string(), BTreeSet::new());
        }
    }

    /// Adds `x -- y`. Self-loops are ignored and duplicates collapse.
    pub fn add_edge(&mut self, x: &str, y: &str) {
        if x == y {
            return;
        }
        self.add_node(x);
        self.add_node(y);
        if let Some(neighbors) = self.adjacency.get_mut(x) {
            neighbors.insert(y.to_string());
        }
        if let Some(neighbors) = self.adjacency.get_mut(y) {
            neighbors.insert(x.to_string());
        }
    }

    pub fn contains_edge(&self, x: &str, y: &str) -> bool {
        self.adjacency
            .get(x)
            .is_some_and(|neighbors| neighbors.contains(y))
    }

    pub fn neighbors(&self, node: &str) -> impl Iterator<Item = &str> {
        self.adjacency
            .get(node)
            .into_iter()
            .flat_map(|neighbors| neighbors.iter().map(String::as_str))
    }

    /// Nodes in ascending name order.
    pub fn nodes(&self) -> impl Iterator<Item = &str> {
        self.adjacency.keys().map(String::as_str)
    }

    /// Each edge once, as `(a, b)` with `a < b`.
    pub fn edges(&self) -> impl Iterator<Item = (&str, &str)> {
        self.adjacency.iter().flat_map(|(node, neighbors)| {
            neighbors
                .iter()
                .filter(move |other| node < *other)
                .map(move |other| (node.as_str(), other.as_str()))
        })
    }

    pub fn degree(&self, node: &str) -> usize {
        self.adjacency.get(node).map_or(0, BTreeSet::len)
    }

    pub fn len(&self) -> usize {
        self.adjacency.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adjacency.is_empty()
    }

    /// Nodes that interfere with nothing.
    pub fn isolated(&self) -> impl Iterator<Item = &str> {
        self.adjacency
            .iter()
            .filter(|(_, neighbors)| neighbors.is_empty())
            .map(|(node, _)| node.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::UseDef;
    use crate::test_helpers::*;

    fn graph_of(source: &str) -> InterferenceGraph {
        let func = function(source);
        let usedef = UseDef::build(&func).unwrap();
        let liveness = Liveness::analyze(&usedef.points);
        InterferenceGraph::build(&usedef.points, &liveness)
    }

    #[test]
    fn test_simultaneously_live_values_interfere() {
        let graph = graph_of(
            r#"
define i64 @f(i64 %a) {
  %b = add i64 %a, 1
  %c = mul i64 %b, %a
  %d = add i64 %c, 2
  ret i64 %d
}
"#,
        );
        assert!(graph.contains_edge("a", "b"));
        assert!(graph.contains_edge("b", "a"));
        assert!(!graph.contains_edge("c", "a"));
        assert!(!graph.contains_edge("b", "c"));
        assert_eq!(graph.len(), 4);
        assert_eq!(graph.edges().collect::<Vec<_>>(), vec![("a", "b")]);
        assert_eq!(graph.isolated().collect::<Vec<_>>(), vec!["c", "d"]);
    }

    #[test]
    fn test_parameters_live_on_entry_interfere() {
        let graph = graph_of(
            r#"
define i64 @f(i64 %a, i64 %b, i64 %unused) {
  %c = sub i64 %b, %a
  ret i64 %c
}
"#,
        );
        assert!(graph.contains_edge("a", "b"));
        assert!(!graph.contains_edge("c", "a"));
        assert_eq!(graph.nodes().collect::<Vec<_>>(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_no_self_edges() {
        // i is both read and written by the same point inside the loop
        let graph = graph_of(
            r#"
define i64 @f(i64 %i) {
entry:
  br label %loop
loop:
  %j = add i64 %i, %i
  %c = icmp slt i64 %j, %i
  br i1 %c, label %done, label %loop
done:
  ret i64 %j
}
"#,
        );
        for node in graph.nodes() {
            assert!(!graph.contains_edge(node, node), "self edge on {node}");
        }
        assert!(graph.contains_edge("j", "i"));
    }

    #[test]
    fn test_clique() {
        let graph = graph_of(&clique_source(&["a", "b", "c", "d"]));
        for x in ["a", "b", "c", "d"] {
            assert_eq!(graph.degree(x), 3, "degree of {x}");
        }
        assert_eq!(graph.edges().count(), 6);
    }

    #[test]
    fn test_add_edge_collapses_duplicates() {
        let mut graph = InterferenceGraph::default();
        graph.add_edge("x", "y");
        graph.add_edge("y", "x");
        graph.add_edge("x", "x");
        assert_eq!(graph.degree("x"), 1);
        assert_eq!(graph.degree("y"), 1);
        assert_eq!(graph.edges().count(), 1);
    }
}
