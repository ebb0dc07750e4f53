//! Read-only view of what the allocator did for each function, for dumping
//! next to the generated assembly. Nothing here feeds back into codegen.

use crate::optimizer::registers::{Coloring, InterferenceGraph};

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDiagnostics {
    pub function: String,
    pub graph: InterferenceGraph,
    pub coloring: Coloring,
    pub colors_needed: usize,
    /// Registers that interfere with nothing.
    pub isolated: Vec<String>,
}

impl FunctionDiagnostics {
    pub fn new(function: &str, graph: InterferenceGraph, coloring: Coloring) -> Self {
        let isolated = graph.isolated().map(str::to_string).collect();
        Self {
            function: function.to_string(),
            colors_needed: coloring.colors_needed(),
            graph,
            coloring,
            isolated,
        }
    }
}

/// Graphviz rendering of the interference graph, each node labeled with its
/// color.
pub fn to_dot(diagnostics: &FunctionDiagnostics) -> String {
    let mut dot = format!("graph \"{}\" {{\n", diagnostics.function);
    for node in diagnostics.graph.nodes() {
        let color = diagnostics
            .coloring
            .get(node)
            .map_or_else(|| "-".to_string(), |c| c.to_string());
        dot.push_str(&format!("  \"{node}\" [label=\"{node} ({color})\"];\n"));
    }
    for (a, b) in diagnostics.graph.edges() {
        dot.push_str(&format!("  \"{a}\" -- \"{b}\";\n"));
    }
    dot.push_str("}\n");
    dot
}

pub fn summary(diagnostics: &FunctionDiagnostics) -> String {
    let mut text = format!("function {}\n", diagnostics.function);
    text.push_str(&format!("colors needed: {}\n", diagnostics.colors_needed));
    text.push_str("coloring:\n");
    for (node, color) in diagnostics.coloring.iter() {
        text.push_str(&format!("  {node} -> {color}\n"));
    }
    let isolated = if diagnostics.isolated.is_empty() {
        "(none)".to_string()
    } else {
        diagnostics.isolated.join(", ")
    };
    text.push_str(&format!("single nodes: {isolated}\n"));
    text
}
