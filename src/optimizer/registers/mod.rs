pub mod coloring;
pub mod interference;

use std::collections::BTreeSet;

pub use coloring::{Coloring, Infeasible};
pub use interference::InterferenceGraph;

/// Size of the default palette: `%r8` through `%r15`.
pub const AVAILABLE_REGS: usize = 8;

pub trait RegisterAllocator {
    /// Colors `nodes` of `graph`. Every node must receive a register; there
    /// is no spill fallback.
    fn allocate(
        &self,
        graph: &InterferenceGraph,
        nodes: &BTreeSet<String>,
    ) -> Result<Coloring, Infeasible>;

    fn registers(&self) -> usize;
}

/// Simplify/select coloring over a palette of `registers` colors.
#[derive(Debug, Clone, Copy)]
pub struct GraphColoring {
    pub registers: usize,
}

impl RegisterAllocator for GraphColoring {
    fn allocate(
        &self,
        graph: &InterferenceGraph,
        nodes: &BTreeSet<String>,
    ) -> Result<Coloring, Infeasible> {
        let coloring = coloring::color(graph, nodes, self.registers)?;
        log::debug!(
            "colored {} nodes with {} of {} registers",
            coloring.len(),
            coloring.colors_needed(),
            self.registers
        );
        Ok(coloring)
    }

    fn registers(&self) -> usize {
        self.registers
    }
}
