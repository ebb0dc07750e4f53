pub mod branch_collapsing;
pub mod pass;
pub mod redundant_move;
#[cfg(test)]
mod test_helpers;

pub use branch_collapsing::BranchCollapsing;
pub use pass::Pass;
pub use redundant_move::RedundantMoveElimination;

/// Available peephole passes
#[derive(Debug, Clone, Copy)]
pub enum PassType {
    RedundantMoveElimination,
    BranchCollapsing,
}

/// Runs peephole passes over the emitted lines of a function
pub struct Optimizer;

impl Optimizer {
    /// Run every pass in order until the text stops changing
    pub fn run_all(&self, lines: Vec<String>) -> Vec<String> {
        let moves = RedundantMoveElimination;
        let branches = BranchCollapsing;

        let mut current = lines;
        loop {
            let before = current.len();

            current = moves.optimize(current);
            current = branches.optimize(current);

            // both passes only ever delete lines
            if current.len() == before {
                break;
            }
        }

        current
    }

    /// Run specific passes in the given order
    pub fn run(&self, lines: Vec<String>, passes: Vec<PassType>) -> Vec<String> {
        let mut result = lines;

        for pass_type in passes {
            let pass: &dyn Pass = match pass_type {
                PassType::RedundantMoveElimination => &RedundantMoveElimination,
                PassType::BranchCollapsing => &BranchCollapsing,
            };
            let before = result.len();
            result = pass.optimize(result);
            log::trace!("{}: removed {} lines", pass.name(), before - result.len());
        }

        result
    }
}
