use super::pass::{Pass, instruction};

/// Redundant Move Elimination Pass
///
/// Drops every `movq X, X` whose source and destination render identically.
/// These show up whenever the allocator gives an instruction's operand and
/// result the same register.
pub struct RedundantMoveElimination;

fn is_self_move(line: &str) -> bool {
    match instruction(line) {
        Some(("movq", operands)) => operands
            .split_once(", ")
            .is_some_and(|(src, dst)| src == dst),
        _ => false,
    }
}

impl Pass for RedundantMoveElimination {
    fn optimize(&self, lines: Vec<String>) -> Vec<String> {
        lines.into_iter().filter(|line| !is_self_move(line)).collect()
    }

    fn name(&self) -> &'static str {
        "RedundantMoveElimination"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimizer::passes::test_helpers::lines;

    #[test]
    fn test_drops_self_moves() {
        let input = lines(&[
            "movq %r8, %r8",
            "movq %r8, %r9",
            "movq -8(%rbp), -8(%rbp)",
            "movq %rax, %rax",
        ]);
        let output = RedundantMoveElimination.optimize(input);
        assert_eq!(output, lines(&["movq %r8, %r9"]));
    }

    #[test]
    fn test_leaves_other_instructions() {
        let input = lines(&["addq %r8, %r8", "\tloop:", "  # movq %r8, %r8", "leaq (%r8,%r8,8), %r8"]);
        let output = RedundantMoveElimination.optimize(input.clone());
        assert_eq!(output, input);
    }
}
