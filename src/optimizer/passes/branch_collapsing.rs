use super::pass::{Pass, instruction, is_comment};

/// Consecutive Branch Collapsing Pass
///
/// When a jump directly follows another jump, with no label in between, the
/// second can never execute and is dropped. Longer chains collapse to the
/// first jump. Annotation comments between the two do not count as a
/// separation.
pub struct BranchCollapsing;

fn is_branch(line: &str) -> bool {
    instruction(line).is_some_and(|(mnemonic, _)| mnemonic.starts_with('j'))
}

impl Pass for BranchCollapsing {
    fn optimize(&self, lines: Vec<String>) -> Vec<String> {
        let mut output: Vec<String> = Vec::with_capacity(lines.len());
        let mut after_branch = false;

        for line in lines {
            if is_comment(&line) {
                output.push(line);
                continue;
            }
            if is_branch(&line) {
                if after_branch {
                    continue;
                }
                after_branch = true;
            } else {
                after_branch = false;
            }
            output.push(line);
        }

        output
    }

    fn name(&self) -> &'static str {
        "BranchCollapsing"
    }
}
