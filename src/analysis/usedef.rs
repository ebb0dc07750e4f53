use std::collections::BTreeSet;

use indexmap::{IndexMap, IndexSet};

use crate::error::{Error, Result};
use crate::ir::{Function, Instruction, Opcode, Operand};

/// Width of every stack slot, whatever the allocated type.
pub const SLOT_SIZE: i64 = 8;

/// One entry of the flattened, alloca-free instruction stream.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgramPoint<'f> {
    pub instr: &'f Instruction,
    pub succs: Vec<usize>,
    pub uses: BTreeSet<String>,
    pub defs: BTreeSet<String>,
}

/// Use/def sets and successor edges for every program point of a function,
/// plus the stack-allocated locals discovered along the way.
#[derive(Debug, Clone, PartialEq)]
pub struct UseDef<'f> {
    pub points: Vec<ProgramPoint<'f>>,
    /// Block label -> index of the block's first program point. The
    /// unlabeled entry block has no entry here.
    pub labels: IndexMap<String, usize>,
    /// Stack-allocated locals in discovery order.
    pub allocas: IndexSet<String>,
}

impl<'f> UseDef<'f> {
    pub fn build(func: &'f Function) -> Result<Self> {
        let mut points: Vec<ProgramPoint<'f>> = Vec::new();
        let mut labels = IndexMap::new();
        let mut allocas = IndexSet::new();

        for block in &func.blocks {
            if let Some(label) = &block.label {
                labels.insert(label.clone(), points.len());
            }

            for instr in &block.instrs {
                // Registers read by `instr`, minus stack locals which are
                // memory, not values.
                let reads = |allocas: &IndexSet<String>| -> BTreeSet<String> {
                    instr
                        .operands
                        .iter()
                        .filter_map(Operand::reg)
                        .filter(|name| !allocas.contains(*name))
                        .map(str::to_string)
                        .collect()
                };
                let result: BTreeSet<String> = instr.result.iter().cloned().collect();

                let (uses, defs) = match instr.opcode {
                    Opcode::Alloca => {
                        if let Some(name) = &instr.result {
                            allocas.insert(name.clone());
                        }
                        continue;
                    }
                    // Neither produces a value; labels and call targets are
                    // not registers so `reads` already skips them.
                    Opcode::Store | Opcode::Br => (reads(&allocas), BTreeSet::new()),
                    _ => (reads(&allocas), result),
                };

                points.push(ProgramPoint {
                    instr,
                    succs: vec![],
                    uses,
                    defs,
                });
            }
        }

        let count = points.len();
        for idx in 0..count {
            if idx + 1 == count {
                break;
            }
            let point = &points[idx];
            let succs = if point.instr.opcode == Opcode::Br {
                point
                    .instr
                    .operands
                    .iter()
                    .filter_map(Operand::label)
                    .map(|label| {
                        labels.get(label).copied().ok_or_else(|| {
                            Error::Malformed(format!(
                                "branch to undefined label `{label}` in `{}`",
                                func.name
                            ))
                        })
                    })
                    .collect::<Result<Vec<_>>>()?
            } else {
                vec![idx + 1]
            };
            points[idx].succs = succs;
        }

        log::debug!("{}: {} program points, labels {:?}", func.name, count, labels);

        Ok(UseDef {
            points,
            labels,
            allocas,
        })
    }

    /// Labels of the blocks starting at `idx`, in source order. A block
    /// holding nothing but allocas shares its start with the next block.
    pub fn labels_at(&self, idx: usize) -> impl Iterator<Item = &str> {
        self.labels
            .iter()
            .filter(move |(_, start)| **start == idx)
            .map(|(label, _)| label.as_str())
    }

    /// Every register used or defined anywhere in the function.
    pub fn temporaries(&self) -> BTreeSet<String> {
        self.points
            .iter()
            .flat_map(|point| point.uses.iter().chain(point.defs.iter()))
            .cloned()
            .collect()
    }

    pub fn frame_size(&self) -> i64 {
        SLOT_SIZE * self.allocas.len() as i64
    }
}
