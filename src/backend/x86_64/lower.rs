//! Instruction selection: one IR instruction at a time into AT&T assembly.
//!
//! Besides the colored registers the selector relies on a few fixed ones:
//! `%rax` (return value, multiply/divide, `set*` byte, staging of memory and
//! immediate operands), `%rcx` (constant multiplier or divisor, staged
//! address base) and `%rdx` (remainder). The prologue copies register
//! arguments into their colors, so the argument registers only ever carry
//! outgoing call arguments.

use std::collections::HashMap;
use std::fmt;

use crate::analysis::{Liveness, UseDef};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::ir::{Function, Instruction, Opcode, Operand, Predicate};
use crate::optimizer::folding::{fold_binary, fold_compare};
use crate::optimizer::registers::Coloring;

use super::frame::{StackFrame, argument_depth};
use super::regs::{self, ARG_REGS, CALLER_SAVED, RETURN};

/// Where an operand's value can be found.
#[derive(Debug, Clone, PartialEq)]
pub enum Location {
    Imm(i64),
    Register(&'static str),
    /// Memory at a `%rbp`-relative displacement.
    Frame(i64),
    /// GOT entry of a global; reading it yields the global's address.
    Global(String),
    /// Memory addressed by a register.
    Indirect(&'static str),
}

impl Location {
    fn is_memory(&self) -> bool {
        matches!(
            self,
            Location::Frame(_) | Location::Global(_) | Location::Indirect(_)
        )
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::Imm(value) => write!(f, "${value}"),
            Location::Register(reg) => f.write_str(reg),
            Location::Frame(displacement) => write!(f, "{displacement}(%rbp)"),
            Location::Global(name) => write!(f, "{name}@GOTPCREL(%rip)"),
            Location::Indirect(reg) => write!(f, "({reg})"),
        }
    }
}

fn set_instruction(predicate: Predicate) -> &'static str {
    match predicate {
        Predicate::Eq => "sete",
        Predicate::Ne => "setne",
        Predicate::Slt => "setl",
        Predicate::Sle => "setle",
        Predicate::Sgt => "setg",
        Predicate::Sge => "setge",
    }
}

/// Assembler-local name for a block label. Scoping it by function lets
/// several functions use the same block names.
fn local_label(function: &str, label: &str) -> String {
    format!(".L{function}_{label}")
}

fn operand(instr: &Instruction, n: usize) -> Result<&Operand> {
    instr
        .operands
        .get(n)
        .ok_or_else(|| Error::Malformed(format!("`{instr}` is missing operand {n}")))
}

pub struct FunctionEmitter<'a> {
    func: &'a Function,
    usedef: &'a UseDef<'a>,
    liveness: &'a Liveness,
    coloring: &'a Coloring,
    config: &'a Config,
    frame: StackFrame,
    /// Temporaries whose definition folded to a literal.
    folded: HashMap<String, i64>,
    lines: Vec<String>,
}

impl<'a> FunctionEmitter<'a> {
    pub fn new(
        func: &'a Function,
        usedef: &'a UseDef<'a>,
        liveness: &'a Liveness,
        coloring: &'a Coloring,
        config: &'a Config,
    ) -> Self {
        Self {
            func,
            usedef,
            liveness,
            coloring,
            config,
            frame: StackFrame::plan(&usedef.allocas),
            folded: HashMap::new(),
            lines: Vec::new(),
        }
    }

    pub fn emit(mut self) -> Result<Vec<String>> {
        let func = self.func;
        let name = &func.name;
        let usedef = self.usedef;
        let saved = if self.config.optimize {
            regs::saved(self.coloring.colors_needed())
        } else {
            regs::saved(self.config.registers)
        };
        log::debug!(
            "{name}: frame of {} bytes, saving {} registers",
            self.frame.size(),
            saved.len()
        );

        self.lines.push(format!("\t.globl {name}"));
        self.lines.push(format!("\t{name}:"));
        self.asm("pushq %rbp");
        self.asm("movq %rsp, %rbp");
        self.asm(format!("subq ${}, %rsp", self.frame.size()));
        for reg in saved {
            self.asm(format!("pushq {reg}"));
        }
        // parameters that are never read have no color
        for (param, arg) in func.params.iter().zip(ARG_REGS) {
            if let Some(reg) = self.coloring.get(&param.name).and_then(regs::color) {
                self.asm(format!("movq {arg}, {reg}"));
            }
        }

        for (idx, point) in usedef.points.iter().enumerate() {
            for label in usedef.labels_at(idx) {
                self.lines.push(format!("\t{}:", local_label(name, label)));
            }
            if self.config.annotate {
                self.lines.push(format!("  # {}", point.instr));
            }

            let before = self.lines.len();
            self.lower(idx, point.instr)?;
            log::trace!(
                "{name}: `{}` -> {:?}",
                point.instr,
                &self.lines[before..]
            );
        }

        self.lines.push(format!("\t{name}_end:"));
        for reg in saved.iter().rev() {
            self.asm(format!("popq {reg}"));
        }
        self.asm("movq %rbp, %rsp");
        self.asm("popq %rbp");
        self.asm("retq");

        Ok(self.lines)
    }

    fn asm(&mut self, line: impl Into<String>) {
        self.lines.push(line.into());
    }

    fn lower(&mut self, idx: usize, instr: &Instruction) -> Result<()> {
        match &instr.opcode {
            Opcode::Add
            | Opcode::Sub
            | Opcode::Mul
            | Opcode::SDiv
            | Opcode::SRem
            | Opcode::Or
            | Opcode::And => self.binary(instr),
            Opcode::Icmp(predicate) => self.compare(*predicate, instr),
            Opcode::Br => self.branch(idx, instr),
            Opcode::Call => self.call(idx, instr),
            Opcode::Ret => self.ret(instr),
            Opcode::GetElementPtr => self.element_address(instr),
            Opcode::Bitcast => {
                let source = self.value(operand(instr, 0)?)?;
                let rd = self.dest(instr)?;
                self.mov(&source, &Location::Register(rd));
                Ok(())
            }
            Opcode::Store => self.store(instr),
            Opcode::Load => {
                let rd = self.dest(instr)?;
                let source = self.memory(operand(instr, 0)?)?;
                self.mov(&source, &Location::Register(rd));
                Ok(())
            }
            // allocas only shape the frame and never reach here
            Opcode::Alloca => Ok(()),
            Opcode::Unsupported(opcode) => Err(Error::Unsupported {
                function: self.func.name.clone(),
                opcode: opcode.clone(),
            }),
        }
    }

    fn binary(&mut self, instr: &Instruction) -> Result<()> {
        let lhs = self.value(operand(instr, 0)?)?;
        let rhs = self.value(operand(instr, 1)?)?;
        let rd = self.dest(instr)?;

        if self.fold(instr, &lhs, &rhs, rd, |a, b| fold_binary(&instr.opcode, a, b)) {
            return Ok(());
        }

        let dest = Location::Register(rd);
        match &instr.opcode {
            Opcode::Add | Opcode::Or | Opcode::And => {
                let mnemonic = match instr.opcode {
                    Opcode::Add => "addq",
                    Opcode::Or => "orq",
                    _ => "andq",
                };
                // writing rd first would clobber the second operand
                let (lhs, rhs) = if rhs == dest { (rhs, lhs) } else { (lhs, rhs) };
                self.asm(format!("movq {lhs}, {rd}"));
                self.asm(format!("{mnemonic} {rhs}, {rd}"));
            }
            Opcode::Sub => {
                let rhs = if rhs == dest {
                    self.asm(format!("movq {rhs}, %rax"));
                    Location::Register("%rax")
                } else {
                    rhs
                };
                self.asm(format!("movq {lhs}, {rd}"));
                self.asm(format!("subq {rhs}, {rd}"));
            }
            Opcode::Mul => {
                self.asm(format!("movq {lhs}, %rax"));
                let rhs = self.materialize(rhs, "%rcx");
                self.asm(format!("imulq {rhs}"));
                self.asm(format!("movq %rax, {rd}"));
            }
            Opcode::SDiv | Opcode::SRem => {
                self.asm(format!("movq {lhs}, %rax"));
                let divisor = self.materialize(rhs, "%rcx");
                self.asm("cqto");
                self.asm(format!("idivq {divisor}"));
                let half = if instr.opcode == Opcode::SDiv {
                    "%rax"
                } else {
                    "%rdx"
                };
                self.asm(format!("movq {half}, {rd}"));
            }
            other => {
                return Err(Error::internal(
                    &self.func.name,
                    format!("`{other}` is not a binary operation"),
                ));
            }
        }
        Ok(())
    }

    fn compare(&mut self, predicate: Predicate, instr: &Instruction) -> Result<()> {
        let lhs = self.value(operand(instr, 0)?)?;
        let rhs = self.value(operand(instr, 1)?)?;
        let rd = self.dest(instr)?;

        if self.fold(instr, &lhs, &rhs, rd, |a, b| {
            Some(fold_compare(predicate, a, b))
        }) {
            return Ok(());
        }

        match lhs {
            Location::Register(_) => {
                self.asm("movq $0, %rax");
                self.asm(format!("cmpq {rhs}, {lhs}"));
            }
            // cmpq cannot take an immediate on the right
            lhs => {
                self.asm(format!("movq {lhs}, %rax"));
                self.asm(format!("cmpq {rhs}, %rax"));
                self.asm("movq $0, %rax");
            }
        }
        self.asm(format!("{} %al", set_instruction(predicate)));
        self.asm(format!("movq %rax, {rd}"));
        Ok(())
    }

    fn branch(&mut self, idx: usize, instr: &Instruction) -> Result<()> {
        match instr.operands.as_slice() {
            [Operand::Label(target)] => {
                if self.label_index(target)? != idx + 1 {
                    let target = local_label(&self.func.name, target);
                    self.asm(format!("jmp {target}"));
                }
            }
            [cond, Operand::Label(then_label), Operand::Label(else_label)] => {
                if self.label_index(then_label)? != idx + 1 {
                    return Err(Error::internal(
                        &self.func.name,
                        format!(
                            "conditional branch at point {idx} must fall through to `{then_label}`"
                        ),
                    ));
                }
                let else_label = local_label(&self.func.name, else_label);
                match self.value(cond)? {
                    Location::Imm(value) if self.config.optimize => {
                        if value == 0 {
                            self.asm(format!("jmp {else_label}"));
                        }
                    }
                    cond @ Location::Imm(_) => {
                        self.asm(format!("movq {cond}, %rax"));
                        self.asm("cmpq $0, %rax");
                        self.asm(format!("je {else_label}"));
                    }
                    cond => {
                        self.asm(format!("cmpq $0, {cond}"));
                        self.asm(format!("je {else_label}"));
                    }
                }
            }
            _ => {
                return Err(Error::Malformed(format!(
                    "malformed branch `{instr}` in `{}`",
                    self.func.name
                )));
            }
        }
        Ok(())
    }

    /// Colors in caller-saved registers that must survive the call at `idx`.
    fn preserved_across(&self, idx: usize, instr: &Instruction) -> Vec<&'static str> {
        let mut preserved: Vec<&'static str> = self.liveness.live_out[idx]
            .iter()
            .filter(|name| instr.result.as_ref() != Some(*name))
            .filter_map(|name| match self.register(name) {
                Ok(Location::Register(reg)) if CALLER_SAVED.contains(&reg) => Some(reg),
                _ => None,
            })
            .collect();
        preserved.sort_unstable();
        preserved.dedup();
        preserved
    }

    fn call(&mut self, idx: usize, instr: &Instruction) -> Result<()> {
        let Some((Operand::Callee(callee), args)) = instr.operands.split_last() else {
            return Err(Error::Malformed(format!(
                "call without a target: `{instr}`"
            )));
        };
        let args = args
            .iter()
            .map(|arg| self.value(arg))
            .collect::<Result<Vec<_>>>()?;

        let preserved = self.preserved_across(idx, instr);
        for reg in &preserved {
            self.asm(format!("pushq {reg}"));
        }

        let (in_regs, on_stack) = args.split_at(args.len().min(ARG_REGS.len()));
        for (arg, reg) in in_regs.iter().zip(ARG_REGS) {
            self.asm(format!("movq {arg}, {reg}"));
        }
        for arg in on_stack.iter().rev() {
            self.asm(format!("pushq {arg}"));
        }
        self.asm(format!("call {callee}@PLT"));
        if !on_stack.is_empty() {
            self.asm(format!("addq ${}, %rsp", 8 * on_stack.len()));
        }
        for reg in preserved.iter().rev() {
            self.asm(format!("popq {reg}"));
        }

        if instr.result.is_some() {
            let rd = self.dest(instr)?;
            self.asm(format!("movq {RETURN}, {rd}"));
        }
        Ok(())
    }

    fn ret(&mut self, instr: &Instruction) -> Result<()> {
        if let Some(value) = instr.operands.first() {
            let value = self.value(value)?;
            self.asm(format!("movq {value}, {RETURN}"));
        }
        self.asm(format!("jmp {}_end", self.func.name));
        Ok(())
    }

    /// `base + 8 * index`. Only the last index may be nonzero, which covers
    /// both `T* p, i` and `[N x T]* p, 0, i`.
    fn element_address(&mut self, instr: &Instruction) -> Result<()> {
        let malformed = || Error::Malformed(format!("unsupported address computation `{instr}`"));
        let [base, indices @ ..] = instr.operands.as_slice() else {
            return Err(malformed());
        };
        let Some((index, leading)) = indices.split_last() else {
            return Err(malformed());
        };
        if leading.iter().any(|i| *i != Operand::Imm(0)) {
            return Err(malformed());
        }

        let rd = self.dest(instr)?;
        let index = self.value(index)?;
        let base = self.value(base)?;
        let base_scratch = if index == Location::Register("%rcx") {
            "%rax"
        } else {
            "%rcx"
        };
        let base = self.materialize_register(base, base_scratch);
        let index = self.materialize_register(index, "%rax");
        self.asm(format!("leaq ({base},{index},8), {rd}"));
        Ok(())
    }

    fn store(&mut self, instr: &Instruction) -> Result<()> {
        let source = operand(instr, 0)?;
        let pointer = operand(instr, 1)?;

        // A stack-passed argument already lives in the caller's frame: let
        // the local refer to it instead of copying.
        if let (Operand::Reg(arg), Operand::Reg(local)) = (source, pointer) {
            if let Some(index) = self.func.param_index(arg) {
                if index >= ARG_REGS.len() && self.frame.contains(local) {
                    self.frame.bind_argument(local, index);
                    return Ok(());
                }
            }
        }

        let source = self.value(source)?;
        let dest = self.memory(pointer)?;
        self.mov(&source, &dest);
        Ok(())
    }

    /// Moves between any two locations; x86 has no memory-to-memory `movq`.
    fn mov(&mut self, source: &Location, dest: &Location) {
        if source.is_memory() && dest.is_memory() {
            self.asm(format!("pushq {source}"));
            self.asm(format!("popq {dest}"));
        } else {
            self.asm(format!("movq {source}, {dest}"));
        }
    }

    /// Immediates go through `scratch`; everything else is usable as is.
    fn materialize(&mut self, location: Location, scratch: &'static str) -> Location {
        match location {
            Location::Imm(_) => {
                self.asm(format!("movq {location}, {scratch}"));
                Location::Register(scratch)
            }
            other => other,
        }
    }

    fn materialize_register(&mut self, location: Location, scratch: &'static str) -> &'static str {
        match location {
            Location::Register(reg) => reg,
            other => {
                self.asm(format!("movq {other}, {scratch}"));
                scratch
            }
        }
    }

    /// With optimization on, replaces an operation on two literals by a
    /// move of its result and remembers the value for later uses.
    fn fold(
        &mut self,
        instr: &Instruction,
        lhs: &Location,
        rhs: &Location,
        rd: &'static str,
        eval: impl Fn(i64, i64) -> Option<i64>,
    ) -> bool {
        if !self.config.optimize {
            return false;
        }
        let (Location::Imm(a), Location::Imm(b)) = (lhs, rhs) else {
            return false;
        };
        let Some(value) = eval(*a, *b) else {
            return false;
        };
        if let Some(result) = &instr.result {
            self.folded.insert(result.clone(), value);
        }
        self.asm(format!("movq ${value}, {rd}"));
        true
    }

    fn label_index(&self, label: &str) -> Result<usize> {
        self.usedef.labels.get(label).copied().ok_or_else(|| {
            Error::Malformed(format!(
                "branch to undefined label `{label}` in `{}`",
                self.func.name
            ))
        })
    }

    /// Resolves an operand read as a value.
    fn value(&self, operand: &Operand) -> Result<Location> {
        match operand {
            Operand::Imm(value) => Ok(Location::Imm(*value)),
            Operand::Reg(name) => self.register(name),
            Operand::Global(name) => Ok(Location::Global(name.clone())),
            Operand::Label(_) | Operand::Callee(_) => Err(Error::Malformed(format!(
                "`{operand}` used as a value in `{}`",
                self.func.name
            ))),
        }
    }

    fn register(&self, name: &str) -> Result<Location> {
        if let Some(&value) = self.folded.get(name) {
            return Ok(Location::Imm(value));
        }
        if let Some(index) = self.func.param_index(name) {
            if index >= ARG_REGS.len() {
                return Ok(Location::Frame(-argument_depth(index)));
            }
        }
        if self.frame.contains(name) {
            return Err(Error::Malformed(format!(
                "stack slot %{name} used as a value in `{}`",
                self.func.name
            )));
        }
        self.colored(name).map(Location::Register)
    }

    /// Resolves an operand used as an address. Anything not already a
    /// frame slot or a register is staged through `%rax`.
    fn memory(&mut self, pointer: &Operand) -> Result<Location> {
        match pointer {
            Operand::Reg(name) => {
                if let Some(displacement) = self.frame.displacement(name) {
                    return Ok(Location::Frame(displacement));
                }
                let address = self.register(name)?;
                Ok(Location::Indirect(self.materialize_register(address, "%rax")))
            }
            Operand::Global(_) => {
                let address = self.value(pointer)?;
                Ok(Location::Indirect(self.materialize_register(address, "%rax")))
            }
            other => Err(Error::Malformed(format!(
                "`{other}` used as an address in `{}`",
                self.func.name
            ))),
        }
    }

    fn dest(&self, instr: &Instruction) -> Result<&'static str> {
        let name = instr
            .result
            .as_deref()
            .ok_or_else(|| Error::Malformed(format!("`{instr}` needs a result")))?;
        self.colored(name)
    }

    fn colored(&self, name: &str) -> Result<&'static str> {
        self.coloring
            .get(name)
            .and_then(regs::color)
            .ok_or_else(|| {
                Error::internal(&self.func.name, format!("no register assigned to %{name}"))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::Liveness;
    use crate::optimizer::registers::{InterferenceGraph, coloring};
    use crate::test_helpers::*;

    fn emit_with(source: &str, config: &Config) -> Result<Vec<String>> {
        let func = function(source);
        let usedef = UseDef::build(&func)?;
        let liveness = Liveness::analyze(&usedef.points);
        let graph = InterferenceGraph::build(&usedef.points, &liveness);
        let coloring = coloring::color(&graph, &usedef.temporaries(), config.registers)
            .expect("test functions are colorable");
        FunctionEmitter::new(&func, &usedef, &liveness, &coloring, config).emit()
    }

    fn emit(source: &str) -> Vec<String> {
        emit_with(source, &Config::default()).unwrap()
    }

    fn assert_window(lines: &[String], window: &[&str]) {
        assert!(
            lines.windows(window.len()).any(|w| w == window),
            "expected {window:#?} in {lines:#?}"
        );
    }

    const CONSTANT: &str = r#"
define i64 @main() {
  %a = add i64 3, 4
  %b = mul i64 %a, 2
  ret i64 %b
}
"#;

    #[test]
    fn test_constant_expression_folds() {
        let lines = emit(CONSTANT);
        assert_eq!(
            lines,
            vec![
                "\t.globl main",
                "\tmain:",
                "pushq %rbp",
                "movq %rsp, %rbp",
                "subq $0, %rsp",
                "pushq %r8",
                "movq $7, %r8",
                "movq $14, %r8",
                "movq $14, %rax",
                "jmp main_end",
                "\tmain_end:",
                "popq %r8",
                "movq %rbp, %rsp",
                "popq %rbp",
                "retq",
            ]
        );
    }

    #[test]
    fn test_unoptimized_keeps_arithmetic_and_saves_every_register() {
        let lines = emit_with(CONSTANT, &Config::unoptimized()).unwrap();
        assert_window(&lines, &["movq $3, %r8", "addq $4, %r8"]);
        assert_window(
            &lines,
            &["movq %r8, %rax", "movq $2, %rcx", "imulq %rcx", "movq %rax, %r8"],
        );
        let pushes = lines.iter().filter(|l| l.starts_with("pushq %r") && *l != "pushq %rbp");
        assert_eq!(pushes.count(), 8);
    }

    #[test]
    fn test_loop_header_branches_to_exit() {
        let lines = emit(
            r#"
define i64 @count(i64 %n) {
  %slot = alloca i64
  store i64 0, i64* %slot
  br label %head
head:
  %i = load i64, i64* %slot
  %c = icmp slt i64 %i, %n
  br i1 %c, label %body, label %exit
body:
  %next = add i64 %i, 1
  store i64 %next, i64* %slot
  br label %head
exit:
  ret i64 %i
}
"#,
        );
        assert_window(
            &lines,
            &[
                "\t.Lcount_head:",
                "movq -8(%rbp), %r8",
                "movq $0, %rax",
                "cmpq %r9, %r8",
                "setl %al",
                "movq %rax, %r10",
                "cmpq $0, %r10",
                "je .Lcount_exit",
                "\t.Lcount_body:",
            ],
        );
        assert_window(&lines, &["movq %r8, -8(%rbp)", "jmp .Lcount_head", "\t.Lcount_exit:"]);
        assert!(lines.contains(&"subq $8, %rsp".to_string()));
        assert_eq!(lines.iter().filter(|l| l.starts_with("je ")).count(), 1);
        assert!(!lines.contains(&"jmp .Lcount_body".to_string()));
        // the branch into head from the entry block falls through
        assert_eq!(lines.iter().filter(|l| *l == "jmp .Lcount_head").count(), 1);
    }

    #[test]
    fn test_conditional_branch_must_fall_through() {
        let err = emit_with(
            r#"
define void @f(i1 %c) {
entry:
  br i1 %c, label %b, label %a
a:
  ret void
b:
  ret void
}
"#,
            &Config::default(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::Internal { .. }), "{err}");
    }

    #[test]
    fn test_branch_on_literal() {
        let source = r#"
define void @f() {
entry:
  br i1 false, label %next, label %other
next:
  br i1 true, label %other, label %next
other:
  ret void
}
"#;
        let lines = emit(source);
        assert_window(&lines, &["\t.Lf_entry:", "jmp .Lf_other", "\t.Lf_next:", "\t.Lf_other:"]);

        let lines = emit_with(source, &Config::unoptimized()).unwrap();
        assert_window(
            &lines,
            &["\t.Lf_entry:", "movq $0, %rax", "cmpq $0, %rax", "je .Lf_other"],
        );
    }

    #[test]
    fn test_commutative_swap_avoids_clobber() {
        let lines = emit(
            r#"
define i64 @f(i64 %a) {
  %y = add i64 %a, 1
  %x = add i64 5, %y
  ret i64 %x
}
"#,
        );
        assert_window(&lines, &["movq %rdi, %r8", "movq %r8, %r8", "addq $1, %r8"]);
        assert_window(&lines, &["movq %r8, %r8", "addq $5, %r8"]);
    }

    #[test]
    fn test_sub_copies_aliased_operand() {
        let lines = emit(
            r#"
define i64 @f(i64 %a) {
  %y = add i64 %a, 1
  %x = sub i64 5, %y
  ret i64 %x
}
"#,
        );
        assert_window(
            &lines,
            &["movq %r8, %rax", "movq $5, %r8", "subq %rax, %r8"],
        );
    }

    #[test]
    fn test_division() {
        let lines = emit(
            r#"
define i64 @f(i64 %a, i64 %b, i64 %c) {
  %q = sdiv i64 %a, 3
  %r = srem i64 %q, %c
  ret i64 %r
}
"#,
        );
        // a and c are live together on entry; b is never read
        assert_window(&lines, &["pushq %r9", "movq %rdi, %r8", "movq %rdx, %r9"]);
        assert!(!lines.iter().any(|l| l.starts_with("movq %rsi")));
        assert_window(
            &lines,
            &[
                "movq %r8, %rax",
                "movq $3, %rcx",
                "cqto",
                "idivq %rcx",
                "movq %rax, %r8",
            ],
        );
        // the divisor was copied out of %rdx before cqto overwrote it
        assert_window(
            &lines,
            &["movq %r8, %rax", "cqto", "idivq %r9", "movq %rdx, %r8"],
        );
    }

    #[test]
    fn test_division_by_zero_is_not_folded() {
        let lines = emit(
            r#"
define i64 @f() {
  %q = sdiv i64 1, 0
  ret i64 %q
}
"#,
        );
        assert_window(&lines, &["movq $1, %rax", "movq $0, %rcx", "cqto", "idivq %rcx"]);
    }

    #[test]
    fn test_compare_with_literal_on_the_left() {
        let lines = emit(
            r#"
define i1 @f(i64 %a) {
  %c = icmp sge i64 10, %a
  ret i1 %c
}
"#,
        );
        assert_window(
            &lines,
            &[
                "movq $10, %rax",
                "cmpq %r8, %rax",
                "movq $0, %rax",
                "setge %al",
                "movq %rax, %r8",
            ],
        );
    }

    #[test]
    fn test_every_binary_operation_folds() {
        let cases = [
            ("add", 10),
            ("sub", 4),
            ("mul", 21),
            ("sdiv", 2),
            ("srem", 1),
            ("or", 7),
            ("and", 3),
        ];
        for (opcode, value) in cases {
            let lines = emit(&format!(
                "define i64 @f() {{\n  %v = {opcode} i64 7, 3\n  ret i64 %v\n}}\n"
            ));
            let moves: Vec<&String> = lines
                .iter()
                .filter(|l| l.starts_with("movq $") && l.ends_with(", %r8"))
                .collect();
            assert_eq!(moves, vec![&format!("movq ${value}, %r8")], "{opcode}");
            assert!(lines.contains(&format!("movq ${value}, %rax")), "{opcode}");
            assert!(
                !lines.iter().any(|l| {
                    ["addq", "subq", "imulq", "idivq", "orq", "andq"]
                        .iter()
                        .any(|m| l.starts_with(m) && !l.ends_with("%rsp"))
                }),
                "{opcode} was not folded: {lines:#?}"
            );
        }
    }

    #[test]
    fn test_compare_of_literals_folds() {
        let lines = emit(
            r#"
define i1 @f() {
  %c = icmp ne i64 1, 2
  ret i1 %c
}
"#,
        );
        assert_window(&lines, &["movq $1, %r8", "movq $1, %rax"]);
        assert!(!lines.iter().any(|l| l.starts_with("cmpq")));
    }

    #[test]
    fn test_global_access_goes_through_got() {
        let lines = emit(
            r#"
define i64 @f() {
  store i64 7, i64* @g
  %v = load i64, i64* @g
  ret i64 %v
}
"#,
        );
        assert_window(
            &lines,
            &[
                "movq g@GOTPCREL(%rip), %rax",
                "movq $7, (%rax)",
                "movq g@GOTPCREL(%rip), %rax",
                "movq (%rax), %r8",
                "movq %r8, %rax",
            ],
        );
    }

    #[test]
    fn test_stack_argument_is_bound_not_copied() {
        let lines = emit(
            r#"
define i64 @six(i64 %a, i64 %b, i64 %c, i64 %d, i64 %e, i64 %f) {
  %slot = alloca i64
  store i64 %f, i64* %slot
  %v = load i64, i64* %slot
  %w = add i64 %v, %e
  ret i64 %w
}
"#,
        );
        assert!(lines.contains(&"subq $8, %rsp".to_string()));
        assert!(!lines.iter().any(|l| l.contains("-8(%rbp)")));
        assert_window(&lines, &["movq 24(%rbp), %r8", "movq %r8, %r8", "addq 16(%rbp), %r8"]);
    }

    #[test]
    fn test_call_passes_extra_arguments_on_stack() {
        let lines = emit(
            r#"
define i64 @caller() {
  %r = call i64 @callee(i64 1, i64 2, i64 3, i64 4, i64 5, i64 6)
  ret i64 %r
}
"#,
        );
        assert_window(
            &lines,
            &[
                "movq $1, %rdi",
                "movq $2, %rsi",
                "movq $3, %rdx",
                "movq $4, %rcx",
                "pushq $6",
                "pushq $5",
                "call callee@PLT",
                "addq $16, %rsp",
                "movq %rax, %r8",
            ],
        );
    }

    #[test]
    fn test_caller_saved_colors_survive_calls() {
        let lines = emit(
            r#"
define i64 @f(i64 %a) {
  %y = call i64 @ext(i64 1, i64 2, i64 3, i64 4, i64 5)
  %z = add i64 %a, %y
  ret i64 %z
}
"#,
        );
        assert_window(
            &lines,
            &[
                "pushq %r9",
                "movq $1, %rdi",
                "movq $2, %rsi",
                "movq $3, %rdx",
                "movq $4, %rcx",
                "pushq $5",
                "call ext@PLT",
                "addq $8, %rsp",
                "popq %r9",
                "movq %rax, %r8",
                "movq %r8, %r8",
                "addq %r9, %r8",
            ],
        );
    }

    #[test]
    fn test_swapped_arguments_read_from_colors() {
        let lines = emit(
            r#"
define i64 @f(i64 %a, i64 %b) {
  %r = call i64 @g(i64 %b, i64 %a)
  ret i64 %r
}
"#,
        );
        assert_window(
            &lines,
            &[
                "movq %rdi, %r9",
                "movq %rsi, %r8",
                "movq %r8, %rdi",
                "movq %r9, %rsi",
                "call g@PLT",
                "movq %rax, %r8",
            ],
        );
    }

    #[test]
    fn test_void_call_and_return() {
        let lines = emit(
            r#"
define void @f() {
  call void @g()
  ret void
}
"#,
        );
        assert_window(&lines, &["call g@PLT", "jmp f_end", "\tf_end:"]);
        assert!(!lines.iter().any(|l| l.starts_with("pushq %r8")));
    }

    #[test]
    fn test_element_address() {
        let lines = emit(
            r#"
define i64* @at(i64* %p, i64 %i) {
  %q = getelementptr i64, i64* %p, i64 %i
  %r = getelementptr [4 x i64], [4 x i64]* %q, i64 0, i64 3
  ret i64* %r
}
"#,
        );
        assert_window(
            &lines,
            &["movq %rdi, %r8", "movq %rsi, %r9", "leaq (%r8,%r9,8), %r8"],
        );
        assert_window(&lines, &["movq $3, %rax", "leaq (%r8,%rax,8), %r8"]);
    }

    #[test]
    fn test_element_address_rejects_nonzero_leading_index() {
        let err = emit_with(
            r#"
define i64* @at([4 x i64]* %p) {
  %q = getelementptr [4 x i64], [4 x i64]* %p, i64 1, i64 3
  ret i64* %q
}
"#,
            &Config::default(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::Malformed(_)), "{err}");
    }

    #[test]
    fn test_unsupported_opcode() {
        let err = emit_with(
            r#"
define i64 @f(i64 %a) {
  %b = xor i64 %a, 1
  ret i64 %b
}
"#,
            &Config::default(),
        )
        .unwrap_err();
        match err {
            Error::Unsupported { function, opcode } => {
                assert_eq!(function, "f");
                assert_eq!(opcode, "xor");
            }
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn test_stack_slot_as_value_is_malformed() {
        let err = emit_with(
            r#"
define i64 @f() {
  %slot = alloca i64
  %x = add i64 %slot, 1
  ret i64 %x
}
"#,
            &Config::default(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::Malformed(_)), "{err}");
    }

    #[test]
    fn test_annotations() {
        let config = Config {
            annotate: true,
            ..Config::default()
        };
        let lines = emit_with(CONSTANT, &config).unwrap();
        assert_window(
            &lines,
            &["  # %a = add i64 3, 4", "movq $7, %r8", "  # %b = mul i64 %a, 2"],
        );
    }

    #[test]
    fn test_memory_to_memory_store() {
        let lines = emit(
            r#"
define void @f(i64 %a, i64 %b, i64 %c, i64 %d, i64 %e) {
  store i64 %e, i64* @g
  ret void
}
"#,
        );
        assert_window(
            &lines,
            &["movq g@GOTPCREL(%rip), %rax", "pushq 16(%rbp)", "popq (%rax)"],
        );
    }
}
