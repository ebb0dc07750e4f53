//! In-memory model of a parsed IR module.
//!
//! Everything here is produced by the frontend and treated as read-only by
//! the analysis and backend stages.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Type {
    Void,
    Label,
    Int(u32),
    Ptr(Box<Type>),
    /// Untyped `ptr`.
    Opaque,
    Array(u64, Box<Type>),
    Function { ret: Box<Type>, params: Vec<Type> },
}

impl Type {
    pub fn pointer_to(self) -> Type {
        Type::Ptr(Box::new(self))
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Void => f.write_str("void"),
            Type::Label => f.write_str("label"),
            Type::Int(bits) => write!(f, "i{bits}"),
            Type::Ptr(inner) => write!(f, "{inner}*"),
            Type::Opaque => f.write_str("ptr"),
            Type::Array(len, inner) => write!(f, "[{len} x {inner}]"),
            Type::Function { ret, params } => {
                write!(f, "{ret} (")?;
                for (i, param) in params.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{param}")?;
                }
                f.write_str(")")
            }
        }
    }
}

/// Signed integer comparison predicates understood by `icmp`.
#[derive(Debug, PartialEq, Clone, Eq, Hash, Copy)]
pub enum Predicate {
    Eq,
    Ne,
    Slt,
    Sle,
    Sgt,
    Sge,
}

impl Predicate {
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        Some(match keyword {
            "eq" => Predicate::Eq,
            "ne" => Predicate::Ne,
            "slt" => Predicate::Slt,
            "sle" => Predicate::Sle,
            "sgt" => Predicate::Sgt,
            "sge" => Predicate::Sge,
            _ => return None,
        })
    }

    pub fn evaluate(self, lhs: i64, rhs: i64) -> bool {
        match self {
            Predicate::Eq => lhs == rhs,
            Predicate::Ne => lhs != rhs,
            Predicate::Slt => lhs < rhs,
            Predicate::Sle => lhs <= rhs,
            Predicate::Sgt => lhs > rhs,
            Predicate::Sge => lhs >= rhs,
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Predicate::Eq => "eq",
            Predicate::Ne => "ne",
            Predicate::Slt => "slt",
            Predicate::Sle => "sle",
            Predicate::Sgt => "sgt",
            Predicate::Sge => "sge",
        })
    }
}

#[derive(Debug, PartialEq, Clone, Eq, Hash)]
pub enum Opcode {
    Alloca,
    Store,
    Load,
    Br,
    Icmp(Predicate),
    Add,
    Sub,
    Mul,
    SDiv,
    SRem,
    Or,
    And,
    Call,
    Ret,
    GetElementPtr,
    Bitcast,
    /// Anything the backend has no lowering for. Kept so that the failure
    /// surfaces in the selector with the function it belongs to.
    Unsupported(String),
}

impl Opcode {
    /// Maps a mnemonic onto an opcode. `icmp` needs its predicate and is
    /// handled by the parser directly.
    pub fn from_mnemonic(mnemonic: &str) -> Self {
        match mnemonic {
            "alloca" => Opcode::Alloca,
            "store" => Opcode::Store,
            "load" => Opcode::Load,
            "br" => Opcode::Br,
            "add" => Opcode::Add,
            "sub" => Opcode::Sub,
            "mul" => Opcode::Mul,
            "sdiv" => Opcode::SDiv,
            "srem" => Opcode::SRem,
            "or" => Opcode::Or,
            "and" => Opcode::And,
            "call" => Opcode::Call,
            "ret" => Opcode::Ret,
            "getelementptr" => Opcode::GetElementPtr,
            "bitcast" => Opcode::Bitcast,
            other => Opcode::Unsupported(other.to_string()),
        }
    }

    pub fn is_binary(&self) -> bool {
        matches!(
            self,
            Opcode::Add
                | Opcode::Sub
                | Opcode::Mul
                | Opcode::SDiv
                | Opcode::SRem
                | Opcode::Or
                | Opcode::And
        )
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Opcode::Alloca => f.write_str("alloca"),
            Opcode::Store => f.write_str("store"),
            Opcode::Load => f.write_str("load"),
            Opcode::Br => f.write_str("br"),
            Opcode::Icmp(pred) => write!(f, "icmp {pred}"),
            Opcode::Add => f.write_str("add"),
            Opcode::Sub => f.write_str("sub"),
            Opcode::Mul => f.write_str("mul"),
            Opcode::SDiv => f.write_str("sdiv"),
            Opcode::SRem => f.write_str("srem"),
            Opcode::Or => f.write_str("or"),
            Opcode::And => f.write_str("and"),
            Opcode::Call => f.write_str("call"),
            Opcode::Ret => f.write_str("ret"),
            Opcode::GetElementPtr => f.write_str("getelementptr"),
            Opcode::Bitcast => f.write_str("bitcast"),
            Opcode::Unsupported(name) => f.write_str(name),
        }
    }
}

#[derive(Debug, PartialEq, Clone, Eq, Hash)]
pub enum Operand {
    /// A virtual register: temporary, parameter or stack-allocated local.
    Reg(String),
    Imm(i64),
    Global(String),
    Label(String),
    Callee(String),
}

impl Operand {
    pub fn reg(&self) -> Option<&str> {
        match self {
            Operand::Reg(name) => Some(name),
            _ => None,
        }
    }

    pub fn label(&self) -> Option<&str> {
        match self {
            Operand::Label(name) => Some(name),
            _ => None,
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Reg(name) => write!(f, "%{name}"),
            Operand::Imm(value) => write!(f, "{value}"),
            Operand::Global(name) | Operand::Callee(name) => write!(f, "@{name}"),
            Operand::Label(name) => write!(f, "label %{name}"),
        }
    }
}

#[derive(Debug, PartialEq, Clone)]
pub struct Instruction {
    pub opcode: Opcode,
    pub operands: Vec<Operand>,
    pub result: Option<String>,
    /// The type written next to the opcode in the source (the result type
    /// for most instructions, the allocated type for `alloca`).
    pub ty: Type,
}

impl Instruction {
    pub fn new(opcode: Opcode, operands: Vec<Operand>, result: Option<&str>, ty: Type) -> Self {
        Self {
            opcode,
            operands,
            result: result.map(str::to_string),
            ty,
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(result) = &self.result {
            write!(f, "%{result} = ")?;
        }
        write!(f, "{} {}", self.opcode, self.ty)?;
        for (i, operand) in self.operands.iter().enumerate() {
            f.write_str(if i == 0 { " " } else { ", " })?;
            write!(f, "{operand}")?;
        }
        Ok(())
    }
}

#[derive(Debug, PartialEq, Clone)]
pub struct BasicBlock {
    /// `None` only for an entry block written without a label.
    pub label: Option<String>,
    pub instrs: Vec<Instruction>,
}

#[derive(Debug, PartialEq, Clone)]
pub struct Param {
    pub name: String,
    pub ty: Type,
}

#[derive(Debug, PartialEq, Clone)]
pub struct Function {
    pub name: String,
    pub ret: Type,
    pub params: Vec<Param>,
    pub blocks: Vec<BasicBlock>,
}

impl Function {
    /// Position of `name` in the parameter list, which decides the argument
    /// register or caller-frame slot it arrives in.
    pub fn param_index(&self, name: &str) -> Option<usize> {
        self.params.iter().position(|param| param.name == name)
    }
}

#[derive(Debug, PartialEq, Clone)]
pub struct GlobalVariable {
    pub name: String,
    /// Element type; globals are always zero-initialized.
    pub ty: Type,
}

#[derive(Debug, Default, PartialEq, Clone)]
pub struct Module {
    pub globals: Vec<GlobalVariable>,
    pub functions: Vec<Function>,
}
