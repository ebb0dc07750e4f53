//! Physical register naming for the x86-64 target.

/// Color `c` lives in `ALLOCATABLE[c]`.
pub const ALLOCATABLE: [&str; 8] = [
    "%r8", "%r9", "%r10", "%r11", "%r12", "%r13", "%r14", "%r15",
];

/// Integer arguments 0..4, incoming and outgoing. Later arguments go on the
/// stack.
pub const ARG_REGS: [&str; 4] = ["%rdi", "%rsi", "%rdx", "%rcx"];

pub const RETURN: &str = "%rax";

/// Palette registers a callee may overwrite. Our own functions save every
/// color they use, but C code does not.
pub const CALLER_SAVED: [&str; 4] = ["%r8", "%r9", "%r10", "%r11"];

pub fn color(color: usize) -> Option<&'static str> {
    ALLOCATABLE.get(color).copied()
}

/// Registers saved by the prologue when `count` colors are in use.
pub fn saved(count: usize) -> &'static [&'static str] {
    &ALLOCATABLE[..count.min(ALLOCATABLE.len())]
}
