use crate::optimizer::registers::AVAILABLE_REGS;

/// Options threaded through selection and the peephole passes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Immediate folding, propagation of folded temporaries, resolution of
    /// branches on known conditions, saving only the registers actually
    /// colored, and the peephole passes.
    pub optimize: bool,
    /// Palette size handed to the register allocator.
    pub registers: usize,
    /// Precede every lowered instruction with a `  # <ir>` comment.
    pub annotate: bool,
    /// Name for the `.file` directive; omitted when `None`.
    pub file_name: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            optimize: true,
            registers: AVAILABLE_REGS,
            annotate: false,
            file_name: None,
        }
    }
}

impl Config {
    pub fn unoptimized() -> Self {
        Self {
            optimize: false,
            ..Self::default()
        }
    }

    pub fn with_registers(self, registers: usize) -> Self {
        Self { registers, ..self }
    }

    pub fn with_file_name(self, name: impl Into<String>) -> Self {
        Self {
            file_name: Some(name.into()),
            ..self
        }
    }
}
