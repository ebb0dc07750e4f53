pub mod frame;
pub mod lower;
pub mod regs;

use crate::analysis::{Liveness, UseDef};
use crate::backend::Backend;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::ir::{Function, GlobalVariable, Type};
use crate::optimizer::registers::Coloring;

use lower::FunctionEmitter;

/// x86-64 System V flavored code generator (AT&T syntax, PIC globals).
#[derive(Debug, Default, Clone, Copy)]
pub struct Codegen;

impl Backend for Codegen {
    fn allocatable_registers(&self) -> usize {
        regs::ALLOCATABLE.len()
    }

    fn generate_function(
        &self,
        func: &Function,
        usedef: &UseDef,
        liveness: &Liveness,
        coloring: &Coloring,
        config: &Config,
    ) -> Result<Vec<String>> {
        FunctionEmitter::new(func, usedef, liveness, coloring, config).emit()
    }

    fn generate_assembly(
        &self,
        globals: &[GlobalVariable],
        functions: &[Vec<String>],
        config: &Config,
    ) -> Result<String> {
        let mut lines = Vec::new();

        if let Some(name) = &config.file_name {
            lines.push(format!("\t.file\t\"{name}\""));
        }

        lines.push("\t.bss".to_string());
        for global in globals {
            lines.extend(global_data(global)?);
        }

        lines.push("\t.text".to_string());
        for function in functions {
            lines.extend(function.iter().cloned());
        }

        lines.push(".section\t\".note.GNU-stack\",\"\",@progbits".to_string());

        let mut asm = lines.join("\n");
        asm.push('\n');
        Ok(asm)
    }
}

/// Zero-initialized storage for one global, sized by its element type.
fn global_data(global: &GlobalVariable) -> Result<[String; 3]> {
    let directive = match global.ty {
        Type::Int(64) => ".quad",
        Type::Int(32) => ".long",
        Type::Int(8) => ".byte",
        ref other => {
            return Err(Error::Malformed(format!(
                "global @{} has unsupported storage type `{other}`",
                global.name
            )));
        }
    };
    Ok([
        format!("\t.globl\t{}", global.name),
        format!("{}:", global.name),
        format!("\t{directive}\t0"),
    ])
}
