pub mod analysis;
pub mod backend;
pub mod cli;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod frontend;
pub mod ir;
pub mod optimizer;
pub mod verification;

#[cfg(test)]
mod test_helpers;

use rayon::prelude::*;

use analysis::{Liveness, UseDef};
use backend::Backend;
use diagnostics::FunctionDiagnostics;
use ir::{Function, Module};
use optimizer::passes::Optimizer;
use optimizer::registers::{GraphColoring, InterferenceGraph, RegisterAllocator};

pub use config::Config;
pub use error::{Error, Result};

/// Assembly for one function plus what the allocator saw.
#[derive(Debug, Clone)]
pub struct CompiledFunction {
    pub name: String,
    pub lines: Vec<String>,
    pub diagnostics: FunctionDiagnostics,
}

#[derive(Debug, Clone)]
pub struct Compilation {
    pub assembly: String,
    /// One entry per function, in module order.
    pub diagnostics: Vec<FunctionDiagnostics>,
}

fn check_config(config: &Config, backend: &dyn Backend) -> Result<()> {
    let available = backend.allocatable_registers();
    if config.registers == 0 || config.registers > available {
        return Err(Error::InvalidConfig(format!(
            "{} registers requested, the target has 1 to {available}",
            config.registers
        )));
    }
    Ok(())
}

/// Runs liveness, coloring, selection and (when optimizing) the peephole
/// passes over a single function.
pub fn compile_function(
    func: &Function,
    config: &Config,
    backend: &dyn Backend,
) -> Result<CompiledFunction> {
    check_config(config, backend)?;

    let usedef = UseDef::build(func)?;
    let liveness = Liveness::analyze(&usedef.points);
    let graph = InterferenceGraph::build(&usedef.points, &liveness);

    let allocator = GraphColoring {
        registers: config.registers,
    };
    let coloring = allocator
        .allocate(&graph, &usedef.temporaries())
        .map_err(|stuck| Error::AllocationInfeasible {
            function: func.name.clone(),
            registers: allocator.registers(),
            remaining: stuck.remaining,
        })?;

    let mut lines = backend.generate_function(func, &usedef, &liveness, &coloring, config)?;
    if config.optimize {
        lines = Optimizer.run_all(lines);
    }

    log::info!(
        "compiled `{}`: {} program points, {} colors, {} lines",
        func.name,
        usedef.points.len(),
        coloring.colors_needed(),
        lines.len()
    );

    Ok(CompiledFunction {
        name: func.name.clone(),
        lines,
        diagnostics: FunctionDiagnostics::new(&func.name, graph, coloring),
    })
}

/// Verifies and compiles a whole module. Functions are compiled in parallel;
/// every one is attempted and the first failure in module order wins.
pub fn compile_module(
    module: &Module,
    config: &Config,
    backend: &dyn Backend,
) -> Result<Compilation> {
    check_config(config, backend)?;
    verification::verify(module)?;

    let results: Vec<Result<CompiledFunction>> = module
        .functions
        .par_iter()
        .map(|func| compile_function(func, config, backend))
        .collect();

    let mut compiled = Vec::with_capacity(results.len());
    let mut first_error = None;
    for (func, result) in module.functions.iter().zip(results) {
        match result {
            Ok(function) => compiled.push(function),
            Err(err) => {
                log::error!("failed to compile `{}`: {err}", func.name);
                first_error.get_or_insert(err);
            }
        }
    }
    if let Some(err) = first_error {
        return Err(err);
    }

    let (functions, diagnostics): (Vec<_>, Vec<_>) = compiled
        .into_iter()
        .map(|function| (function.lines, function.diagnostics))
        .unzip();
    let assembly = backend.generate_assembly(&module.globals, &functions, config)?;

    Ok(Compilation {
        assembly,
        diagnostics,
    })
}
