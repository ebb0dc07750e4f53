use crate::analysis::{Liveness, UseDef};
use crate::config::Config;
use crate::error::Result;
use crate::ir::{Function, GlobalVariable};
use crate::optimizer::registers::Coloring;

pub mod x86_64;

/// A target: turns analyzed functions into assembly and stitches them into a
/// module.
pub trait Backend: Sync {
    /// How many colors the allocator may use.
    fn allocatable_registers(&self) -> usize;

    fn generate_function(
        &self,
        func: &Function,
        usedef: &UseDef,
        liveness: &Liveness,
        coloring: &Coloring,
        config: &Config,
    ) -> Result<Vec<String>>;

    fn generate_assembly(
        &self,
        globals: &[GlobalVariable],
        functions: &[Vec<String>],
        config: &Config,
    ) -> Result<String>;
}
