use std::path::PathBuf;

use clap::Parser;

use crate::config::Config;
use crate::optimizer::registers::AVAILABLE_REGS;

#[derive(Parser)]
#[command(name = "ll2asm")]
#[command(about = "Compiles textual LLVM-style IR into x86-64 assembly")]
pub struct Cli {
    /// The IR file to compile (e.g., "prog.ll")
    pub input: PathBuf,

    /// Write the assembly here instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    #[clap(short, long, default_value = "x86_64")]
    pub arch: String,

    /// Skip folding, branch resolution and the peephole passes
    #[arg(long)]
    pub no_optimize: bool,

    /// Precede each lowered instruction with the IR it came from
    #[arg(long)]
    pub annotate: bool,

    /// Number of registers the allocator may use
    #[arg(short, long, default_value_t = AVAILABLE_REGS as u8,
          value_parser = clap::value_parser!(u8).range(1..=AVAILABLE_REGS as i64))]
    pub registers: u8,

    /// Dump each function's interference graph (.dot) and coloring (.txt)
    #[arg(long)]
    pub graph_dir: Option<PathBuf>,
}

impl Cli {
    pub fn parse() -> Self {
        Parser::parse()
    }

    pub fn config(&self) -> Config {
        Config {
            optimize: !self.no_optimize,
            registers: self.registers as usize,
            annotate: self.annotate,
            file_name: self
                .input
                .file_name()
                .map(|name| name.to_string_lossy().into_owned()),
        }
    }
}
