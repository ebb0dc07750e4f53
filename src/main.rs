use std::fs;
use std::process;

use ll2asm::backend::Backend;
use ll2asm::backend::x86_64::Codegen;
use ll2asm::cli::Cli;
use ll2asm::diagnostics;
use ll2asm::frontend::parse_module;
use ll2asm::{Error, Result, compile_module};

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    if let Err(err) = run(&cli) {
        eprintln!("error: {err}");
        process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<()> {
    let source = fs::read_to_string(&cli.input)?;
    let module = parse_module(&source)?;

    // select backend to use
    let backend: Box<dyn Backend> = match cli.arch.as_str() {
        "x86_64" => Box::new(Codegen),
        other => {
            return Err(Error::InvalidConfig(format!("unknown architecture `{other}`")));
        }
    };

    let compilation = compile_module(&module, &cli.config(), backend.as_ref())?;

    if let Some(dir) = &cli.graph_dir {
        fs::create_dir_all(dir)?;
        for function in &compilation.diagnostics {
            fs::write(
                dir.join(format!("{}.dot", function.function)),
                diagnostics::to_dot(function),
            )?;
            fs::write(
                dir.join(format!("{}.txt", function.function)),
                diagnostics::summary(function),
            )?;
        }
    }

    match &cli.output {
        Some(path) => fs::write(path, &compilation.assembly)?,
        None => print!("{}", compilation.assembly),
    }

    Ok(())
}
