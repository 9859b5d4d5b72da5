use std::io::IsTerminal;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use paisley::bytecode::Program;
use paisley::diagnostic::{self, Diagnostic, Diagnostics, Format};
use paisley::vm::{Vm, VmConfig};

/// Run compiled Paisley bytecode.
#[derive(Debug, Parser)]
#[command(name = "paisley", version)]
struct Cli {
    /// Refuse file system, environment, and shell access.
    #[arg(long)]
    sandbox: bool,

    /// Seed for the random number builtins.
    #[arg(long)]
    seed: Option<u64>,

    /// How warnings and errors are written to stderr.
    #[arg(long, value_enum, default_value_t = Format::Ansi)]
    diagnostics: Format,

    #[arg(long)]
    no_color: bool,

    /// Bytecode file as JSON: `{"instructions": [...], "constants": [...]}`.
    bytecode: PathBuf,

    /// Exposed to the program as `@`.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    args: Vec<String>,
}

fn report(d: &Diagnostic, format: Format, use_color: bool) {
    eprintln!("{}", diagnostic::render(d, format, use_color).trim_end());
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let use_color = !cli.no_color && std::env::var_os("NO_COLOR").is_none() && std::io::stderr().is_terminal();

    let program = match Program::load(&cli.bytecode) {
        Ok(p) => p,
        Err(e) => {
            report(&Diagnostic::from(&e), cli.diagnostics, use_color);
            return ExitCode::from(2);
        }
    };

    let config = VmConfig {
        sandboxed: cli.sandbox,
        seed: cli.seed,
        argv: cli.args,
        diagnostics: Diagnostics::Stderr { format: cli.diagnostics, use_color },
    };
    let mut vm = Vm::new(program, config);
    match vm.run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            report(&Diagnostic::from(&e), cli.diagnostics, use_color);
            ExitCode::from(u8::try_from(e.exit_code()).unwrap_or(2))
        }
    }
}
