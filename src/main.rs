//! `lbvm`: assemble, run and inspect LBVM programs.

use std::io::{IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use lbvm::diagnostic::{ansi::AnsiRenderer, json, registry, Diagnostic};
use lbvm::{Limits, Machine, OutputSink, Program};

#[derive(Parser, Debug)]
#[command(name = "lbvm", version)]
#[command(about = "Assembler and virtual machine for LBVM bytecode")]
struct Cli {
    /// Log at debug level (overrides LBVM_LOG)
    #[arg(long, global = true)]
    verbose: bool,

    /// Log every executed instruction (overrides LBVM_LOG)
    #[arg(long, global = true)]
    trace: bool,

    /// Report errors as JSON on stderr
    #[arg(long, global = true)]
    json: bool,

    /// Never colour diagnostics
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Assemble a source file into an LBVM container
    Asm {
        input: PathBuf,

        /// Output path (default: input with the extension .lbvm)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Run a container or an assembly source file
    Run {
        file: PathBuf,

        /// Seed for RANDOM
        #[arg(long)]
        seed: Option<u64>,

        /// Maximum depth of non-tail calls
        #[arg(long)]
        max_calls: Option<usize>,
    },
    /// Print the decoded instructions of a program
    Disasm { file: PathBuf },
    /// Explain an error code such as LBVM-R007
    Explain { code: String },
}

fn init_logging(cli: &Cli) {
    let filter = if cli.trace {
        EnvFilter::new("lbvm=trace")
    } else if cli.verbose {
        EnvFilter::new("lbvm=debug")
    } else {
        EnvFilter::try_from_env("LBVM_LOG").unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&cli);

    let report = Reporter {
        json: cli.json,
        color: !cli.no_color && std::env::var_os("NO_COLOR").is_none() && std::io::stderr().is_terminal(),
    };

    let result = match &cli.command {
        Command::Asm { input, output } => assemble(input, output.as_deref()),
        Command::Run { file, seed, max_calls } => run(file, *seed, *max_calls, cli.json),
        Command::Disasm { file } => disassemble(file, cli.json),
        Command::Explain { code } => explain(code),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(d) => {
            report.emit(&d);
            ExitCode::FAILURE
        }
    }
}

struct Reporter {
    json: bool,
    color: bool,
}

impl Reporter {
    fn emit(&self, d: &Diagnostic) {
        if self.json {
            eprintln!("{}", json::render(d));
        } else {
            eprint!("{}", AnsiRenderer { use_color: self.color }.render(d));
        }
    }
}

// ── Loading ─────────────────────────────────────────────────────────────────

fn read_file(path: &Path) -> Result<Vec<u8>, Diagnostic> {
    std::fs::read(path).map_err(|e| Diagnostic::error(format!("cannot read {}: {e}", path.display())))
}

/// A container if the file starts with the LBVM magic, assembly otherwise.
fn load(path: &Path) -> Result<Program, Diagnostic> {
    let bytes = read_file(path)?;
    if bytes.starts_with(&lbvm::container::MAGIC) {
        tracing::debug!(path = %path.display(), "loading container");
        return Program::read_from(bytes.as_slice())
            .map_err(|e| Diagnostic::from(&e).with_file(path.display().to_string()));
    }
    let source = String::from_utf8(bytes)
        .map_err(|_| Diagnostic::error(format!("{} is neither an LBVM container nor UTF-8 text", path.display())))?;
    tracing::debug!(path = %path.display(), "assembling source");
    Program::assemble_str(&source).map_err(|e| {
        Diagnostic::from(&e)
            .with_source(source.as_str())
            .with_file(path.display().to_string())
    })
}

// ── Commands ────────────────────────────────────────────────────────────────

fn assemble(input: &Path, output: Option<&Path>) -> Result<(), Diagnostic> {
    let program = load(input)?;
    let output = output.map(Path::to_path_buf).unwrap_or_else(|| input.with_extension("lbvm"));
    let bytes = program.to_bytes().map_err(|e| Diagnostic::from(&e))?;
    std::fs::write(&output, bytes)
        .map_err(|e| Diagnostic::error(format!("cannot write {}: {e}", output.display())))?;
    tracing::info!(path = %output.display(), "container written");
    Ok(())
}

fn run(file: &Path, seed: Option<u64>, max_calls: Option<usize>, as_json: bool) -> Result<(), Diagnostic> {
    let program = load(file)?;
    let mut console = Console { at_line_start: true };

    let mut machine = Machine::new(&program).with_output(&mut console);
    if let Some(depth) = max_calls {
        machine = machine.with_limits(Limits::with_call_depth(depth));
    }
    if let Some(seed) = seed {
        machine = machine.with_seed(seed);
    }
    let result = machine.run();

    if !console.at_line_start {
        println!();
    }
    let value = result.map_err(|e| Diagnostic::from(&e).with_file(file.display().to_string()))?;
    if as_json {
        let obj = serde_json::json!({ "type": value.type_name(), "value": format!("{value:?}") });
        println!("{obj}");
    } else {
        println!("{value:?}");
    }
    Ok(())
}

fn disassemble(file: &Path, as_json: bool) -> Result<(), Diagnostic> {
    let program = load(file)?;
    let listing = program.disassemble();
    if as_json {
        let text = serde_json::to_string_pretty(&listing)
            .map_err(|e| Diagnostic::error(format!("cannot serialize listing: {e}")))?;
        println!("{text}");
    } else {
        for line in &listing {
            println!("{line}");
        }
    }
    Ok(())
}

fn explain(code: &str) -> Result<(), Diagnostic> {
    match registry::lookup(code) {
        Some(entry) => {
            print!("{}", entry.long);
            Ok(())
        }
        None => Err(Diagnostic::error(format!("unknown error code '{code}'"))
            .with_suggestion("codes look like LBVM-A001, LBVM-F002, LBVM-D003 or LBVM-R004")),
    }
}

/// Standard output for `PRINT`, remembering whether the last write ended a
/// line so the result always starts on a fresh one.
struct Console {
    at_line_start: bool,
}

impl OutputSink for Console {
    fn print(&mut self, text: &str) -> std::io::Result<()> {
        if text.is_empty() {
            return Ok(());
        }
        let mut out = std::io::stdout().lock();
        out.write_all(text.as_bytes())?;
        out.flush()?;
        self.at_line_start = text.ends_with('\n');
        Ok(())
    }
}
