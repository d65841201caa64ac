mod backend;
mod preprocess;

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use minigo_compiler::{Analyzer, Codegen, Lexer};

use crate::preprocess::preprocess;

#[derive(Parser, Debug)]
#[command(name = "minigoc", version)]
#[command(about = "MiniGo compiler: Go subset to LLVM IR")]
struct Cli {
    /// Log debug events (MINIGO_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the token stream of a source file
    Tokens { file: PathBuf },
    /// Parse a source file and print its syntax tree
    Parse { file: PathBuf },
    /// Parse and analyze a source file, reporting every semantic error
    Check { file: PathBuf },
    /// Compile source files to LLVM IR, object files or executables
    Build {
        #[arg(required = true)]
        files: Vec<PathBuf>,
        #[arg(long, default_value = "output")]
        out_dir: PathBuf,
        #[arg(long, value_enum, default_value_t = Emit::Ir)]
        emit: Emit,
        /// Target triple written into the module and passed to llc
        #[arg(long)]
        target: Option<String>,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Emit {
    Ir,
    Obj,
    Exe,
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    match cli.command {
        Command::Tokens { file } => tokens(&file),
        Command::Parse { file } => parse(&file),
        Command::Check { file } => check(&file),
        Command::Build { files, out_dir, emit, target } => build(&files, &out_dir, emit, target.as_deref()),
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_env("MINIGO_LOG").unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn read_source(path: &Path) -> Result<String> {
    let raw = fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    Ok(preprocess(&raw))
}

fn status(ok: bool) -> ExitCode { if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE } }

fn tokens(file: &Path) -> Result<ExitCode> {
    let src = read_source(file)?;
    let mut lexer = Lexer::new(&src);
    for (i, t) in lexer.by_ref().enumerate() {
        println!("{i:04} {:>4}:{:<4} {:<12} {}", t.pos.line, t.pos.column, t.kind.name(), t.kind.text());
    }
    Ok(status(lexer.errors().is_empty()))
}

fn parse(file: &Path) -> Result<ExitCode> {
    let src = read_source(file)?;
    match minigo_compiler::parse(&src) {
        Ok(prog) => {
            println!("{prog:#?}");
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            eprintln!("{}: {e}", file.display());
            Ok(ExitCode::FAILURE)
        }
    }
}

fn check(file: &Path) -> Result<ExitCode> {
    let src = read_source(file)?;
    let prog = match minigo_compiler::parse(&src) {
        Ok(prog) => prog,
        Err(e) => {
            eprintln!("{}: {e}", file.display());
            return Ok(ExitCode::FAILURE);
        }
    };
    let mut analyzer = Analyzer::new();
    let ok = analyzer.analyze(&prog);
    for d in analyzer.diagnostics() {
        eprintln!("{}: {d}", file.display());
    }
    if ok { println!("{}: no semantic errors", file.display()); }
    Ok(status(ok))
}

/// Every file is attempted; the exit status reports whether all succeeded.
fn build(files: &[PathBuf], out_dir: &Path, emit: Emit, target: Option<&str>) -> Result<ExitCode> {
    fs::create_dir_all(out_dir).with_context(|| format!("failed to create {}", out_dir.display()))?;
    let mut failed = 0;
    for file in files {
        match build_one(file, out_dir, emit, target) {
            Ok(artifact) => info!(file = %file.display(), output = %artifact.display(), "built"),
            Err(e) => {
                failed += 1;
                error!(file = %file.display(), "{e:#}");
            }
        }
    }
    info!(total = files.len(), failed, "build finished");
    Ok(status(failed == 0))
}

fn build_one(file: &Path, out_dir: &Path, emit: Emit, target: Option<&str>) -> Result<PathBuf> {
    let src = read_source(file)?;
    let prog = minigo_compiler::parse(&src)?;

    let mut analyzer = Analyzer::new();
    if !analyzer.analyze(&prog) {
        for d in analyzer.diagnostics() {
            eprintln!("{}: {d}", file.display());
        }
        bail!("{} semantic error(s)", analyzer.diagnostics().len());
    }

    let mut codegen = Codegen::new();
    if let Some(triple) = target {
        codegen = codegen.with_target_triple(triple);
    }
    let module = codegen.generate(&prog)?;

    let stem = file.file_stem().with_context(|| format!("{} has no file name", file.display()))?;
    let ll = out_dir.join(format!("{}.ll", stem.to_string_lossy()));
    fs::write(&ll, module.to_string()).with_context(|| format!("failed to write {}", ll.display()))?;
    if emit == Emit::Ir {
        return Ok(ll);
    }
    let obj = backend::emit_object(&ll, target)?;
    if emit == Emit::Obj {
        return Ok(obj);
    }
    backend::link_executable(&obj)
}
