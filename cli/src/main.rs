use std::fs;
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{bail, Context};
use clap::Parser;
use pop65::{AsmConfig, Assembler, DEFAULT_MAX_INCLUDE_DEPTH};
use tracing::Level;

#[derive(Parser)]
#[command(version, about = "Two-pass 6502 cross-assembler", long_about = None)]
struct Args {
    /// Assembly source file
    source: PathBuf,

    /// Object file to write
    #[arg(short, long)]
    output: PathBuf,

    /// Write `name = $XXXX` lines for every assignment
    #[arg(short, long)]
    symbols: Option<PathBuf>,

    /// Write the records produced by `.dbg` templates
    #[arg(short = 'g', long)]
    debug: Option<PathBuf>,

    /// Write a human-readable listing
    #[arg(short, long)]
    listing: Option<PathBuf>,

    /// Search directories for included files
    #[arg(short = 'I', long)]
    include: Vec<PathBuf>,

    /// Program counter before the first `.org`, e.g. `$0801` or `2049`
    #[arg(long, value_parser = parse_origin)]
    origin: Option<u16>,

    /// Maximum `.inc` nesting
    #[arg(long, default_value_t = DEFAULT_MAX_INCLUDE_DEPTH)]
    max_include_depth: usize,

    /// One of `TRACE`, `DEBUG`, `INFO`, `WARN`, or `ERROR`
    #[arg(long, default_value_t = Level::WARN)]
    log_level: Level,
}

fn parse_origin(s: &str) -> Result<u16, String> {
    pop65::parser::number::NumberParser::parse(s).map_err(|e| e.to_string())
}

fn main() -> ExitCode {
    let args = Args::parse();
    tracing_subscriber::fmt()
        .with_max_level(args.log_level)
        .with_writer(io::stderr)
        .init();

    if let Err(e) = main_real(args) {
        tracing::error!("{e:#}");
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn main_real(args: Args) -> anyhow::Result<()> {
    let config = AsmConfig {
        origin: args.origin,
        max_include_depth: args.max_include_depth,
        include_dirs: args.include,
    };
    let mut assembler = Assembler::new(config);
    let out = assembler.assemble_file(&args.source)?;

    if !out.is_success() {
        for failure in &out.diagnostics {
            tracing::error!("{failure}");
        }
        bail!("{} assertion(s) failed, no output written", out.diagnostics.len());
    }

    fs::write(&args.output, &out.bytes)
        .with_context(|| format!("cant write {}", args.output.display()))?;
    tracing::info!("wrote {} bytes to {}", out.bytes.len(), args.output.display());

    if let Some(path) = &args.symbols {
        fs::write(path, out.symbol_file())
            .with_context(|| format!("cant write {}", path.display()))?;
    }
    if let Some(path) = &args.debug {
        fs::write(path, out.debug_file())
            .with_context(|| format!("cant write {}", path.display()))?;
    }
    if let Some(path) = &args.listing {
        out.listing
            .save(path)
            .with_context(|| format!("cant write {}", path.display()))?;
    }
    Ok(())
}
