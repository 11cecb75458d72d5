pub mod cli;
pub mod config;
pub mod error;
pub mod model;
pub mod parser;
pub mod processor;
pub mod writer;

use anyhow::{Context, anyhow};
use clap::Parser;

pub fn run() -> anyhow::Result<()> {
    let args = cli::Cli::parse();
    build(&args)
}

/// Loads, compiles and writes everything `args` asks for.
pub fn build(args: &cli::Cli) -> anyhow::Result<()> {
    // 1. ── Load ───────────────────────────────────────────────────────
    let raw = parser::load(&args.input, args.verbose)
        .with_context(|| format!("Loading sources from {}", args.input.display()))?;
    let config = config::load(args.config.as_deref(), &raw.source_dir)?;

    // 2. ── Process ────────────────────────────────────────────────────
    let processed = processor::run(&raw, &config, args.emit, args.verbose)
        .with_context(|| format!("Compiling {}", raw.name))?;

    // 3. ── Write outputs ──────────────────────────────────────────────
    let out_dir = args.output.as_deref().unwrap_or(raw.source_dir.as_path());
    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("Creating {}", out_dir.display()))?;

    let mut written =
        writer::vm::emit(&processed, out_dir).with_context(|| "Writing VM artifacts")?;
    written.extend(
        writer::asm::emit(&processed, out_dir).with_context(|| "Writing assembly artifacts")?,
    );
    if args.verbose {
        for path in &written {
            println!("Wrote {}", path.display());
        }
    }

    // 4. ── Report ─────────────────────────────────────────────────────
    if !processed.succeeded() {
        for failure in &processed.failures {
            eprintln!("{}: {}", failure.name, failure.error);
        }
        return Err(anyhow!(
            "{} of {} units failed",
            processed.failures.len(),
            raw.units.len()
        ));
    }
    Ok(())
}
