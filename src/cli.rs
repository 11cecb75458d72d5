use clap::Parser;
use std::path::PathBuf;

use crate::model::Emit;

#[derive(Parser, Debug)]
#[command(name = "jackc", author, version, about)]
pub struct Cli {
    /// A .jack or .vm file, or a directory of them
    pub input: PathBuf,
    /// Output directory (defaults to the input's directory)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
    /// Last stage to run
    #[arg(long, value_enum, default_value_t = Emit::Asm)]
    pub emit: Emit,
    /// JSON config file (defaults to jackc.json next to the sources)
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Print progress
    #[arg(short, long)]
    pub verbose: bool,
}
