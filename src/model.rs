use std::path::{Path, PathBuf};

use clap::ValueEnum;

use crate::error::CompileError;
use crate::processor::vm::Instruction;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Jack,
    Vm,
}

impl SourceKind {
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()? {
            "jack" => Some(SourceKind::Jack),
            "vm" => Some(SourceKind::Vm),
            _ => None,
        }
    }
}

/// One input file. `name` is the file stem; it names the output `.vm` file
/// and the unit's `static` namespace.
#[derive(Debug, Clone)]
pub struct SourceUnit {
    pub name: String,
    pub path: PathBuf,
    pub kind: SourceKind,
    pub text: String,
}

impl SourceUnit {
    /// `None` unless the path ends in `.jack` or `.vm`.
    pub fn new(path: impl Into<PathBuf>, text: impl Into<String>) -> Option<Self> {
        let path = path.into();
        let kind = SourceKind::from_path(&path)?;
        let name = path.file_stem()?.to_str()?.to_string();
        Some(Self {
            name,
            path,
            kind,
            text: text.into(),
        })
    }
}

/// Everything the loader read, before any compilation.
#[derive(Debug, Clone)]
pub struct RawProgram {
    /// Directory name in directory mode, file stem otherwise.
    pub name: String,
    pub source_dir: PathBuf,
    pub directory_mode: bool,
    pub units: Vec<SourceUnit>,
}

/// Last stage to run. Each stage writes its own artifacts plus those of
/// the stages before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
pub enum Emit {
    Vm,
    Asm,
    Hack,
}

#[derive(Debug, Clone)]
pub struct CompiledUnit {
    pub name: String,
    pub kind: SourceKind,
    pub code: Vec<Instruction>,
}

#[derive(Debug, Clone)]
pub struct UnitFailure {
    pub name: String,
    pub error: CompileError,
}

/// Fully processed output handed to `writer`.
#[derive(Debug, Clone)]
pub struct ProcessedProgram {
    pub name: String,
    /// Units that compiled; still written when others failed.
    pub units: Vec<CompiledUnit>,
    pub failures: Vec<UnitFailure>,
    /// Present only when every unit made it through translation.
    pub asm: Option<String>,
    pub hack: Option<String>,
}

impl ProcessedProgram {
    pub fn succeeded(&self) -> bool {
        self.failures.is_empty()
    }
}
