//! One `<Unit>.vm` file per compiled Jack class.

use crate::model::{ProcessedProgram, SourceKind};
use crate::processor::vm::render;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

pub fn emit(program: &ProcessedProgram, out_dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut written = Vec::new();
    // `.vm` inputs are already on disk
    for unit in program.units.iter().filter(|u| u.kind == SourceKind::Jack) {
        let path = out_dir.join(format!("{}.vm", unit.name));
        fs::write(&path, render(&unit.code))?;
        written.push(path);
    }
    Ok(written)
}
