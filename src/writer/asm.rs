//! Whole-program artifacts: `<Program>.asm` and `<Program>.hack`.

use crate::model::ProcessedProgram;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

pub fn emit(program: &ProcessedProgram, out_dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut written = Vec::new();
    // a failed unit poisons the whole program
    if !program.succeeded() {
        return Ok(written);
    }
    for (ext, text) in [("asm", &program.asm), ("hack", &program.hack)] {
        if let Some(text) = text {
            let path = out_dir.join(format!("{}.{ext}", program.name));
            fs::write(&path, text)?;
            written.push(path);
        }
    }
    Ok(written)
}
