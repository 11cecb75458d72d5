use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};

use crate::model::{RawProgram, SourceKind, SourceUnit};

/// Read the input path into `RawProgram`.
///
/// A file must end in `.jack` or `.vm`. A directory contributes the files
/// picked by [`discover`]; other entries are ignored. An empty selection is
/// an error.
pub fn load(input: &Path, verbose: bool) -> Result<RawProgram> {
    let metadata =
        fs::metadata(input).with_context(|| format!("Reading {}", input.display()))?;

    let (name, source_dir, paths) = if metadata.is_dir() {
        let name = program_name(input, true)?;
        let paths = discover(input)?;
        if verbose {
            println!("Found {} source files in {}", paths.len(), input.display());
        }
        (name, input.to_path_buf(), paths)
    } else {
        if SourceKind::from_path(input).is_none() {
            return Err(anyhow!(
                "{} is neither a .jack nor a .vm file",
                input.display()
            ));
        }
        let dir = match input.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        (program_name(input, false)?, dir, vec![input.to_path_buf()])
    };

    if paths.is_empty() {
        return Err(anyhow!("no .jack or .vm files in {}", input.display()));
    }

    let mut units = Vec::with_capacity(paths.len());
    for path in paths {
        let text =
            fs::read_to_string(&path).with_context(|| format!("Reading {}", path.display()))?;
        if verbose {
            println!("Loaded {}, size: {} bytes", path.display(), text.len());
        }
        let unit = SourceUnit::new(&path, text)
            .ok_or_else(|| anyhow!("{} has no usable file name", path.display()))?;
        units.push(unit);
    }

    Ok(RawProgram {
        name,
        source_dir,
        directory_mode: metadata.is_dir(),
        units,
    })
}

/// `.jack` and `.vm` files directly inside `dir`, sorted by path.
///
/// `X.vm` next to `X.jack` is the compiled form of that class from an
/// earlier build and is skipped.
pub fn discover(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("Listing {}", dir.display()))? {
        let path = entry?.path();
        match SourceKind::from_path(&path) {
            Some(_) if !path.is_file() => {}
            Some(SourceKind::Vm) if path.with_extension("jack").is_file() => {}
            Some(_) => paths.push(path),
            None => {}
        }
    }
    paths.sort();
    Ok(paths)
}

/// Directory name, or file stem for a single file.
fn program_name(path: &Path, is_dir: bool) -> Result<String> {
    // `foo/.` and `.` have no name of their own
    let path = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
    let name = if is_dir {
        path.file_name()
    } else {
        path.file_stem()
    };
    name.and_then(|s| s.to_str())
        .map(str::to_string)
        .ok_or_else(|| anyhow!("cannot name a program after {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(name: &str, files: &[&str]) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("jackc-parser-{name}"));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        for file in files {
            fs::write(dir.join(file), "").unwrap();
        }
        dir
    }

    #[test]
    fn test_discover_filters_and_sorts() {
        let dir = scratch_dir(
            "discover",
            &["b.vm", "Main.jack", "Main.vm", "notes.txt", "a.jack"],
        );
        fs::create_dir_all(dir.join("nested.jack")).unwrap();

        let names: Vec<String> = discover(&dir)
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["Main.jack", "a.jack", "b.vm"]);
    }

    #[test]
    fn test_load_modes() {
        let dir = scratch_dir("modes", &["Main.jack", "Sys.vm"]);

        let program = load(&dir, false).unwrap();
        assert!(program.directory_mode);
        assert_eq!(program.name, "jackc-parser-modes");
        assert_eq!(program.units.len(), 2);
        assert_eq!(program.units[1].kind, SourceKind::Vm);

        let single = load(&dir.join("Main.jack"), false).unwrap();
        assert!(!single.directory_mode);
        assert_eq!(single.name, "Main");
        assert_eq!(single.source_dir, dir);
    }

    #[test]
    fn test_load_rejects() {
        let dir = scratch_dir("rejects", &["readme.md"]);
        let test_cases = vec![dir.clone(), dir.join("readme.md"), dir.join("Missing.jack")];

        for path in test_cases {
            assert!(load(&path, false).is_err(), "accepted {}", path.display());
        }
    }
}
