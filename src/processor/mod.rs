//! The functional core: Jack → VM → assembly → machine words.
pub mod assembler;
pub mod compiler;
pub mod lexer;
pub mod op_stack;
pub mod symbol_table;
pub mod translator;
pub mod vm;

use crate::config::Config;
use crate::model::{CompiledUnit, Emit, ProcessedProgram, RawProgram, SourceKind, UnitFailure};
use anyhow::Result;
use compiler::{Session, compile_source};
use translator::Translator;

/// Runs every processing pass up to `emit` and returns a read-only structure
/// for writers. Unit failures are collected, not returned as `Err`.
pub fn run(
    raw: &RawProgram,
    config: &Config,
    emit: Emit,
    verbose: bool,
) -> Result<ProcessedProgram> {
    let mut session = Session::new(config.runtime.clone());
    let mut units = Vec::with_capacity(raw.units.len());
    let mut failures = Vec::new();

    for unit in &raw.units {
        let compiled = match unit.kind {
            SourceKind::Jack => compile_source(&mut session, &unit.text).map(|class| class.code),
            SourceKind::Vm => vm::parse_program(&unit.text),
        };
        match compiled {
            Ok(code) => {
                if verbose {
                    println!("{}: {} instructions", unit.name, code.len());
                }
                units.push(CompiledUnit {
                    name: unit.name.clone(),
                    kind: unit.kind,
                    code,
                });
            }
            Err(error) => failures.push(UnitFailure {
                name: unit.name.clone(),
                error,
            }),
        }
    }

    let mut processed = ProcessedProgram {
        name: raw.name.clone(),
        units,
        failures,
        asm: None,
        hack: None,
    };
    if emit == Emit::Vm || !processed.succeeded() {
        return Ok(processed);
    }

    let mut translator = Translator::new(config.annotate);
    if config.bootstrap.unwrap_or(raw.directory_mode) {
        translator.bootstrap(config.stack_base, &config.runtime.entry);
    }
    for unit in &processed.units {
        if let Err(error) = translator.translate_unit(&unit.name, &unit.code) {
            processed.failures.push(UnitFailure {
                name: unit.name.clone(),
                error,
            });
        }
    }
    if !processed.succeeded() {
        return Ok(processed);
    }
    if verbose {
        println!("Translated {} assembly lines", translator.lines().len());
    }
    let asm = translator.into_text();

    if emit == Emit::Hack {
        match assembler::assemble(&asm) {
            Ok(assembled) => {
                if verbose {
                    println!("Assembled {} words", assembled.words.len());
                }
                processed.hack = Some(assembled.to_text());
            }
            Err(error) => {
                processed.failures.push(UnitFailure {
                    name: raw.name.clone(),
                    error,
                });
                return Ok(processed);
            }
        }
    }
    processed.asm = Some(asm);
    Ok(processed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CompileError;
    use crate::model::SourceUnit;
    use std::path::PathBuf;

    fn program(files: &[(&str, &str)], directory_mode: bool) -> RawProgram {
        RawProgram {
            name: "Prog".into(),
            source_dir: PathBuf::from("."),
            directory_mode,
            units: files
                .iter()
                .map(|(path, text)| SourceUnit::new(*path, *text).unwrap())
                .collect(),
        }
    }

    #[test]
    fn test_emit_levels() {
        let raw = program(
            &[("Main.jack", "class Main { function void main() { return; } }")],
            false,
        );
        let test_cases = vec![
            (Emit::Vm, false, false),
            (Emit::Asm, true, false),
            (Emit::Hack, true, true),
        ];

        for (emit, has_asm, has_hack) in test_cases {
            let out = run(&raw, &Config::default(), emit, false).unwrap();
            assert!(out.succeeded());
            assert_eq!(out.units.len(), 1);
            assert_eq!(out.asm.is_some(), has_asm, "{emit:?}");
            assert_eq!(out.hack.is_some(), has_hack, "{emit:?}");
        }
    }

    #[test]
    fn test_bootstrap_follows_mode() {
        let src = [("Sys.vm", "function Sys.init 0\nlabel L\ngoto L\n")];
        let test_cases = vec![
            (false, None, false),
            (true, None, true),
            (true, Some(false), false),
            (false, Some(true), true),
        ];

        for (directory_mode, bootstrap, expected) in test_cases {
            let config = Config {
                bootstrap,
                annotate: false,
                ..Config::default()
            };
            let out = run(&program(&src, directory_mode), &config, Emit::Asm, false).unwrap();
            let asm = out.asm.unwrap();
            assert_eq!(asm.starts_with("@256\n"), expected, "{directory_mode} {bootstrap:?}");
        }
    }

    #[test]
    fn test_failures_keep_healthy_units() {
        let raw = program(
            &[
                ("Bad.jack", "class Bad { function void f() { let = 1; } }"),
                ("Good.jack", "class Good { function void f() { return; } }"),
                ("Odd.vm", "pop constant 0\n"),
            ],
            true,
        );
        let out = run(&raw, &Config::default(), Emit::Hack, false).unwrap();

        assert!(!out.succeeded());
        assert_eq!(out.units.len(), 2);
        assert_eq!(out.units[0].name, "Good");
        assert_eq!(out.failures.len(), 1);
        assert_eq!(out.failures[0].name, "Bad");
        assert!(matches!(out.failures[0].error, CompileError::Syntax { .. }));
        assert!(out.asm.is_none());
        assert!(out.hack.is_none());
    }

    #[test]
    fn test_translation_failure_blocks_assembly() {
        let raw = program(&[("Odd.vm", "push constant 1\npop constant 0\n")], false);
        let out = run(&raw, &Config::default(), Emit::Asm, false).unwrap();
        assert_eq!(out.units.len(), 1);
        assert_eq!(
            out.failures[0].error,
            CompileError::UnsupportedInstruction {
                line: 2,
                text: "pop constant 0".into()
            }
        );
        assert!(out.asm.is_none());
    }
}
