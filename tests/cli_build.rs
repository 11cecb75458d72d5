use std::fs;
use std::path::{Path, PathBuf};

use jackc::build;
use jackc::cli::Cli;
use jackc::model::Emit;

fn project(name: &str, files: &[(&str, &str)]) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("jackc-build-{name}"));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    for (file, text) in files {
        fs::write(dir.join(file), text).unwrap();
    }
    dir
}

fn cli(input: &Path, output: Option<PathBuf>, emit: Emit) -> Cli {
    Cli {
        input: input.to_path_buf(),
        output,
        emit,
        config: None,
        verbose: false,
    }
}

const MAIN: &str = "class Main { function void main() { return; } }";
const SYS: &str = "function Sys.init 0\ncall Main.main 0\nlabel HALT\ngoto HALT\n";

#[test]
fn directory_build_writes_every_stage() {
    let dir = project("ok", &[("Main.jack", MAIN), ("Sys.vm", SYS)]);
    let out = dir.join("out");

    build(&cli(&dir, Some(out.clone()), Emit::Hack)).unwrap();

    assert_eq!(
        fs::read_to_string(out.join("Main.vm")).unwrap(),
        "function Main.main 0\npush constant 0\nreturn\npush constant 0\nreturn\n"
    );
    assert!(!out.join("Sys.vm").exists());

    let asm = fs::read_to_string(out.join("jackc-build-ok.asm")).unwrap();
    assert!(asm.starts_with("// bootstrap\n@256\n"));
    assert!(asm.contains("// call Main.main 0"));

    let hack = fs::read_to_string(out.join("jackc-build-ok.hack")).unwrap();
    assert!(hack.lines().all(|l| l.len() == 16 && l.chars().all(|c| c == '0' || c == '1')));
}

#[test]
fn single_file_defaults_to_its_directory() {
    let dir = project("single", &[("Main.jack", MAIN)]);

    build(&cli(&dir.join("Main.jack"), None, Emit::Asm)).unwrap();

    assert!(dir.join("Main.vm").exists());
    let asm = fs::read_to_string(dir.join("Main.asm")).unwrap();
    // no bootstrap outside directory mode
    assert!(asm.starts_with("// function Main.main 0\n"));
}

#[test]
fn failed_unit_blocks_program_artifacts() {
    let dir = project(
        "fail",
        &[
            ("Bad.jack", "class Bad { function void f() { let y = 1; return; } }"),
            ("Main.jack", MAIN),
        ],
    );

    let err = build(&cli(&dir, None, Emit::Hack)).unwrap_err();

    assert_eq!(err.to_string(), "1 of 2 units failed");
    assert!(dir.join("Main.vm").exists());
    assert!(!dir.join("Bad.vm").exists());
    assert!(!dir.join("jackc-build-fail.asm").exists());
    assert!(!dir.join("jackc-build-fail.hack").exists());
}

#[test]
fn rebuild_in_place_ignores_previous_vm_output() {
    let dir = project("rebuild", &[("Main.jack", MAIN), ("Sys.vm", SYS)]);

    build(&cli(&dir, None, Emit::Hack)).unwrap();
    assert!(dir.join("Main.vm").exists());
    let first = fs::read_to_string(dir.join("jackc-build-rebuild.hack")).unwrap();

    build(&cli(&dir, None, Emit::Hack)).unwrap();
    let second = fs::read_to_string(dir.join("jackc-build-rebuild.hack")).unwrap();
    assert_eq!(first, second);

    let asm = fs::read_to_string(dir.join("jackc-build-rebuild.asm")).unwrap();
    assert_eq!(asm.matches("(Main.main)").count(), 1);
}
