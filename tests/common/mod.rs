//! Hack CPU emulator and pipeline helpers shared by the integration tests.
#![allow(dead_code)]

use std::path::PathBuf;

use jackc::config::Config;
use jackc::model::{Emit, ProcessedProgram, RawProgram, SourceUnit};
use jackc::processor::{self, assembler};

pub const RAM_SIZE: usize = 32768;

pub struct Cpu {
    pub ram: Vec<i16>,
    pub rom: Vec<u16>,
    pub a: i16,
    pub d: i16,
    pub pc: u16,
}

impl Cpu {
    pub fn new(rom: Vec<u16>) -> Self {
        Self {
            ram: vec![0; RAM_SIZE],
            rom,
            a: 0,
            d: 0,
            pc: 0,
        }
    }

    fn addr(&self) -> usize {
        (self.a as u16 as usize) % RAM_SIZE
    }

    pub fn step(&mut self) {
        let ins = self.rom[self.pc as usize];
        if ins & 0x8000 == 0 {
            self.a = ins as i16;
            self.pc += 1;
            return;
        }

        let bit = |n: u16| ins >> n & 1 == 1;
        let x = self.d;
        let y = if bit(12) { self.ram[self.addr()] } else { self.a };

        // zx nx zy ny f no
        let mut x = if bit(11) { 0 } else { x };
        if bit(10) {
            x = !x;
        }
        let mut y = if bit(9) { 0 } else { y };
        if bit(8) {
            y = !y;
        }
        let mut out = if bit(7) { x.wrapping_add(y) } else { x & y };
        if bit(6) {
            out = !out;
        }

        let target = self.a as u16;
        // M is written through the A value from before this instruction
        if bit(3) {
            let addr = self.addr();
            self.ram[addr] = out;
        }
        if bit(4) {
            self.d = out;
        }
        if bit(5) {
            self.a = out;
        }

        let jump = (bit(2) && out < 0) || (bit(1) && out == 0) || (bit(0) && out > 0);
        self.pc = if jump { target } else { self.pc + 1 };
    }

    /// Steps until the program counter reaches `pc`. False when the step
    /// budget runs out first.
    pub fn run_until(&mut self, pc: u16, max_steps: usize) -> bool {
        for _ in 0..max_steps {
            if self.pc == pc {
                return true;
            }
            self.step();
        }
        self.pc == pc
    }

    pub fn sp(&self) -> i16 {
        self.ram[0]
    }
}

/// Compiles `files` as one directory-mode program up to assembly.
pub fn compile(files: &[(&str, &str)]) -> ProcessedProgram {
    let raw = RawProgram {
        name: "Test".into(),
        source_dir: PathBuf::from("."),
        directory_mode: true,
        units: files
            .iter()
            .map(|(path, text)| SourceUnit::new(*path, *text).unwrap())
            .collect(),
    };
    processor::run(&raw, &Config::default(), Emit::Hack, false).unwrap()
}

/// Assembles `files`, runs from the bootstrap until `halt` is reached.
pub fn run_to(files: &[(&str, &str)], halt: &str) -> (Cpu, assembler::Assembled) {
    let program = compile(files);
    if let Some(failure) = program.failures.first() {
        panic!("{}: {}", failure.name, failure.error);
    }
    let assembled = assembler::assemble(program.asm.as_deref().unwrap()).unwrap();
    let mut cpu = Cpu::new(assembled.words.clone());
    let halt_pc = assembled.symbols[halt];
    assert!(cpu.run_until(halt_pc, 100_000), "never reached {halt}");
    (cpu, assembled)
}
