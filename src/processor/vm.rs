//! Stack-machine instruction set shared by the compiler and the translator.
//!
//! The textual form (`push constant 7`, `call Math.multiply 2`, …) is the
//! boundary between the two stages, so it both renders and parses here.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use crate::config::Runtime;
use crate::error::{CompileError, CompileResult, UnsupportedInstructionSnafu};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Segment {
    Constant,
    Argument,
    Local,
    Static,
    This,
    That,
    Pointer,
    Temp,
}

impl Segment {
    pub fn as_text(self) -> &'static str {
        match self {
            Segment::Constant => "constant",
            Segment::Argument => "argument",
            Segment::Local => "local",
            Segment::Static => "static",
            Segment::This => "this",
            Segment::That => "that",
            Segment::Pointer => "pointer",
            Segment::Temp => "temp",
        }
    }

    pub fn from_text(text: &str) -> Option<Self> {
        let seg = match text {
            "constant" => Segment::Constant,
            "argument" => Segment::Argument,
            "local" => Segment::Local,
            "static" => Segment::Static,
            "this" => Segment::This,
            "that" => Segment::That,
            "pointer" => Segment::Pointer,
            "temp" => Segment::Temp,
            _ => return None,
        };
        Some(seg)
    }
}

impl Display for Segment {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_text())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArithmeticOp {
    Add,
    Sub,
    Neg,
    Eq,
    Gt,
    Lt,
    And,
    Or,
    Not,
}

impl ArithmeticOp {
    pub fn as_text(self) -> &'static str {
        match self {
            ArithmeticOp::Add => "add",
            ArithmeticOp::Sub => "sub",
            ArithmeticOp::Neg => "neg",
            ArithmeticOp::Eq => "eq",
            ArithmeticOp::Gt => "gt",
            ArithmeticOp::Lt => "lt",
            ArithmeticOp::And => "and",
            ArithmeticOp::Or => "or",
            ArithmeticOp::Not => "not",
        }
    }

    pub fn from_text(text: &str) -> Option<Self> {
        let op = match text {
            "add" => ArithmeticOp::Add,
            "sub" => ArithmeticOp::Sub,
            "neg" => ArithmeticOp::Neg,
            "eq" => ArithmeticOp::Eq,
            "gt" => ArithmeticOp::Gt,
            "lt" => ArithmeticOp::Lt,
            "and" => ArithmeticOp::And,
            "or" => ArithmeticOp::Or,
            "not" => ArithmeticOp::Not,
            _ => return None,
        };
        Some(op)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instruction {
    Push(Segment, u16),
    Pop(Segment, u16),
    Arithmetic(ArithmeticOp),
    Label(String),
    Goto(String),
    IfGoto(String),
    Call(String, u16),
    Function(String, u16),
    Return,
}

impl Display for Instruction {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Instruction::Push(seg, i) => write!(f, "push {seg} {i}"),
            Instruction::Pop(seg, i) => write!(f, "pop {seg} {i}"),
            Instruction::Arithmetic(op) => f.write_str(op.as_text()),
            Instruction::Label(name) => write!(f, "label {name}"),
            Instruction::Goto(name) => write!(f, "goto {name}"),
            Instruction::IfGoto(name) => write!(f, "if-goto {name}"),
            Instruction::Call(name, argc) => write!(f, "call {name} {argc}"),
            Instruction::Function(name, localc) => write!(f, "function {name} {localc}"),
            Instruction::Return => f.write_str("return"),
        }
    }
}

impl FromStr for Instruction {
    type Err = CompileError;

    /// Parses one instruction. Reported line numbers are 0; `parse_program`
    /// fills in the real line.
    fn from_str(line: &str) -> CompileResult<Self> {
        let unsupported = || {
            UnsupportedInstructionSnafu {
                line: 0usize,
                text: line.trim(),
            }
            .build()
        };
        let number = |s: &str| s.parse::<u16>().map_err(|_| unsupported());

        let parts: Vec<&str> = line.split_whitespace().collect();
        let ins = match parts.as_slice() {
            [op] if *op == "return" => Instruction::Return,
            [op] => Instruction::Arithmetic(ArithmeticOp::from_text(op).ok_or_else(unsupported)?),
            ["push", seg, i] => Instruction::Push(
                Segment::from_text(seg).ok_or_else(unsupported)?,
                number(*i)?,
            ),
            ["pop", seg, i] => Instruction::Pop(
                Segment::from_text(seg).ok_or_else(unsupported)?,
                number(*i)?,
            ),
            ["label", name] => Instruction::Label(name.to_string()),
            ["goto", name] => Instruction::Goto(name.to_string()),
            ["if-goto", name] => Instruction::IfGoto(name.to_string()),
            ["call", name, n] => Instruction::Call(name.to_string(), number(*n)?),
            ["function", name, n] => Instruction::Function(name.to_string(), number(*n)?),
            _ => return Err(unsupported()),
        };
        Ok(ins)
    }
}

/// Parses a whole `.vm` text, skipping blank lines and `//` comments.
pub fn parse_program(src: &str) -> CompileResult<Vec<Instruction>> {
    let mut code = Vec::new();
    for (i, raw) in src.lines().enumerate() {
        let line = match raw.find("//") {
            Some(pos) => &raw[..pos],
            None => raw,
        }
        .trim();
        if line.is_empty() {
            continue;
        }
        let ins = line.parse::<Instruction>().map_err(|e| match e {
            CompileError::UnsupportedInstruction { text, .. } => {
                CompileError::UnsupportedInstruction { line: i + 1, text }
            }
            other => other,
        })?;
        code.push(ins);
    }
    Ok(code)
}

/// Renders instructions in the textual form, one per line.
pub fn render(code: &[Instruction]) -> String {
    let mut out = String::new();
    for ins in code {
        out.push_str(&ins.to_string());
        out.push('\n');
    }
    out
}

/// Output sink of the code generator. Knows the runtime library names the
/// generated code calls into.
#[derive(Debug, Clone)]
pub struct VmWriter {
    code: Vec<Instruction>,
    runtime: Runtime,
}

impl VmWriter {
    pub fn new(runtime: Runtime) -> Self {
        Self {
            code: Vec::new(),
            runtime,
        }
    }

    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    pub fn write_push(&mut self, segment: Segment, index: u16) {
        self.code.push(Instruction::Push(segment, index));
    }

    pub fn write_pop(&mut self, segment: Segment, index: u16) {
        self.code.push(Instruction::Pop(segment, index));
    }

    pub fn write_arithmetic(&mut self, op: ArithmeticOp) {
        self.code.push(Instruction::Arithmetic(op));
    }

    pub fn write_label(&mut self, label: impl Into<String>) {
        self.code.push(Instruction::Label(label.into()));
    }

    pub fn write_goto(&mut self, label: impl Into<String>) {
        self.code.push(Instruction::Goto(label.into()));
    }

    pub fn write_if(&mut self, label: impl Into<String>) {
        self.code.push(Instruction::IfGoto(label.into()));
    }

    pub fn write_call(&mut self, name: impl Into<String>, argc: u16) {
        self.code.push(Instruction::Call(name.into(), argc));
    }

    pub fn write_function(&mut self, name: impl Into<String>, localc: u16) {
        self.code.push(Instruction::Function(name.into(), localc));
    }

    pub fn write_return(&mut self) {
        self.code.push(Instruction::Return);
    }

    pub fn code(&self) -> &[Instruction] {
        &self.code
    }

    pub fn into_code(self) -> Vec<Instruction> {
        self.code
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_textual_form() {
        let test_cases = vec![
            (Instruction::Push(Segment::Constant, 7), "push constant 7"),
            (Instruction::Pop(Segment::Pointer, 1), "pop pointer 1"),
            (Instruction::Arithmetic(ArithmeticOp::Not), "not"),
            (Instruction::Call("Math.multiply".into(), 2), "call Math.multiply 2"),
            (Instruction::Function("Foo.bar".into(), 1), "function Foo.bar 1"),
            (Instruction::IfGoto("IF_TRUE0".into()), "if-goto IF_TRUE0"),
            (Instruction::Return, "return"),
        ];

        for (ins, text) in test_cases {
            assert_eq!(ins.to_string(), text);
            assert_eq!(text.parse::<Instruction>(), Ok(ins));
        }
    }

    #[test]
    fn test_parse_program_skips_comments() {
        let src = "// Sys.vm\nfunction Sys.init 0\n\n   push constant 3   // three\nreturn\n";
        assert_eq!(
            parse_program(src),
            Ok(vec![
                Instruction::Function("Sys.init".into(), 0),
                Instruction::Push(Segment::Constant, 3),
                Instruction::Return,
            ])
        );
    }

    #[test]
    fn test_unsupported_instructions() {
        let test_cases = vec![
            ("push constant 1\nmul\n", 2, "mul"),
            ("push heap 0", 1, "push heap 0"),
            ("\npop local x", 2, "pop local x"),
            ("call Foo.bar", 1, "call Foo.bar"),
        ];

        for (src, line, text) in test_cases {
            assert_eq!(
                parse_program(src),
                Err(CompileError::UnsupportedInstruction {
                    line,
                    text: text.into()
                }),
                "source: {src:?}"
            );
        }
    }

    #[test]
    fn test_writer_collects_in_order() {
        let mut out = VmWriter::new(Runtime::default());
        out.write_function("Main.main", 0);
        out.write_push(Segment::Constant, 0);
        out.write_return();
        assert_eq!(
            render(out.code()),
            "function Main.main 0\npush constant 0\nreturn\n"
        );
    }
}
