//! Lowers stack-machine instructions to Hack assembly.
//!
//! Register use:
//!   SP LCL ARG THIS THAT   R0..R4, the VM pointers
//!   temp 0..7              R5..R12
//!   R13                    target address of an indirect `pop`
//!   R14                    frame pointer during `return`
//!   R15                    return address during `return`
//!
//! Branch and return-address labels are numbered program-wide, so any number
//! of units can be translated into one output without collisions. `static`
//! cells are named after the unit that declares them.

use crate::error::{CompileError, CompileResult, UnsupportedInstructionSnafu};
use crate::processor::lexer::MAX_INT;
use crate::processor::vm::{ArithmeticOp, Instruction, Segment};

const TEMP_BASE: u16 = 5;
const TEMP_SIZE: u16 = 8;
/// return address + LCL ARG THIS THAT
const FRAME_SIZE: u16 = 5;

#[derive(Debug, Clone, Default)]
pub struct Translator {
    lines: Vec<String>,
    annotate: bool,
    branches: usize,
    returns: usize,
    /// Static namespace of the unit being translated.
    unit: String,
    /// Enclosing function, scopes `label`/`goto`/`if-goto`.
    function: String,
}

impl Translator {
    pub fn new(annotate: bool) -> Self {
        Self {
            annotate,
            ..Self::default()
        }
    }

    /// Points SP at `stack_base` and calls `entry` with no arguments.
    pub fn bootstrap(&mut self, stack_base: u16, entry: &str) {
        if self.annotate {
            self.emit("// bootstrap");
        }
        self.emit(format!("@{stack_base}"));
        self.emit("D=A");
        self.emit("@SP");
        self.emit("M=D");
        self.write_call(entry, 0);
    }

    /// Translates one unit. Errors carry the 1-based position of the
    /// offending instruction inside the unit.
    pub fn translate_unit(&mut self, name: &str, code: &[Instruction]) -> CompileResult<()> {
        self.unit = name.to_string();
        self.function.clear();
        for (i, ins) in code.iter().enumerate() {
            self.translate(ins).map_err(|e| match e {
                CompileError::UnsupportedInstruction { text, .. } => {
                    CompileError::UnsupportedInstruction { line: i + 1, text }
                }
                other => other,
            })?;
        }
        Ok(())
    }

    pub fn translate(&mut self, ins: &Instruction) -> CompileResult<()> {
        if self.annotate {
            self.emit(format!("// {ins}"));
        }
        match ins {
            Instruction::Push(seg, i) => self.write_push(*seg, *i, ins)?,
            Instruction::Pop(seg, i) => self.write_pop(*seg, *i, ins)?,
            Instruction::Arithmetic(op) => self.write_arithmetic(*op),
            Instruction::Label(label) => {
                let label = self.scoped(label);
                self.emit(format!("({label})"));
            }
            Instruction::Goto(label) => {
                let label = self.scoped(label);
                self.emit(format!("@{label}"));
                self.emit("0;JMP");
            }
            Instruction::IfGoto(label) => {
                let label = self.scoped(label);
                self.pop_d();
                self.emit(format!("@{label}"));
                self.emit("D;JNE");
            }
            Instruction::Function(name, localc) => {
                self.function = name.clone();
                self.emit(format!("({name})"));
                for _ in 0..*localc {
                    self.emit("@SP");
                    self.emit("A=M");
                    self.emit("M=0");
                    self.emit("@SP");
                    self.emit("M=M+1");
                }
            }
            Instruction::Call(name, argc) => {
                if argc.checked_add(FRAME_SIZE).is_none_or(|n| n > MAX_INT) {
                    return Err(unsupported(ins));
                }
                self.write_call(name, *argc);
            }
            Instruction::Return => self.write_return(),
        }
        Ok(())
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// The assembly text, one line per instruction or label.
    pub fn into_text(self) -> String {
        let mut out = self.lines.join("\n");
        if !out.is_empty() {
            out.push('\n');
        }
        out
    }

    // ── Segments ──────────────────────────────────────────────────────

    fn write_push(&mut self, seg: Segment, i: u16, ins: &Instruction) -> CompileResult<()> {
        match seg {
            Segment::Constant => {
                if i > MAX_INT {
                    return Err(unsupported(ins));
                }
                self.emit(format!("@{i}"));
                self.emit("D=A");
            }
            Segment::Local | Segment::Argument | Segment::This | Segment::That => {
                self.emit(format!("@{i}"));
                self.emit("D=A");
                self.emit(format!("@{}", base_register(seg)));
                self.emit("A=D+M");
                self.emit("D=M");
            }
            Segment::Pointer | Segment::Temp | Segment::Static => {
                let addr = self.direct_address(seg, i, ins)?;
                self.emit(format!("@{addr}"));
                self.emit("D=M");
            }
        }
        self.push_d();
        Ok(())
    }

    fn write_pop(&mut self, seg: Segment, i: u16, ins: &Instruction) -> CompileResult<()> {
        match seg {
            Segment::Constant => return Err(unsupported(ins)),
            Segment::Local | Segment::Argument | Segment::This | Segment::That => {
                self.emit(format!("@{i}"));
                self.emit("D=A");
                self.emit(format!("@{}", base_register(seg)));
                self.emit("D=D+M");
                self.emit("@R13");
                self.emit("M=D");
                self.pop_d();
                self.emit("@R13");
                self.emit("A=M");
                self.emit("M=D");
            }
            Segment::Pointer | Segment::Temp | Segment::Static => {
                let addr = self.direct_address(seg, i, ins)?;
                self.pop_d();
                self.emit(format!("@{addr}"));
                self.emit("M=D");
            }
        }
        Ok(())
    }

    fn direct_address(&self, seg: Segment, i: u16, ins: &Instruction) -> CompileResult<String> {
        let addr = match seg {
            Segment::Pointer if i == 0 => "THIS".to_string(),
            Segment::Pointer if i == 1 => "THAT".to_string(),
            Segment::Temp if i < TEMP_SIZE => format!("R{}", TEMP_BASE + i),
            Segment::Static => format!("{}.{i}", self.unit),
            _ => return Err(unsupported(ins)),
        };
        Ok(addr)
    }

    // ── Arithmetic ────────────────────────────────────────────────────

    fn write_arithmetic(&mut self, op: ArithmeticOp) {
        match op {
            ArithmeticOp::Add => self.binary("M=D+M"),
            ArithmeticOp::Sub => self.binary("M=M-D"),
            ArithmeticOp::And => self.binary("M=D&M"),
            ArithmeticOp::Or => self.binary("M=D|M"),
            ArithmeticOp::Neg => self.unary("M=-M"),
            ArithmeticOp::Not => self.unary("M=!M"),
            // each compare jumps away on the opposite outcome
            ArithmeticOp::Eq => self.compare("JNE"),
            ArithmeticOp::Gt => self.compare("JLE"),
            ArithmeticOp::Lt => self.compare("JGE"),
        }
    }

    /// y in D, x addressed by A, result written over x.
    fn binary(&mut self, combine: &str) {
        self.emit("@SP");
        self.emit("AM=M-1");
        self.emit("D=M");
        self.emit("A=A-1");
        self.emit(combine);
    }

    fn unary(&mut self, apply: &str) {
        self.emit("@SP");
        self.emit("A=M-1");
        self.emit(apply);
    }

    fn compare(&mut self, inverse_jump: &str) {
        let n = self.branches;
        self.branches += 1;

        self.emit("@SP");
        self.emit("AM=M-1");
        self.emit("D=M");
        self.emit("A=A-1");
        self.emit("D=M-D");
        self.emit(format!("@CMP_FALSE{n}"));
        self.emit(format!("D;{inverse_jump}"));
        self.emit("@SP");
        self.emit("A=M-1");
        self.emit("M=-1");
        self.emit(format!("@CMP_END{n}"));
        self.emit("0;JMP");
        self.emit(format!("(CMP_FALSE{n})"));
        self.emit("@SP");
        self.emit("A=M-1");
        self.emit("M=0");
        self.emit(format!("(CMP_END{n})"));
    }

    // ── Calling convention ────────────────────────────────────────────

    fn write_call(&mut self, name: &str, argc: u16) {
        let ret = format!("RET_ADDRESS{}", self.returns);
        self.returns += 1;

        self.emit(format!("@{ret}"));
        self.emit("D=A");
        self.push_d();
        for saved in ["LCL", "ARG", "THIS", "THAT"] {
            self.emit(format!("@{saved}"));
            self.emit("D=M");
            self.push_d();
        }

        // ARG = SP - 5 - argc
        self.emit("@SP");
        self.emit("D=M");
        self.emit(format!("@{}", FRAME_SIZE + argc));
        self.emit("D=D-A");
        self.emit("@ARG");
        self.emit("M=D");
        // LCL = SP
        self.emit("@SP");
        self.emit("D=M");
        self.emit("@LCL");
        self.emit("M=D");

        self.emit(format!("@{name}"));
        self.emit("0;JMP");
        self.emit(format!("({ret})"));
    }

    fn write_return(&mut self) {
        // R14 = frame, R15 = *(frame - 5)
        self.emit("@LCL");
        self.emit("D=M");
        self.emit("@R14");
        self.emit("M=D");
        self.emit(format!("@{FRAME_SIZE}"));
        self.emit("A=D-A");
        self.emit("D=M");
        self.emit("@R15");
        self.emit("M=D");

        // *ARG = pop(), SP = ARG + 1
        self.pop_d();
        self.emit("@ARG");
        self.emit("A=M");
        self.emit("M=D");
        self.emit("@ARG");
        self.emit("D=M+1");
        self.emit("@SP");
        self.emit("M=D");

        // ARG and LCL last: LCL is the frame we are reading from
        for restored in ["THAT", "THIS", "ARG", "LCL"] {
            self.emit("@R14");
            self.emit("AM=M-1");
            self.emit("D=M");
            self.emit(format!("@{restored}"));
            self.emit("M=D");
        }

        self.emit("@R15");
        self.emit("A=M");
        self.emit("0;JMP");
    }

    // ── Helpers ───────────────────────────────────────────────────────

    fn push_d(&mut self) {
        self.emit("@SP");
        self.emit("A=M");
        self.emit("M=D");
        self.emit("@SP");
        self.emit("M=M+1");
    }

    fn pop_d(&mut self) {
        self.emit("@SP");
        self.emit("AM=M-1");
        self.emit("D=M");
    }

    fn scoped(&self, label: &str) -> String {
        let scope = if self.function.is_empty() {
            &self.unit
        } else {
            &self.function
        };
        format!("{scope}${label}")
    }

    fn emit(&mut self, line: impl Into<String>) {
        self.lines.push(line.into());
    }
}

fn base_register(seg: Segment) -> &'static str {
    match seg {
        Segment::Local => "LCL",
        Segment::Argument => "ARG",
        Segment::This => "THIS",
        _ => "THAT",
    }
}

fn unsupported(ins: &Instruction) -> CompileError {
    UnsupportedInstructionSnafu {
        line: 0usize,
        text: ins.to_string(),
    }
    .build()
}
