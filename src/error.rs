//! Typed failures raised by the compilation passes.
//!
//! Everything below the driver speaks `CompileError`; the driver wraps it
//! in `anyhow` with the name of the unit that failed.

use snafu::Snafu;

pub type CompileResult<T> = Result<T, CompileError>;

#[derive(Debug, Clone, PartialEq, Eq, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum CompileError {
    #[snafu(display("line {line}: {message}"))]
    Lex { line: usize, message: String },

    /// A mandatory grammar position did not hold the expected token.
    #[snafu(display("line {line}: expected {expected}, found {found}"))]
    Syntax {
        line: usize,
        expected: String,
        found: String,
    },

    #[snafu(display("undefined symbol `{name}`"))]
    UndefinedSymbol { name: String },

    #[snafu(display("line {line}: unsupported instruction `{text}`"))]
    UnsupportedInstruction { line: usize, text: String },

    #[snafu(display("line {line}: {message}"))]
    Assembly { line: usize, message: String },
}
