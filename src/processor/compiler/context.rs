//! Compilation state threaded through every recursive-descent call.

use crate::config::Runtime;
use crate::error::{CompileError, CompileResult, SyntaxSnafu, UndefinedSymbolSnafu};
use crate::processor::lexer::{Keyword, Spanned, Token};
use crate::processor::symbol_table::SymbolTable;
use crate::processor::vm::{Segment, VmWriter};

/// Program-wide state that outlives a single class. The `if`/`while` label
/// counter lives here so that labels never repeat across compiled files.
#[derive(Debug, Clone)]
pub struct Session {
    runtime: Runtime,
    labels: usize,
}

impl Session {
    pub fn new(runtime: Runtime) -> Self {
        Self { runtime, labels: 0 }
    }

    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    pub(crate) fn next_label(&mut self) -> usize {
        let i = self.labels;
        self.labels += 1;
        i
    }
}

/// Read position in a unit's token list. Peeking never consumes.
#[derive(Debug, Clone, Copy)]
pub struct Cursor<'a> {
    tokens: &'a [Spanned],
    pos: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(tokens: &'a [Spanned]) -> Self {
        Self { tokens, pos: 0 }
    }

    pub fn peek(&self) -> Option<&'a Token> {
        self.peek_nth(0)
    }

    pub fn peek_nth(&self, n: usize) -> Option<&'a Token> {
        self.tokens.get(self.pos + n).map(|s| &s.token)
    }

    pub fn advance(&mut self) -> Option<&'a Token> {
        let tok = self.peek();
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    /// Line of the current token, or of the last one at end of input.
    pub fn line(&self) -> usize {
        self.tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .map_or(0, |s| s.line)
    }

    pub fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }
}

pub struct Context<'a> {
    pub cursor: Cursor<'a>,
    pub symbols: SymbolTable,
    pub out: VmWriter,
    pub class_name: String,
    pub session: &'a mut Session,
}

impl<'a> Context<'a> {
    pub fn new(tokens: &'a [Spanned], session: &'a mut Session) -> Self {
        let out = VmWriter::new(session.runtime().clone());
        Self {
            cursor: Cursor::new(tokens),
            symbols: SymbolTable::new(),
            out,
            class_name: String::new(),
            session,
        }
    }

    // ── Matching ──────────────────────────────────────────────────────

    pub fn peek_symbol(&self, c: char) -> bool {
        self.cursor.peek() == Some(&Token::Symbol(c))
    }

    pub fn peek_keyword(&self, kw: Keyword) -> bool {
        self.cursor.peek() == Some(&Token::Keyword(kw))
    }

    /// Consumes `c` when it is next. Absence is not an error.
    pub fn eat_symbol(&mut self, c: char) -> bool {
        let hit = self.peek_symbol(c);
        if hit {
            self.cursor.advance();
        }
        hit
    }

    pub fn eat_keyword(&mut self, kw: Keyword) -> bool {
        let hit = self.peek_keyword(kw);
        if hit {
            self.cursor.advance();
        }
        hit
    }

    pub fn expect_symbol(&mut self, c: char) -> CompileResult<()> {
        if self.eat_symbol(c) {
            Ok(())
        } else {
            Err(self.syntax_error(format!("`{c}`")))
        }
    }

    pub fn expect_keyword(&mut self, kw: Keyword) -> CompileResult<()> {
        if self.eat_keyword(kw) {
            Ok(())
        } else {
            Err(self.syntax_error(format!("`{kw}`")))
        }
    }

    pub fn expect_identifier(&mut self) -> CompileResult<String> {
        match self.cursor.peek() {
            Some(Token::Identifier(name)) => {
                self.cursor.advance();
                Ok(name.clone())
            }
            _ => Err(self.syntax_error("identifier")),
        }
    }

    /// `int | char | boolean | ClassName`, plus `void` for return types.
    pub fn expect_type(&mut self, allow_void: bool) -> CompileResult<String> {
        let ty = match self.cursor.peek() {
            Some(Token::Identifier(name)) => name.clone(),
            Some(Token::Keyword(kw @ (Keyword::Int | Keyword::Char | Keyword::Boolean))) => {
                kw.as_text().to_string()
            }
            Some(Token::Keyword(Keyword::Void)) if allow_void => "void".to_string(),
            _ => return Err(self.syntax_error("type")),
        };
        self.cursor.advance();
        Ok(ty)
    }

    pub fn syntax_error(&self, expected: impl Into<String>) -> CompileError {
        let found = match self.cursor.peek() {
            Some(tok) => tok.to_string(),
            None => "end of input".to_string(),
        };
        SyntaxSnafu {
            line: self.cursor.line(),
            expected,
            found,
        }
        .build()
    }

    // ── Variables ─────────────────────────────────────────────────────

    fn locate(&self, name: &str) -> CompileResult<(Segment, u16)> {
        match self.symbols.lookup(name) {
            Some(entry) => Ok((entry.kind.segment(), entry.index)),
            None => UndefinedSymbolSnafu { name }.fail(),
        }
    }

    pub fn push_variable(&mut self, name: &str) -> CompileResult<()> {
        let (segment, index) = self.locate(name)?;
        self.out.write_push(segment, index);
        Ok(())
    }

    pub fn pop_variable(&mut self, name: &str) -> CompileResult<()> {
        let (segment, index) = self.locate(name)?;
        self.out.write_pop(segment, index);
        Ok(())
    }
}
