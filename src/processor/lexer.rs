//! Hand-written scanner for Jack source text.
//!
//! The scanner only classifies lexemes; it knows nothing about the grammar.
//! Comments and whitespace are dropped, string literals lose their quotes.
//
//  Lexical items:
//
//      Keyword  ::= class | constructor | function | method | field | static
//                 | var | int | char | boolean | void | true | false | null
//                 | this | let | do | if | else | while | return
//      Symbol   ::= { } ( ) [ ] . , ; + - * / & | < > = ~
//      Integer  ::= [0-9]+            (0‥32767)
//      String   ::= '"' [^"\n]* '"'
//      Ident    ::= [A-Za-z_][A-Za-z0-9_]*
//      Comments ::= '//' … EOL | '/*' … '*/'

use std::fmt::{self, Display, Formatter};
use std::iter::Peekable;
use std::str::Chars;

use crate::error::{CompileResult, LexSnafu};

pub const MAX_INT: u16 = 32767;

/// Declares an enum whose variants map one-to-one onto fixed spellings.
macro_rules! spelled_enum {
    ($Name:ident { $($Variant:ident => $text:literal),* $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $Name {
            $($Variant),*
        }

        impl $Name {
            pub fn from_text(text: &str) -> Option<Self> {
                match text {
                    $($text => Some(Self::$Variant),)*
                    _ => None,
                }
            }

            pub fn as_text(self) -> &'static str {
                match self {
                    $(Self::$Variant => $text,)*
                }
            }
        }

        impl Display for $Name {
            fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_text())
            }
        }
    };
}

spelled_enum!(Keyword {
    Class => "class",
    Constructor => "constructor",
    Function => "function",
    Method => "method",
    Field => "field",
    Static => "static",
    Var => "var",
    Int => "int",
    Char => "char",
    Boolean => "boolean",
    Void => "void",
    True => "true",
    False => "false",
    Null => "null",
    This => "this",
    Let => "let",
    Do => "do",
    If => "if",
    Else => "else",
    While => "while",
    Return => "return",
});

pub const SYMBOLS: &str = "{}()[].,;+-*/&|<>=~";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Keyword(Keyword),
    Symbol(char),
    IntegerConstant(u16),
    StringConstant(String),
    Identifier(String),
}

impl Display for Token {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Token::Keyword(k) => write!(f, "keyword `{k}`"),
            Token::Symbol(c) => write!(f, "symbol `{c}`"),
            Token::IntegerConstant(v) => write!(f, "integer `{v}`"),
            Token::StringConstant(s) => write!(f, "string \"{s}\""),
            Token::Identifier(name) => write!(f, "identifier `{name}`"),
        }
    }
}

/// A token plus the 1-based line it started on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Spanned {
    pub token: Token,
    pub line: usize,
}

#[derive(Clone)]
pub struct Lexer<'a> {
    chars: Peekable<Chars<'a>>,
    line: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(src: &'a str) -> Self {
        Self {
            chars: src.chars().peekable(),
            line: 1,
        }
    }

    fn next_char(&mut self) -> Option<char> {
        let c = self.chars.next();
        if c == Some('\n') {
            self.line += 1;
        }
        c
    }

    fn peek_char(&mut self) -> Option<char> {
        self.chars.peek().copied()
    }

    /// Looks one character past the peeked one.
    fn peek_second(&self) -> Option<char> {
        let mut ahead = self.chars.clone();
        ahead.next();
        ahead.next()
    }

    fn consume_while<F: Fn(char) -> bool>(&mut self, pred: F, buf: &mut String) {
        while let Some(c) = self.peek_char() {
            if pred(c) {
                buf.push(c);
                self.next_char();
            } else {
                break;
            }
        }
    }

    /// Skips whitespace and both comment styles. Fails on an unterminated block comment.
    fn skip_trivia(&mut self) -> CompileResult<()> {
        loop {
            match (self.peek_char(), self.peek_second()) {
                (Some(c), _) if c.is_whitespace() => {
                    self.next_char();
                }
                (Some('/'), Some('/')) => {
                    while let Some(c) = self.next_char() {
                        if c == '\n' {
                            break;
                        }
                    }
                }
                (Some('/'), Some('*')) => {
                    let start = self.line;
                    self.next_char();
                    self.next_char();
                    let mut prev = '\0';
                    loop {
                        match self.next_char() {
                            Some('/') if prev == '*' => break,
                            Some(c) => prev = c,
                            None => {
                                return LexSnafu {
                                    line: start,
                                    message: "unterminated block comment",
                                }
                                .fail();
                            }
                        }
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    fn read_word(&mut self, first: char) -> Token {
        let mut word = String::new();
        word.push(first);
        self.consume_while(|c| c.is_ascii_alphanumeric() || c == '_', &mut word);
        match Keyword::from_text(&word) {
            Some(kw) => Token::Keyword(kw),
            None => Token::Identifier(word),
        }
    }

    fn read_number(&mut self, first: char) -> CompileResult<u16> {
        let mut num = String::new();
        num.push(first);
        self.consume_while(|c| c.is_ascii_digit(), &mut num);
        match num.parse::<u32>() {
            Ok(value) if value <= MAX_INT as u32 => Ok(value as u16),
            _ => LexSnafu {
                line: self.line,
                message: format!("integer constant {num} exceeds {MAX_INT}"),
            }
            .fail(),
        }
    }

    fn read_string(&mut self) -> CompileResult<String> {
        let start = self.line;
        let mut txt = String::new();
        while let Some(c) = self.next_char() {
            match c {
                '"' => return Ok(txt),
                '\n' => break,
                c => txt.push(c),
            }
        }
        LexSnafu {
            line: start,
            message: "unterminated string constant",
        }
        .fail()
    }
}

impl Iterator for Lexer<'_> {
    type Item = CompileResult<Spanned>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Err(e) = self.skip_trivia() {
            // drain so the iterator ends after the error
            while self.chars.next().is_some() {}
            return Some(Err(e));
        }

        let ch = self.next_char()?;
        let line = self.line;

        let tok_res = match ch {
            '"' => self.read_string().map(Token::StringConstant),
            c if SYMBOLS.contains(c) => Ok(Token::Symbol(c)),
            c if c.is_ascii_digit() => self.read_number(c).map(Token::IntegerConstant),
            c if c.is_ascii_alphabetic() || c == '_' => Ok(self.read_word(c)),
            e => LexSnafu {
                line,
                message: format!("unexpected character `{e}`"),
            }
            .fail(),
        };

        Some(tok_res.map(|token| Spanned { token, line }))
    }
}

/// Scans a whole unit up front so the parser can walk it with a cursor.
pub fn tokenize(src: &str) -> CompileResult<Vec<Spanned>> {
    Lexer::new(src).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CompileError;

    fn tokens(src: &str) -> Vec<Token> {
        tokenize(src)
            .unwrap()
            .into_iter()
            .map(|s| s.token)
            .collect()
    }

    #[test]
    fn test_tokenisation() {
        let test_cases = vec![
            (
                "let x = 42;",
                vec![
                    Token::Keyword(Keyword::Let),
                    Token::Identifier("x".into()),
                    Token::Symbol('='),
                    Token::IntegerConstant(42),
                    Token::Symbol(';'),
                ],
            ),
            (
                "do Output.printString(\"Hello world\");",
                vec![
                    Token::Keyword(Keyword::Do),
                    Token::Identifier("Output".into()),
                    Token::Symbol('.'),
                    Token::Identifier("printString".into()),
                    Token::Symbol('('),
                    Token::StringConstant("Hello world".into()),
                    Token::Symbol(')'),
                    Token::Symbol(';'),
                ],
            ),
            (
                "if (~(a&b)) {}",
                vec![
                    Token::Keyword(Keyword::If),
                    Token::Symbol('('),
                    Token::Symbol('~'),
                    Token::Symbol('('),
                    Token::Identifier("a".into()),
                    Token::Symbol('&'),
                    Token::Identifier("b".into()),
                    Token::Symbol(')'),
                    Token::Symbol(')'),
                    Token::Symbol('{'),
                    Token::Symbol('}'),
                ],
            ),
        ];

        for (src, expected) in test_cases {
            assert_eq!(tokens(src), expected, "source: {src}");
        }
    }

    #[test]
    fn test_comments_and_lines() {
        let src = "/** doc\n * comment */\nclass Main { // trailing\n  field int x_1;\n}";
        let spanned = tokenize(src).unwrap();
        assert_eq!(spanned[0].token, Token::Keyword(Keyword::Class));
        assert_eq!(spanned[0].line, 3);
        assert_eq!(spanned[3].token, Token::Keyword(Keyword::Field));
        assert_eq!(spanned[3].line, 4);
        assert_eq!(spanned[5].token, Token::Identifier("x_1".into()));
        assert_eq!(spanned.last().unwrap().token, Token::Symbol('}'));
    }

    #[test]
    fn test_division_is_not_a_comment() {
        assert_eq!(
            tokens("a/b"),
            vec![
                Token::Identifier("a".into()),
                Token::Symbol('/'),
                Token::Identifier("b".into()),
            ]
        );
    }

    #[test]
    fn test_lexical_errors() {
        let test_cases = vec![
            ("let x = 32768;", 1),
            ("let s = \"open\n;", 1),
            ("\n\nlet x = #;", 3),
            ("/* never closed", 1),
        ];

        for (src, line) in test_cases {
            match tokenize(src) {
                Err(CompileError::Lex { line: got, .. }) => assert_eq!(got, line, "source: {src}"),
                other => panic!("expected lex error for {src:?}, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_integer_upper_bound() {
        assert_eq!(tokens("32767"), vec![Token::IntegerConstant(MAX_INT)]);
    }
}
