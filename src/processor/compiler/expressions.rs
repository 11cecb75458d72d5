//! Expressions, terms and subroutine calls.
//!
//! Operands are written out as soon as they are read; operators go through
//! an [`OpStack`] that releases them by precedence. A parenthesis does not
//! recurse: it drops a barrier on the current stack and the closing `)`
//! drains back to it.
//
//  expression     ::= term (op term)*
//  term           ::= integer | string | 'true' | 'false' | 'null' | 'this'
//                   | name | name '[' expression ']' | subroutineCall
//                   | '(' expression ')' | ('-'|'~') term
//  subroutineCall ::= name '(' expressionList ')'
//                   | (className|varName) '.' name '(' expressionList ')'

use super::context::Context;
use crate::error::{CompileResult, SyntaxSnafu};
use crate::processor::lexer::{Keyword, MAX_INT, Token};
use crate::processor::op_stack::{Op, OpStack};
use crate::processor::vm::{ArithmeticOp, Segment};

/// Compiles a full expression on a fresh operator stack.
pub fn compile_expression(cx: &mut Context<'_>) -> CompileResult<()> {
    let mut ops = OpStack::new();
    compile_expression_with(cx, &mut ops)?;
    expect_balanced(cx, &ops)
}

/// Compiles the index of `name[…]` on a fresh stack guarded by a `[` barrier.
/// Stops in front of the closing `]`.
pub fn compile_index(cx: &mut Context<'_>) -> CompileResult<()> {
    let mut ops = OpStack::new();
    ops.push(Op::Bracket, &mut cx.out);
    compile_expression_with(cx, &mut ops)?;
    expect_balanced(cx, &ops)
}

/// A finished expression leaves nothing behind on its stack.
fn expect_balanced(cx: &Context<'_>, ops: &OpStack) -> CompileResult<()> {
    match ops.nearest_barrier() {
        _ if ops.is_empty() => Ok(()),
        Some(Op::Bracket) => Err(cx.syntax_error("`]`")),
        _ => Err(cx.syntax_error("`)`")),
    }
}

fn compile_expression_with(cx: &mut Context<'_>, ops: &mut OpStack) -> CompileResult<()> {
    compile_term(cx, ops)?;

    loop {
        match cx.cursor.peek() {
            Some(Token::Symbol(']')) => match ops.nearest_barrier() {
                Some(Op::Bracket) => {
                    ops.pop_until_last_bracket(&mut cx.out);
                    return Ok(());
                }
                Some(_) => return Err(cx.syntax_error("`)`")),
                None => break,
            },
            Some(Token::Symbol(')')) => match ops.nearest_barrier() {
                Some(Op::Paren) => {
                    ops.pop_until(&mut cx.out);
                    cx.cursor.advance();
                }
                Some(_) => return Err(cx.syntax_error("`]`")),
                // a `)` we did not open belongs to the caller
                None => break,
            },
            Some(Token::Symbol(c)) => match Op::binary(*c) {
                Some(op) => {
                    cx.cursor.advance();
                    ops.push(op, &mut cx.out);
                    compile_term(cx, ops)?;
                }
                None => break,
            },
            _ => break,
        }
    }

    if ops.nearest_barrier() == Some(Op::Paren) {
        return Err(cx.syntax_error("`)`"));
    }
    ops.flush(&mut cx.out);
    Ok(())
}

fn compile_term(cx: &mut Context<'_>, ops: &mut OpStack) -> CompileResult<()> {
    let Some(token) = cx.cursor.peek() else {
        return Err(cx.syntax_error("term"));
    };

    match token {
        Token::IntegerConstant(v) => {
            cx.cursor.advance();
            cx.out.write_push(Segment::Constant, *v);
        }
        Token::StringConstant(s) => {
            compile_string(cx, s)?;
            cx.cursor.advance();
        }
        Token::Keyword(Keyword::True) => {
            cx.cursor.advance();
            cx.out.write_push(Segment::Constant, 0);
            cx.out.write_arithmetic(ArithmeticOp::Not);
        }
        Token::Keyword(Keyword::False | Keyword::Null) => {
            cx.cursor.advance();
            cx.out.write_push(Segment::Constant, 0);
        }
        Token::Keyword(Keyword::This) => {
            cx.cursor.advance();
            cx.out.write_push(Segment::Pointer, 0);
        }
        Token::Identifier(name) => match cx.cursor.peek_nth(1) {
            Some(Token::Symbol('[')) => {
                cx.cursor.advance();
                cx.cursor.advance();
                ops.push(Op::Bracket, &mut cx.out);
                cx.push_variable(name)?;
                compile_expression_with(cx, ops)?;
                cx.expect_symbol(']')?;
                cx.out.write_arithmetic(ArithmeticOp::Add);
                cx.out.write_pop(Segment::Pointer, 1);
                cx.out.write_push(Segment::That, 0);
            }
            Some(Token::Symbol('(' | '.')) => compile_subroutine_call(cx)?,
            _ => {
                cx.cursor.advance();
                cx.push_variable(name)?;
            }
        },
        Token::Symbol('(') => {
            cx.cursor.advance();
            ops.push(Op::Paren, &mut cx.out);
            compile_term(cx, ops)?;
        }
        Token::Symbol(c @ ('-' | '~')) => {
            cx.cursor.advance();
            if let Some(op) = Op::unary(*c) {
                ops.push(op, &mut cx.out);
            }
            compile_term(cx, ops)?;
        }
        _ => return Err(cx.syntax_error("term")),
    }
    Ok(())
}

/// `String.new(len)` followed by one `appendChar` per character.
fn compile_string(cx: &mut Context<'_>, s: &str) -> CompileResult<()> {
    let mut codes = Vec::with_capacity(s.len());
    for c in s.chars() {
        match u16::try_from(u32::from(c)) {
            Ok(code) if code <= MAX_INT => codes.push(code),
            _ => {
                return SyntaxSnafu {
                    line: cx.cursor.line(),
                    expected: "character below 32768",
                    found: format!("`{c}`"),
                }
                .fail();
            }
        }
    }

    let len = match u16::try_from(codes.len()) {
        Ok(len) if len <= MAX_INT => len,
        _ => {
            return SyntaxSnafu {
                line: cx.cursor.line(),
                expected: "string of at most 32767 characters",
                found: format!("{} characters", codes.len()),
            }
            .fail();
        }
    };

    let string_new = cx.out.runtime().string_new.clone();
    let append = cx.out.runtime().string_append.clone();
    cx.out.write_push(Segment::Constant, len);
    cx.out.write_call(string_new, 1);
    for code in codes {
        cx.out.write_push(Segment::Constant, code);
        cx.out.write_call(append.as_str(), 2);
    }
    Ok(())
}

/// Resolves the callee, pushes the implicit receiver when there is one, and
/// compiles the arguments. Each argument gets its own operator stack.
pub fn compile_subroutine_call(cx: &mut Context<'_>) -> CompileResult<()> {
    let name = cx.expect_identifier()?;

    let (callee, receiver) = if cx.eat_symbol('.') {
        let method = cx.expect_identifier()?;
        match cx.symbols.lookup(&name).map(|e| e.ty.clone()) {
            // `obj.method()` on a variable: the object is argument 0
            Some(ty) => {
                cx.push_variable(&name)?;
                (format!("{ty}.{method}"), 1)
            }
            None => (format!("{name}.{method}"), 0),
        }
    } else {
        cx.out.write_push(Segment::Pointer, 0);
        (format!("{}.{}", cx.class_name, name), 1)
    };

    cx.expect_symbol('(')?;
    let argc = compile_expression_list(cx)?;
    cx.expect_symbol(')')?;
    cx.out.write_call(callee, argc + receiver);
    Ok(())
}

fn compile_expression_list(cx: &mut Context<'_>) -> CompileResult<u16> {
    if cx.peek_symbol(')') {
        return Ok(0);
    }
    let mut count = 0;
    loop {
        compile_expression(cx)?;
        count += 1;
        if !cx.eat_symbol(',') {
            break;
        }
    }
    Ok(count)
}
