//! Statement productions.
//
//  statements ::= statement*
//  statement  ::= let | if | while | do | return
//  let        ::= 'let' name ('[' expression ']')? '=' expression ';'
//  if         ::= 'if' '(' expression ')' '{' statements '}' ('else' '{' statements '}')?
//  while      ::= 'while' '(' expression ')' '{' statements '}'
//  do         ::= 'do' subroutineCall ';'
//  return     ::= 'return' expression? ';'

use super::context::Context;
use super::expressions::{compile_expression, compile_index, compile_subroutine_call};
use crate::error::CompileResult;
use crate::processor::lexer::{Keyword, Token};
use crate::processor::vm::{ArithmeticOp, Segment};

/// Compiles statements until the next token cannot start one.
pub fn compile_statements(cx: &mut Context<'_>) -> CompileResult<()> {
    loop {
        match cx.cursor.peek() {
            Some(Token::Keyword(Keyword::Let)) => compile_let(cx)?,
            Some(Token::Keyword(Keyword::If)) => compile_if(cx)?,
            Some(Token::Keyword(Keyword::While)) => compile_while(cx)?,
            Some(Token::Keyword(Keyword::Do)) => compile_do(cx)?,
            Some(Token::Keyword(Keyword::Return)) => compile_return(cx)?,
            _ => return Ok(()),
        }
    }
}

fn compile_let(cx: &mut Context<'_>) -> CompileResult<()> {
    cx.expect_keyword(Keyword::Let)?;
    let name = cx.expect_identifier()?;

    if cx.eat_symbol('[') {
        cx.push_variable(&name)?;
        compile_index(cx)?;
        cx.expect_symbol(']')?;
        cx.out.write_arithmetic(ArithmeticOp::Add);

        cx.expect_symbol('=')?;
        compile_expression(cx)?;

        // `that` is repointed only after the right-hand side is evaluated
        cx.out.write_pop(Segment::Temp, 0);
        cx.out.write_pop(Segment::Pointer, 1);
        cx.out.write_push(Segment::Temp, 0);
        cx.out.write_pop(Segment::That, 0);
    } else {
        cx.expect_symbol('=')?;
        compile_expression(cx)?;
        cx.pop_variable(&name)?;
    }

    cx.expect_symbol(';')
}

fn compile_if(cx: &mut Context<'_>) -> CompileResult<()> {
    let index = cx.session.next_label();
    let if_true = format!("IF_TRUE{index}");
    let if_false = format!("IF_FALSE{index}");

    cx.expect_keyword(Keyword::If)?;
    cx.expect_symbol('(')?;
    compile_expression(cx)?;
    cx.expect_symbol(')')?;
    cx.out.write_arithmetic(ArithmeticOp::Not);
    cx.out.write_if(if_true.as_str());

    cx.expect_symbol('{')?;
    compile_statements(cx)?;
    cx.expect_symbol('}')?;
    cx.out.write_goto(if_false.as_str());
    cx.out.write_label(if_true);

    if cx.eat_keyword(Keyword::Else) {
        cx.expect_symbol('{')?;
        compile_statements(cx)?;
        cx.expect_symbol('}')?;
    }
    cx.out.write_label(if_false);
    Ok(())
}

fn compile_while(cx: &mut Context<'_>) -> CompileResult<()> {
    let index = cx.session.next_label();
    let top = format!("WHILE_EXP{index}");
    let exit = format!("WHILE_END{index}");

    cx.expect_keyword(Keyword::While)?;
    cx.out.write_label(top.as_str());
    cx.expect_symbol('(')?;
    compile_expression(cx)?;
    cx.expect_symbol(')')?;
    cx.out.write_arithmetic(ArithmeticOp::Not);
    cx.out.write_if(exit.as_str());

    cx.expect_symbol('{')?;
    compile_statements(cx)?;
    cx.expect_symbol('}')?;
    cx.out.write_goto(top);
    cx.out.write_label(exit);
    Ok(())
}

fn compile_do(cx: &mut Context<'_>) -> CompileResult<()> {
    cx.expect_keyword(Keyword::Do)?;
    compile_subroutine_call(cx)?;
    cx.expect_symbol(';')?;
    cx.out.write_pop(Segment::Temp, 0);
    Ok(())
}

fn compile_return(cx: &mut Context<'_>) -> CompileResult<()> {
    cx.expect_keyword(Keyword::Return)?;
    if cx.peek_symbol(';') {
        // every call site pops exactly one value
        cx.out.write_push(Segment::Constant, 0);
    } else {
        compile_expression(cx)?;
    }
    cx.expect_symbol(';')?;
    cx.out.write_return();
    Ok(())
}
