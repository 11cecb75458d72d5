//! Recursive-descent parser fused with VM code generation.
//!
//! There is no syntax tree: every production writes its instructions the
//! moment it is recognised. Optional productions peek at their first token
//! and report "absent" without consuming anything; once that first token has
//! matched, the rest of the production is mandatory and a mismatch aborts the
//! whole class with a syntax error.
//
//  class          ::= 'class' name '{' classVarDec* subroutineDec* '}'
//  classVarDec    ::= ('static'|'field') type name (',' name)* ';'
//  subroutineDec  ::= ('constructor'|'function'|'method') (type|'void') name
//                     '(' parameterList ')' '{' varDec* statements '}'

mod context;
mod expressions;
mod statements;

pub use context::{Context, Cursor, Session};

use crate::error::CompileResult;
use crate::processor::lexer::{Keyword, Spanned, tokenize};
use crate::processor::symbol_table::Kind;
use crate::processor::vm::{Instruction, Segment};

/// VM code of one class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledClass {
    pub name: String,
    pub code: Vec<Instruction>,
}

/// Scan and compile one unit of Jack source.
pub fn compile_source(session: &mut Session, src: &str) -> CompileResult<CompiledClass> {
    let tokens = tokenize(src)?;
    compile_tokens(session, &tokens)
}

pub fn compile_tokens(session: &mut Session, tokens: &[Spanned]) -> CompileResult<CompiledClass> {
    let mut cx = Context::new(tokens, session);
    compile_class(&mut cx)?;
    Ok(CompiledClass {
        name: cx.class_name,
        code: cx.out.into_code(),
    })
}

fn compile_class(cx: &mut Context<'_>) -> CompileResult<()> {
    cx.expect_keyword(Keyword::Class)?;
    cx.class_name = cx.expect_identifier()?;
    cx.symbols.reset();
    cx.expect_symbol('{')?;

    while compile_class_var_dec(cx)? {}
    while compile_subroutine(cx)? {}

    cx.expect_symbol('}')?;
    if !cx.cursor.at_end() {
        return Err(cx.syntax_error("end of input"));
    }
    Ok(())
}

/// `static`/`field` declarations. Returns false when none starts here.
fn compile_class_var_dec(cx: &mut Context<'_>) -> CompileResult<bool> {
    let kind = if cx.eat_keyword(Keyword::Static) {
        Kind::Static
    } else if cx.eat_keyword(Keyword::Field) {
        Kind::Field
    } else {
        return Ok(false);
    };

    let ty = cx.expect_type(false)?;
    loop {
        let name = cx.expect_identifier()?;
        cx.symbols.define(&name, &ty, kind);
        if !cx.eat_symbol(',') {
            break;
        }
    }
    cx.expect_symbol(';')?;
    Ok(true)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubroutineKind {
    Constructor,
    Function,
    Method,
}

/// Resets subroutine scope; a method's receiver takes argument 0 before any
/// parameter is numbered.
fn begin_subroutine(cx: &mut Context<'_>, kind: SubroutineKind) {
    cx.symbols.clear();
    if kind == SubroutineKind::Method {
        let class_name = cx.class_name.clone();
        cx.symbols.define("this", &class_name, Kind::Argument);
    }
}

fn compile_subroutine(cx: &mut Context<'_>) -> CompileResult<bool> {
    let kind = if cx.eat_keyword(Keyword::Constructor) {
        SubroutineKind::Constructor
    } else if cx.eat_keyword(Keyword::Function) {
        SubroutineKind::Function
    } else if cx.eat_keyword(Keyword::Method) {
        SubroutineKind::Method
    } else {
        return Ok(false);
    };

    begin_subroutine(cx, kind);

    let return_type = cx.expect_type(true)?;
    let name = cx.expect_identifier()?;
    cx.expect_symbol('(')?;
    compile_parameter_list(cx)?;
    cx.expect_symbol(')')?;
    cx.expect_symbol('{')?;

    // the header needs the final local count
    while compile_var_dec(cx)? > 0 {}
    let locals = cx.symbols.var_count(Kind::Var);
    cx.out
        .write_function(format!("{}.{}", cx.class_name, name), locals);

    match kind {
        SubroutineKind::Constructor => {
            let fields = cx.symbols.var_count(Kind::Field);
            let allocator = cx.out.runtime().allocator.clone();
            cx.out.write_push(Segment::Constant, fields);
            cx.out.write_call(allocator, 1);
            cx.out.write_pop(Segment::Pointer, 0);

            statements::compile_statements(cx)?;
            cx.expect_symbol('}')?;

            cx.out.write_push(Segment::Pointer, 0);
            cx.out.write_return();
        }
        SubroutineKind::Method | SubroutineKind::Function => {
            if kind == SubroutineKind::Method {
                cx.out.write_push(Segment::Argument, 0);
                cx.out.write_pop(Segment::Pointer, 0);
            }

            statements::compile_statements(cx)?;
            cx.expect_symbol('}')?;

            if return_type == "void" {
                cx.out.write_push(Segment::Constant, 0);
                cx.out.write_return();
            }
        }
    }
    Ok(true)
}

/// Possibly empty `type name (, type name)*`. Returns the parameter count.
fn compile_parameter_list(cx: &mut Context<'_>) -> CompileResult<u16> {
    if cx.peek_symbol(')') {
        return Ok(0);
    }
    let mut count = 0;
    loop {
        let ty = cx.expect_type(false)?;
        let name = cx.expect_identifier()?;
        cx.symbols.define(&name, &ty, Kind::Argument);
        count += 1;
        if !cx.eat_symbol(',') {
            break;
        }
    }
    Ok(count)
}

/// One `var` line. Returns how many locals it declared, 0 when absent.
fn compile_var_dec(cx: &mut Context<'_>) -> CompileResult<u16> {
    if !cx.eat_keyword(Keyword::Var) {
        return Ok(0);
    }
    let ty = cx.expect_type(false)?;
    let mut count = 0;
    loop {
        let name = cx.expect_identifier()?;
        cx.symbols.define(&name, &ty, Kind::Var);
        count += 1;
        if !cx.eat_symbol(',') {
            break;
        }
    }
    cx.expect_symbol(';')?;
    Ok(count)
}
