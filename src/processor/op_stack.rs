//! Operator-precedence stack used while compiling expressions.
//!
//! Operators wait here until something of strictly lower precedence shows up
//! (or the expression ends), then come out as VM instructions. `(` and `[`
//! are barriers: draining never crosses them, and a barrier is only removed
//! by a closer of its own kind.
//!
//!   relational `< > =`  0
//!   additive   `+ -`    1
//!   multiplic. `* /`    2
//!   bitwise    `& |`    3
//!   unary      `neg not` 4
//!
//! Equal precedence does not drain on push. A chain such as `a - b - c`
//! therefore leaves both `-` on the stack and they come out last-in-first-out
//! at the flush, i.e. `a - (b - c)`. Callers rely on this exact order.

use crate::processor::vm::{ArithmeticOp, VmWriter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Add,
    Sub,
    Mul,
    Div,
    And,
    Or,
    Lt,
    Gt,
    Eq,
    Neg,
    Not,
    Paren,
    Bracket,
}

impl Op {
    /// Binary operator spelled by `c`, if any.
    pub fn binary(c: char) -> Option<Op> {
        let op = match c {
            '+' => Op::Add,
            '-' => Op::Sub,
            '*' => Op::Mul,
            '/' => Op::Div,
            '&' => Op::And,
            '|' => Op::Or,
            '<' => Op::Lt,
            '>' => Op::Gt,
            '=' => Op::Eq,
            _ => return None,
        };
        Some(op)
    }

    /// Unary operator spelled by `c`, if any.
    pub fn unary(c: char) -> Option<Op> {
        match c {
            '-' => Some(Op::Neg),
            '~' => Some(Op::Not),
            _ => None,
        }
    }

    pub fn precedence(self) -> u8 {
        match self {
            Op::Lt | Op::Gt | Op::Eq => 0,
            Op::Add | Op::Sub => 1,
            Op::Mul | Op::Div => 2,
            Op::And | Op::Or => 3,
            Op::Neg | Op::Not => 4,
            Op::Paren | Op::Bracket => 0,
        }
    }

    pub fn is_barrier(self) -> bool {
        matches!(self, Op::Paren | Op::Bracket)
    }

    fn emit(self, out: &mut VmWriter) {
        let arith = match self {
            Op::Add => ArithmeticOp::Add,
            Op::Sub => ArithmeticOp::Sub,
            Op::And => ArithmeticOp::And,
            Op::Or => ArithmeticOp::Or,
            Op::Lt => ArithmeticOp::Lt,
            Op::Gt => ArithmeticOp::Gt,
            Op::Eq => ArithmeticOp::Eq,
            Op::Neg => ArithmeticOp::Neg,
            Op::Not => ArithmeticOp::Not,
            Op::Mul => {
                let helper = out.runtime().multiply.clone();
                out.write_call(helper, 2);
                return;
            }
            Op::Div => {
                let helper = out.runtime().divide.clone();
                out.write_call(helper, 2);
                return;
            }
            // barriers are discarded, never emitted
            Op::Paren | Op::Bracket => return,
        };
        out.write_arithmetic(arith);
    }
}

/// Pending operators of one expression. Each top-level expression owns its
/// own instance, so nested argument lists never see an enclosing expression's
/// operators.
#[derive(Debug, Default)]
pub struct OpStack {
    stack: Vec<Op>,
}

impl OpStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, op: Op, out: &mut VmWriter) {
        if op.is_barrier() {
            self.stack.push(op);
            return;
        }
        while let Some(&top) = self.stack.last() {
            if top.is_barrier() || op.precedence() >= top.precedence() {
                break;
            }
            self.stack.pop();
            top.emit(out);
        }
        self.stack.push(op);
    }

    /// Drains down to and including the nearest `(`. Returns `false`, with
    /// nothing consumed past the operators, when the nearest barrier is not
    /// a `(` or there is none.
    pub fn pop_until(&mut self, out: &mut VmWriter) -> bool {
        self.drain_to(Op::Paren, out)
    }

    /// Drains down to and including the nearest `[`, same contract as
    /// [`OpStack::pop_until`].
    pub fn pop_until_last_bracket(&mut self, out: &mut VmWriter) -> bool {
        self.drain_to(Op::Bracket, out)
    }

    /// Emits pending operators down to the nearest barrier, which stays.
    pub fn flush(&mut self, out: &mut VmWriter) {
        while let Some(&top) = self.stack.last() {
            if top.is_barrier() {
                return;
            }
            self.stack.pop();
            top.emit(out);
        }
    }

    fn drain_to(&mut self, barrier: Op, out: &mut VmWriter) -> bool {
        self.flush(out);
        if self.stack.last() == Some(&barrier) {
            self.stack.pop();
            true
        } else {
            false
        }
    }

    /// Innermost open `(` or `[`.
    pub fn nearest_barrier(&self) -> Option<Op> {
        self.stack.iter().rev().copied().find(|op| op.is_barrier())
    }

    pub fn contains(&self, op: Op) -> bool {
        self.stack.contains(&op)
    }

    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    pub fn len(&self) -> usize {
        self.stack.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Runtime;
    use crate::processor::vm::{Instruction, Segment, render};

    fn writer() -> VmWriter {
        VmWriter::new(Runtime::default())
    }

    /// Feeds `a <op> b <op> c …` the way the expression compiler does:
    /// operand pushes go straight out, operators through the stack.
    fn run(items: &[&str]) -> String {
        let mut out = writer();
        let mut ops = OpStack::new();
        for item in items {
            match *item {
                "(" => ops.push(Op::Paren, &mut out),
                ")" => assert!(ops.pop_until(&mut out)),
                "neg" => ops.push(Op::Neg, &mut out),
                "not" => ops.push(Op::Not, &mut out),
                s if s.len() == 1 && Op::binary(s.chars().next().unwrap()).is_some() => {
                    ops.push(Op::binary(s.chars().next().unwrap()).unwrap(), &mut out)
                }
                n => out.write_push(Segment::Constant, n.parse().unwrap()),
            }
        }
        ops.flush(&mut out);
        assert!(ops.is_empty());
        render(out.code())
    }

    #[test]
    fn test_precedence_orders() {
        let test_cases = vec![
            (
                vec!["1", "+", "2", "*", "3"],
                "push constant 1\npush constant 2\npush constant 3\ncall Math.multiply 2\nadd\n",
            ),
            (
                vec!["1", "*", "2", "+", "3"],
                "push constant 1\npush constant 2\ncall Math.multiply 2\npush constant 3\nadd\n",
            ),
            (
                vec!["1", "+", "2", "<", "3"],
                "push constant 1\npush constant 2\nadd\npush constant 3\nlt\n",
            ),
            (
                vec!["neg", "1", "+", "2"],
                "push constant 1\nneg\npush constant 2\nadd\n",
            ),
            (
                vec!["1", "*", "neg", "2"],
                "push constant 1\npush constant 2\nneg\ncall Math.multiply 2\n",
            ),
            (
                vec!["(", "1", "+", "2", ")", "*", "3"],
                "push constant 1\npush constant 2\nadd\npush constant 3\ncall Math.multiply 2\n",
            ),
        ];

        for (items, expected) in test_cases {
            assert_eq!(run(&items), expected, "items: {items:?}");
        }
    }

    #[test]
    fn test_equal_precedence_flushes_lifo() {
        // a - b - c comes out as a - (b - c)
        assert_eq!(
            run(&["1", "-", "2", "-", "3"]),
            "push constant 1\npush constant 2\npush constant 3\nsub\nsub\n"
        );
        assert_eq!(
            run(&["8", "/", "4", "*", "2"]),
            "push constant 8\npush constant 4\npush constant 2\ncall Math.multiply 2\ncall Math.divide 2\n"
        );
    }

    #[test]
    fn test_barriers_block_draining() {
        let mut out = writer();
        let mut ops = OpStack::new();
        ops.push(Op::Mul, &mut out);
        ops.push(Op::Bracket, &mut out);
        ops.push(Op::Add, &mut out);
        // `*` is behind the bracket, so `<` cannot reach it
        ops.push(Op::Lt, &mut out);
        assert_eq!(out.code(), &[Instruction::Arithmetic(ArithmeticOp::Add)]);

        assert!(ops.pop_until_last_bracket(&mut out));
        assert_eq!(ops.len(), 1);
        assert!(ops.contains(Op::Mul));
        assert!(!ops.contains(Op::Bracket));

        ops.flush(&mut out);
        assert!(ops.is_empty());
        assert_eq!(
            render(out.code()),
            "add\nlt\ncall Math.multiply 2\n"
        );
    }

    #[test]
    fn test_paren_drain_stops_at_barrier() {
        let mut out = writer();
        let mut ops = OpStack::new();
        ops.push(Op::Sub, &mut out);
        ops.push(Op::Paren, &mut out);
        ops.push(Op::Not, &mut out);
        assert!(ops.pop_until(&mut out));
        assert_eq!(out.code(), &[Instruction::Arithmetic(ArithmeticOp::Not)]);
        assert_eq!(ops.len(), 1);
    }

    #[test]
    fn test_drain_refuses_other_barrier() {
        let test_cases = vec![
            (vec![Op::Bracket, Op::Paren, Op::Add], Op::Bracket, Some(Op::Paren)),
            (vec![Op::Paren, Op::Bracket, Op::Add], Op::Paren, Some(Op::Bracket)),
            (vec![Op::Add], Op::Paren, None),
        ];

        for (pushed, target, left) in test_cases {
            let mut out = writer();
            let mut ops = OpStack::new();
            for op in &pushed {
                ops.push(*op, &mut out);
            }
            let drained = match target {
                Op::Paren => ops.pop_until(&mut out),
                _ => ops.pop_until_last_bracket(&mut out),
            };
            assert!(!drained, "{pushed:?}");
            // the operator above the barrier still comes out
            assert_eq!(out.code(), &[Instruction::Arithmetic(ArithmeticOp::Add)]);
            assert_eq!(ops.nearest_barrier(), left, "{pushed:?}");
        }
    }

    #[test]
    fn test_custom_helpers() {
        let runtime = Runtime {
            multiply: "Fast.mul".into(),
            ..Runtime::default()
        };
        let mut out = VmWriter::new(runtime);
        let mut ops = OpStack::new();
        ops.push(Op::Mul, &mut out);
        ops.flush(&mut out);
        assert_eq!(out.code(), &[Instruction::Call("Fast.mul".into(), 2)]);
    }
}
