//! The built-in function set.
//!
//! Each function carries a fixed identifier, a fixed arity, a type rule
//! and an evaluation rule. Boolean connectives and `IF` evaluate their
//! children lazily: a child whose value cannot change the result is never
//! evaluated, which matters when children are side-effecting actions.

// Function uses intentional casts for numeric widening
#![allow(clippy::cast_possible_truncation)]

use crate::node::context::Context;
use crate::node::value::{DataType, Value};
use crate::node::{EvalError, Node};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Threshold below which a floating point divisor counts as zero.
const DIVISOR_EPSILON: f64 = 1e-10;

/// A function primitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Function {
    // === Boolean ===
    /// Logical AND (short-circuits on a false first child).
    And,
    /// Logical OR (short-circuits on a true first child).
    Or,
    /// Logical NOT.
    Not,
    /// Negated AND (short-circuits on a false first child).
    Nand,
    /// Negated OR (short-circuits on a true first child).
    Nor,
    /// Exclusive OR.
    Xor,
    /// Material implication (short-circuits on a false first child).
    Implies,
    /// `IF(cond, then, else)`; evaluates only the chosen branch.
    If,

    // === Numeric ===
    /// Addition.
    Add,
    /// Subtraction.
    Sub,
    /// Multiplication.
    Mul,
    /// Division (protected: div by 0 returns 0).
    Div,
    /// Remainder (protected: mod by 0 returns 0).
    Mod,
    /// Maximum.
    Max,
    /// Minimum.
    Min,
    /// Absolute value.
    Abs,
    /// Negation.
    Neg,

    // === Comparison ===
    /// Greater than.
    Gt,
    /// Less than.
    Lt,
    /// Equality of two numbers or two booleans.
    Eq,

    // === Actions ===
    /// Run two actions in order.
    Seq2,
    /// Run three actions in order.
    Seq3,
}

impl Function {
    /// Every built-in function.
    pub const ALL: [Self; 22] = [
        Self::And,
        Self::Or,
        Self::Not,
        Self::Nand,
        Self::Nor,
        Self::Xor,
        Self::Implies,
        Self::If,
        Self::Add,
        Self::Sub,
        Self::Mul,
        Self::Div,
        Self::Mod,
        Self::Max,
        Self::Min,
        Self::Abs,
        Self::Neg,
        Self::Gt,
        Self::Lt,
        Self::Eq,
        Self::Seq2,
        Self::Seq3,
    ];

    /// Symbolic name, e.g. `"AND"`.
    #[must_use]
    pub fn identifier(self) -> &'static str {
        match self {
            Self::And => "AND",
            Self::Or => "OR",
            Self::Not => "NOT",
            Self::Nand => "NAND",
            Self::Nor => "NOR",
            Self::Xor => "XOR",
            Self::Implies => "IMPLIES",
            Self::If => "IF",
            Self::Add => "ADD",
            Self::Sub => "SUB",
            Self::Mul => "MUL",
            Self::Div => "DIV",
            Self::Mod => "MOD",
            Self::Max => "MAX",
            Self::Min => "MIN",
            Self::Abs => "ABS",
            Self::Neg => "NEG",
            Self::Gt => "GT",
            Self::Lt => "LT",
            Self::Eq => "EQ",
            Self::Seq2 => "SEQ2",
            Self::Seq3 => "SEQ3",
        }
    }

    /// Number of children this function takes.
    #[must_use]
    pub fn arity(self) -> usize {
        match self {
            Self::Not | Self::Abs | Self::Neg => 1,
            Self::If | Self::Seq3 => 3,
            Self::And
            | Self::Or
            | Self::Nand
            | Self::Nor
            | Self::Xor
            | Self::Implies
            | Self::Add
            | Self::Sub
            | Self::Mul
            | Self::Div
            | Self::Mod
            | Self::Max
            | Self::Min
            | Self::Gt
            | Self::Lt
            | Self::Eq
            | Self::Seq2 => 2,
        }
    }

    /// Result type for the given child types, or `None` if the
    /// combination is not well typed.
    #[must_use]
    pub fn resolve_type(self, inputs: &[DataType]) -> Option<DataType> {
        if inputs.len() != self.arity() {
            return None;
        }

        match self {
            Self::And | Self::Or | Self::Not | Self::Nand | Self::Nor | Self::Xor | Self::Implies => {
                inputs
                    .iter()
                    .all(|t| *t == DataType::Boolean)
                    .then_some(DataType::Boolean)
            }
            Self::If => (inputs[0] == DataType::Boolean && inputs[1] == inputs[2]).then_some(inputs[1]),
            Self::Add | Self::Sub | Self::Mul | Self::Div | Self::Mod | Self::Max | Self::Min => {
                inputs[0].widen(inputs[1])
            }
            Self::Abs | Self::Neg => inputs[0].is_numeric().then_some(inputs[0]),
            Self::Gt | Self::Lt => inputs[0]
                .widen(inputs[1])
                .map(|_| DataType::Boolean),
            Self::Eq => {
                let comparable = inputs[0].widen(inputs[1]).is_some()
                    || (inputs[0] == DataType::Boolean && inputs[1] == DataType::Boolean);
                comparable.then_some(DataType::Boolean)
            }
            Self::Seq2 | Self::Seq3 => inputs
                .iter()
                .all(|t| *t == DataType::Void)
                .then_some(DataType::Void),
        }
    }

    /// Evaluate this function over `children`.
    pub(crate) fn evaluate<C: Context + ?Sized>(
        self,
        children: &[Node],
        ctx: &mut C,
    ) -> Result<Value, EvalError> {
        let name = self.identifier();
        match self {
            Self::And => Ok(Value::Boolean(
                boolean(&children[0], ctx, name)? && boolean(&children[1], ctx, name)?,
            )),
            Self::Or => Ok(Value::Boolean(
                boolean(&children[0], ctx, name)? || boolean(&children[1], ctx, name)?,
            )),
            Self::Not => Ok(Value::Boolean(!boolean(&children[0], ctx, name)?)),
            Self::Nand => Ok(Value::Boolean(
                !(boolean(&children[0], ctx, name)? && boolean(&children[1], ctx, name)?),
            )),
            Self::Nor => Ok(Value::Boolean(
                !(boolean(&children[0], ctx, name)? || boolean(&children[1], ctx, name)?),
            )),
            Self::Xor => {
                let a = boolean(&children[0], ctx, name)?;
                let b = boolean(&children[1], ctx, name)?;
                Ok(Value::Boolean(a ^ b))
            }
            Self::Implies => Ok(Value::Boolean(
                !boolean(&children[0], ctx, name)? || boolean(&children[1], ctx, name)?,
            )),
            Self::If => {
                if boolean(&children[0], ctx, name)? {
                    children[1].evaluate(ctx)
                } else {
                    children[2].evaluate(ctx)
                }
            }
            Self::Seq2 | Self::Seq3 => {
                for child in children {
                    child.evaluate(ctx)?;
                }
                Ok(Value::Void)
            }
            Self::Abs | Self::Neg => {
                let v = children[0].evaluate(ctx)?;
                self.unary(v)
            }
            Self::Gt | Self::Lt | Self::Eq => {
                let a = children[0].evaluate(ctx)?;
                let b = children[1].evaluate(ctx)?;
                self.compare(a, b)
            }
            Self::Add | Self::Sub | Self::Mul | Self::Div | Self::Mod | Self::Max | Self::Min => {
                let a = children[0].evaluate(ctx)?;
                let b = children[1].evaluate(ctx)?;
                self.arithmetic(a, b)
            }
        }
    }

    /// Binary arithmetic with widening to the larger operand type.
    fn arithmetic(self, a: Value, b: Value) -> Result<Value, EvalError> {
        let widened = a
            .data_type()
            .widen(b.data_type())
            .ok_or_else(|| self.mismatch(&a, &b))?;

        match (widened, a, b) {
            (DataType::Integer, Value::Integer(x), Value::Integer(y)) => {
                Ok(Value::Integer(self.integer_op(i64::from(x), i64::from(y)) as i32))
            }
            (DataType::Long, _, _) => {
                let (x, y) = (a.as_i64(), b.as_i64());
                match (x, y) {
                    (Some(x), Some(y)) => Ok(Value::Long(self.integer_op(x, y))),
                    _ => Err(self.mismatch(&a, &b)),
                }
            }
            (DataType::Double, _, _) => match (a.as_f64(), b.as_f64()) {
                (Some(x), Some(y)) => Ok(Value::Double(self.double_op(x, y))),
                _ => Err(self.mismatch(&a, &b)),
            },
            _ => Err(self.mismatch(&a, &b)),
        }
    }

    /// Integer operation computed in `i64`.
    ///
    /// 32-bit results are truncated back by the caller, which gives the
    /// same wrapping behaviour as native `i32` arithmetic.
    fn integer_op(self, x: i64, y: i64) -> i64 {
        match self {
            Self::Add => x.wrapping_add(y),
            Self::Sub => x.wrapping_sub(y),
            Self::Mul => x.wrapping_mul(y),
            Self::Div => {
                if y == 0 {
                    0
                } else {
                    x.wrapping_div(y)
                }
            }
            Self::Mod => {
                if y == 0 {
                    0
                } else {
                    x.wrapping_rem(y)
                }
            }
            Self::Max => x.max(y),
            Self::Min => x.min(y),
            _ => 0,
        }
    }

    fn double_op(self, x: f64, y: f64) -> f64 {
        match self {
            Self::Add => x + y,
            Self::Sub => x - y,
            Self::Mul => x * y,
            Self::Div => {
                if y.abs() < DIVISOR_EPSILON {
                    0.0
                } else {
                    x / y
                }
            }
            Self::Mod => {
                if y.abs() < DIVISOR_EPSILON {
                    0.0
                } else {
                    x % y
                }
            }
            Self::Max => x.max(y),
            Self::Min => x.min(y),
            _ => 0.0,
        }
    }

    fn unary(self, v: Value) -> Result<Value, EvalError> {
        let negate = self == Self::Neg;
        match v {
            Value::Integer(x) => Ok(Value::Integer(if negate { x.wrapping_neg() } else { x.wrapping_abs() })),
            Value::Long(x) => Ok(Value::Long(if negate { x.wrapping_neg() } else { x.wrapping_abs() })),
            Value::Double(x) => Ok(Value::Double(if negate { -x } else { x.abs() })),
            Value::Boolean(_) | Value::Void => Err(EvalError::TypeMismatch {
                function: self.identifier(),
                found: v.data_type(),
            }),
        }
    }

    #[allow(clippy::float_cmp)]
    fn compare(self, a: Value, b: Value) -> Result<Value, EvalError> {
        if let (Value::Boolean(x), Value::Boolean(y)) = (a, b) {
            return if self == Self::Eq {
                Ok(Value::Boolean(x == y))
            } else {
                Err(self.mismatch(&a, &b))
            };
        }

        let result = match (a.as_i64(), b.as_i64()) {
            (Some(x), Some(y)) => match self {
                Self::Gt => x > y,
                Self::Lt => x < y,
                _ => x == y,
            },
            _ => {
                let (Some(x), Some(y)) = (a.as_f64(), b.as_f64()) else {
                    return Err(self.mismatch(&a, &b));
                };
                match self {
                    Self::Gt => x > y,
                    Self::Lt => x < y,
                    _ => x == y,
                }
            }
        };
        Ok(Value::Boolean(result))
    }

    /// Report the first operand whose type does not fit this function.
    fn mismatch(self, a: &Value, b: &Value) -> EvalError {
        let found = if a.data_type().is_numeric() {
            b.data_type()
        } else {
            a.data_type()
        };
        EvalError::TypeMismatch {
            function: self.identifier(),
            found,
        }
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.identifier())
    }
}

/// Evaluate `node` and require a boolean result.
fn boolean<C: Context + ?Sized>(
    node: &Node,
    ctx: &mut C,
    function: &'static str,
) -> Result<bool, EvalError> {
    let value = node.evaluate(ctx)?;
    value.as_bool().ok_or(EvalError::TypeMismatch {
        function,
        found: value.data_type(),
    })
}
