//! Constant folding
//!
//! [`Expression::evaluate`] folds literal arithmetic, casts and comparisons.
//! `None` means "not a compile-time constant" and is never an error: member
//! access, calls and identifiers simply do not fold.
//!
//! Integer arithmetic wraps like 32-bit C and division or modulo by zero
//! yields 0. Mixed integer and float operands promote to float.

use super::ast::{Expression, Leaf, Operator};
use super::system_types::{SystemKind, SystemTypes};
use std::fmt;

/// Float tolerance for `~==`
pub const EPSILON: f64 = 1e-6;

/// A folded constant
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Integer(i32),
    Float(f64),
    Boolean(bool),
    String(String),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Integer(_) => "int",
            Value::Float(_) => "double",
            Value::Boolean(_) => "bool",
            Value::String(_) => "string",
        }
    }

    fn as_int(&self) -> Option<i32> {
        match self {
            Value::Integer(i) => Some(*i),
            Value::Boolean(b) => Some(i32::from(*b)),
            _ => None,
        }
    }

    fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            other => other.as_int().map(f64::from),
        }
    }

    fn is_truthy(&self) -> Option<bool> {
        match self {
            Value::Integer(i) => Some(*i != 0),
            Value::Float(f) => Some(*f != 0.0),
            Value::Boolean(b) => Some(*b),
            Value::String(_) => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(i) => write!(f, "{}", i),
            Value::Float(v) => write!(f, "{}", v),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::String(s) => write!(f, "\"{}\"", s),
        }
    }
}

/// Convert `value` to the builtin `target`.
///
/// Integer and bool convert freely, integers widen to float implicitly, and
/// float narrows to an integer kind only when `explicit`.
pub fn cast(value: Value, target: &str, explicit: bool, system: &SystemTypes) -> Option<Value> {
    let target_type = system.lookup(target)?;
    let to_bool = target_type.name == "bool";
    match (value, target_type.kind) {
        (Value::String(_), _) => None,
        (Value::Float(f), SystemKind::Integer) => {
            if !explicit {
                None
            } else if to_bool {
                Some(Value::Boolean(f != 0.0))
            } else {
                Some(Value::Integer(f as i32))
            }
        }
        (Value::Float(f), SystemKind::Float) => Some(Value::Float(f)),
        (value, SystemKind::Integer) => {
            let i = value.as_int()?;
            if to_bool {
                Some(Value::Boolean(i != 0))
            } else {
                Some(Value::Integer(i))
            }
        }
        (value, SystemKind::Float) => value.as_float().map(Value::Float),
        _ => None,
    }
}

fn leaf_value(leaf: &Leaf, system: &SystemTypes) -> Option<Value> {
    match leaf {
        Leaf::Integer(token) => Some(Value::Integer(token.int_value as i32)),
        Leaf::Double(token) => Some(Value::Float(token.float_value)),
        Leaf::Boolean(token) => Some(Value::Boolean(token.is_keyword("true"))),
        Leaf::String(token) => Some(Value::String(token.content().to_string())),
        Leaf::Identifier(_) => None,
        Leaf::Expression(expr) => expr.evaluate(system),
    }
}

fn spaceship<T: PartialOrd>(a: T, b: T) -> i32 {
    if a < b {
        -1
    } else if a > b {
        1
    } else {
        0
    }
}

fn fold_float(op: Operator, a: f64, b: f64) -> Option<Value> {
    let value = match op {
        Operator::Add => Value::Float(a + b),
        Operator::Sub => Value::Float(a - b),
        Operator::Mul => Value::Float(a * b),
        Operator::Div => Value::Float(if b == 0.0 { 0.0 } else { a / b }),
        Operator::Modulo => Value::Float(if b == 0.0 { 0.0 } else { a % b }),
        Operator::CmpLT => Value::Boolean(a < b),
        Operator::CmpGT => Value::Boolean(a > b),
        Operator::CmpLTEQ => Value::Boolean(a <= b),
        Operator::CmpGTEQ => Value::Boolean(a >= b),
        Operator::CmpEq => Value::Boolean(a == b),
        Operator::CmpNotEq => Value::Boolean(a != b),
        Operator::CmpSomewhatEq => Value::Boolean((a - b).abs() < EPSILON),
        Operator::CmpSpaceship => Value::Integer(spaceship(a, b)),
        Operator::LogicalAnd => Value::Boolean(a != 0.0 && b != 0.0),
        Operator::LogicalOr => Value::Boolean(a != 0.0 || b != 0.0),
        _ => return None,
    };
    Some(value)
}

fn fold_int(op: Operator, a: i32, b: i32) -> Option<Value> {
    let value = match op {
        Operator::Add => Value::Integer(a.wrapping_add(b)),
        Operator::Sub => Value::Integer(a.wrapping_sub(b)),
        Operator::Mul => Value::Integer(a.wrapping_mul(b)),
        Operator::Div => Value::Integer(if b == 0 { 0 } else { a.wrapping_div(b) }),
        Operator::Modulo => Value::Integer(if b == 0 { 0 } else { a.wrapping_rem(b) }),
        Operator::BitShl => Value::Integer(a.wrapping_shl(b as u32)),
        Operator::BitShr => Value::Integer(a.wrapping_shr(b as u32)),
        Operator::BitShrUnsigned => Value::Integer((a as u32).wrapping_shr(b as u32) as i32),
        Operator::BitAnd => Value::Integer(a & b),
        Operator::BitOr => Value::Integer(a | b),
        Operator::Xor => Value::Integer(a ^ b),
        Operator::CmpLT => Value::Boolean(a < b),
        Operator::CmpGT => Value::Boolean(a > b),
        Operator::CmpLTEQ => Value::Boolean(a <= b),
        Operator::CmpGTEQ => Value::Boolean(a >= b),
        Operator::CmpEq | Operator::CmpSomewhatEq => Value::Boolean(a == b),
        Operator::CmpNotEq => Value::Boolean(a != b),
        Operator::CmpSpaceship => Value::Integer(spaceship(a, b)),
        Operator::LogicalAnd => Value::Boolean(a != 0 && b != 0),
        Operator::LogicalOr => Value::Boolean(a != 0 || b != 0),
        _ => return None,
    };
    Some(value)
}

fn fold_binary(op: Operator, left: Value, right: Value) -> Option<Value> {
    match (&left, &right) {
        (Value::String(a), Value::String(b)) => match op {
            Operator::Concat => Some(Value::String(format!("{}{}", a, b))),
            Operator::CmpEq => Some(Value::Boolean(a == b)),
            Operator::CmpNotEq => Some(Value::Boolean(a != b)),
            Operator::CmpSomewhatEq => Some(Value::Boolean(a.eq_ignore_ascii_case(b))),
            _ => None,
        },
        (Value::String(_), _) | (_, Value::String(_)) => {
            if op == Operator::Concat {
                Some(Value::String(format!("{}{}", display_raw(&left), display_raw(&right))))
            } else {
                None
            }
        }
        (Value::Float(_), _) | (_, Value::Float(_)) => fold_float(op, left.as_float()?, right.as_float()?),
        _ => fold_int(op, left.as_int()?, right.as_int()?),
    }
}

fn display_raw(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn fold_unary(op: Operator, value: Value) -> Option<Value> {
    match (op, value) {
        (Operator::UnaryMinus, Value::Float(f)) => Some(Value::Float(-f)),
        (Operator::UnaryMinus, value) => value.as_int().map(|i| Value::Integer(i.wrapping_neg())),
        (Operator::UnaryNeg, Value::Float(_)) => None,
        (Operator::UnaryNeg, value) => value.as_int().map(|i| Value::Integer(!i)),
        (Operator::UnaryNot, value) => value.is_truthy().map(|t| Value::Boolean(!t)),
        _ => None,
    }
}

impl Expression {
    /// Fold this expression to a constant, if it is one.
    pub fn evaluate(&self, system: &SystemTypes) -> Option<Value> {
        match self.op {
            Operator::Literal => leaf_value(self.leaves.first()?, system),
            Operator::Cast => {
                let target = self.leaves.first()?.token()?;
                let value = leaf_value(self.leaves.get(1)?, system)?;
                cast(value, &target.text, true, system)
            }
            Operator::UnaryMinus | Operator::UnaryNeg | Operator::UnaryNot => {
                let value = leaf_value(self.leaves.first()?, system)?;
                fold_unary(self.op, value)
            }
            Operator::Ternary => {
                let condition = leaf_value(self.leaves.first()?, system)?.is_truthy()?;
                let chosen = if condition { 1 } else { 2 };
                leaf_value(self.leaves.get(chosen)?, system)
            }
            _ if self.assign || self.leaves.len() != 2 => None,
            _ => {
                let left = leaf_value(&self.leaves[0], system)?;
                let right = leaf_value(&self.leaves[1], system)?;
                fold_binary(self.op, left, right)
            }
        }
    }
}
