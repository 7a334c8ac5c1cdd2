//! Operation vocabulary for deferred operator nodes.
//!
//! Defines the operators a lazy node can wrap and their semantics over
//! concrete [`Value`]s:
//! - **[`BinaryOp`]**: arithmetic, comparison, bitwise and shift operators.
//! - **[`UnaryOp`]**: negation, absolute value, logical not, bit inversion and
//!   the float-to-int rounding family.
//! - [`get_attr`] / [`get_index`]: attribute and subscript access.
//!
//! # Design: Validation at Resolution
//!
//! Building an operator node never inspects its operands. Whether the
//! operands support the operation is only known once they are resolved, so
//! every function here returns a `Result` and reports unsupported
//! combinations as [`CoreError::UnsupportedOperation`].
//!
//! Integer arithmetic is checked: overflow is an error, never a wrap.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::value::Value;

/// Upper bound on the length of a repeated sequence (`seq * n`).
pub const MAX_REPEAT_LEN: usize = 1 << 24;

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    /// True division: always produces a float for numeric operands.
    Div,
    /// Floor division (rounds toward negative infinity).
    FloorDiv,
    /// Modulo with the sign of the divisor.
    Mod,
    Pow,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnaryOp {
    Neg,
    Pos,
    Abs,
    /// Logical negation of the operand's truthiness.
    Not,
    /// Bitwise inversion of an integer.
    Invert,
    Floor,
    Ceil,
    Trunc,
}

impl BinaryOp {
    /// Stable operator name. Part of the node fingerprint, never change it.
    pub fn name(self) -> &'static str {
        match self {
            BinaryOp::Add => "add",
            BinaryOp::Sub => "sub",
            BinaryOp::Mul => "mul",
            BinaryOp::Div => "truediv",
            BinaryOp::FloorDiv => "floordiv",
            BinaryOp::Mod => "mod",
            BinaryOp::Pow => "pow",
            BinaryOp::BitAnd => "and",
            BinaryOp::BitOr => "or",
            BinaryOp::BitXor => "xor",
            BinaryOp::Shl => "lshift",
            BinaryOp::Shr => "rshift",
            BinaryOp::Eq => "eq",
            BinaryOp::Ne => "ne",
            BinaryOp::Lt => "lt",
            BinaryOp::Le => "le",
            BinaryOp::Gt => "gt",
            BinaryOp::Ge => "ge",
        }
    }

    /// Applies the operator to two resolved operands.
    pub fn apply(self, lhs: &Value, rhs: &Value) -> Result<Value, CoreError> {
        match self {
            BinaryOp::Eq => Ok(Value::Bool(values_equal(lhs, rhs))),
            BinaryOp::Ne => Ok(Value::Bool(!values_equal(lhs, rhs))),
            BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
                // Unordered floats (NaN) compare false under every operator.
                let ord = compare(self, lhs, rhs)?;
                Ok(Value::Bool(ord.is_some_and(|ord| match self {
                    BinaryOp::Lt => ord.is_lt(),
                    BinaryOp::Le => ord.is_le(),
                    BinaryOp::Gt => ord.is_gt(),
                    _ => ord.is_ge(),
                })))
            }
            BinaryOp::Add
            | BinaryOp::Sub
            | BinaryOp::Mul
            | BinaryOp::Div
            | BinaryOp::FloorDiv
            | BinaryOp::Mod
            | BinaryOp::Pow => arith(self, lhs, rhs),
            BinaryOp::BitAnd
            | BinaryOp::BitOr
            | BinaryOp::BitXor
            | BinaryOp::Shl
            | BinaryOp::Shr => bitwise(self, lhs, rhs),
        }
    }
}

impl UnaryOp {
    /// Stable operator name. Part of the node fingerprint, never change it.
    pub fn name(self) -> &'static str {
        match self {
            UnaryOp::Neg => "neg",
            UnaryOp::Pos => "pos",
            UnaryOp::Abs => "abs",
            UnaryOp::Not => "not",
            UnaryOp::Invert => "invert",
            UnaryOp::Floor => "floor",
            UnaryOp::Ceil => "ceil",
            UnaryOp::Trunc => "trunc",
        }
    }

    /// Applies the operator to a resolved operand.
    pub fn apply(self, operand: &Value) -> Result<Value, CoreError> {
        if self == UnaryOp::Not {
            return Ok(Value::Bool(!operand.is_truthy()));
        }
        let overflow = || CoreError::IntegerOverflow {
            op: self.name().to_string(),
        };
        match (self, as_number(operand)) {
            (UnaryOp::Neg, Some(Number::Int(i))) => i.checked_neg().map(Value::Int).ok_or_else(overflow),
            (UnaryOp::Neg, Some(Number::Float(x))) => Ok(Value::Float(-x)),
            (UnaryOp::Pos, Some(Number::Int(i))) => Ok(Value::Int(i)),
            (UnaryOp::Pos, Some(Number::Float(x))) => Ok(Value::Float(x)),
            (UnaryOp::Abs, Some(Number::Int(i))) => i.checked_abs().map(Value::Int).ok_or_else(overflow),
            (UnaryOp::Abs, Some(Number::Float(x))) => Ok(Value::Float(x.abs())),
            (UnaryOp::Invert, Some(Number::Int(i))) => Ok(Value::Int(!i)),
            (UnaryOp::Floor | UnaryOp::Ceil | UnaryOp::Trunc, Some(Number::Int(i))) => {
                Ok(Value::Int(i))
            }
            (UnaryOp::Floor, Some(Number::Float(x))) => float_to_int(x.floor()).ok_or_else(overflow),
            (UnaryOp::Ceil, Some(Number::Float(x))) => float_to_int(x.ceil()).ok_or_else(overflow),
            (UnaryOp::Trunc, Some(Number::Float(x))) => float_to_int(x.trunc()).ok_or_else(overflow),
            _ => Err(CoreError::UnsupportedOperation {
                op: self.name().to_string(),
                operand: operand.type_name().to_string(),
            }),
        }
    }
}

/// Looks up a named attribute: an object field or a map entry.
pub fn get_attr(value: &Value, name: &str) -> Result<Value, CoreError> {
    let found = match value {
        Value::Object(obj) => obj.fields.get(name),
        Value::Map(map) => map.get(name),
        _ => None,
    };
    found.cloned().ok_or_else(|| CoreError::NoSuchAttribute {
        type_name: value.type_name().to_string(),
        name: name.to_string(),
    })
}

/// Subscript access. Sequences accept negative indices counted from the end.
pub fn get_index(value: &Value, key: &Value) -> Result<Value, CoreError> {
    match (value, key) {
        (Value::List(items) | Value::Tuple(items), Value::Int(i)) => {
            let idx = normalize_index(*i, items.len(), value)?;
            Ok(items[idx].clone())
        }
        (Value::Str(s), Value::Int(i)) => {
            let chars: Vec<char> = s.chars().collect();
            let idx = normalize_index(*i, chars.len(), value)?;
            Ok(Value::Str(chars[idx].to_string()))
        }
        (Value::Bytes(bytes), Value::Int(i)) => {
            let idx = normalize_index(*i, bytes.len(), value)?;
            Ok(Value::Int(i64::from(bytes[idx])))
        }
        (Value::Map(map), Value::Str(k)) => map
            .get(k)
            .cloned()
            .ok_or_else(|| CoreError::KeyNotFound { key: k.clone() }),
        _ => Err(unsupported("getitem", value, key)),
    }
}

fn normalize_index(index: i64, len: usize, value: &Value) -> Result<usize, CoreError> {
    let out_of_range = || CoreError::IndexOutOfRange {
        type_name: value.type_name().to_string(),
        index,
        len,
    };
    let len_i = i64::try_from(len).map_err(|_| out_of_range())?;
    let idx = if index < 0 { index + len_i } else { index };
    if (0..len_i).contains(&idx) {
        Ok(idx as usize)
    } else {
        Err(out_of_range())
    }
}

#[derive(Debug, Clone, Copy)]
enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    fn to_f64(self) -> f64 {
        match self {
            Number::Int(i) => i as f64,
            Number::Float(x) => x,
        }
    }
}

fn as_number(value: &Value) -> Option<Number> {
    match value {
        Value::Int(i) => Some(Number::Int(*i)),
        Value::Bool(b) => Some(Number::Int(i64::from(*b))),
        Value::Float(x) => Some(Number::Float(*x)),
        _ => None,
    }
}

fn float_to_int(x: f64) -> Option<Value> {
    // i64::MAX as f64 rounds up to 2^63, so the upper bound is exclusive.
    if x.is_finite() && x >= i64::MIN as f64 && x < i64::MAX as f64 {
        Some(Value::Int(x as i64))
    } else {
        None
    }
}

fn unsupported(op: &str, lhs: &Value, rhs: &Value) -> CoreError {
    CoreError::UnsupportedOperation {
        op: op.to_string(),
        operand: format!("{} and {}", lhs.type_name(), rhs.type_name()),
    }
}

fn values_equal(lhs: &Value, rhs: &Value) -> bool {
    match (as_number(lhs), as_number(rhs)) {
        (Some(Number::Int(a)), Some(Number::Int(b))) => a == b,
        (Some(a), Some(b)) => a.to_f64() == b.to_f64(),
        _ => lhs == rhs,
    }
}

fn compare(op: BinaryOp, lhs: &Value, rhs: &Value) -> Result<Option<Ordering>, CoreError> {
    if let (Some(a), Some(b)) = (as_number(lhs), as_number(rhs)) {
        return Ok(match (a, b) {
            (Number::Int(a), Number::Int(b)) => Some(a.cmp(&b)),
            (a, b) => a.to_f64().partial_cmp(&b.to_f64()),
        });
    }
    match (lhs, rhs) {
        (Value::Str(a), Value::Str(b)) => Ok(Some(a.cmp(b))),
        (Value::Bytes(a), Value::Bytes(b)) => Ok(Some(a.cmp(b))),
        (Value::List(a), Value::List(b)) | (Value::Tuple(a), Value::Tuple(b)) => {
            for (x, y) in a.iter().zip(b) {
                if values_equal(x, y) {
                    continue;
                }
                return compare(op, x, y);
            }
            Ok(Some(a.len().cmp(&b.len())))
        }
        _ => Err(unsupported(op.name(), lhs, rhs)),
    }
}

fn arith(op: BinaryOp, lhs: &Value, rhs: &Value) -> Result<Value, CoreError> {
    if let (Some(a), Some(b)) = (as_number(lhs), as_number(rhs)) {
        return match (a, b) {
            (Number::Int(a), Number::Int(b)) => int_arith(op, a, b),
            (a, b) => float_arith(op, a.to_f64(), b.to_f64()),
        };
    }
    match (op, lhs, rhs) {
        (BinaryOp::Add, Value::Str(a), Value::Str(b)) => Ok(Value::Str(format!("{a}{b}"))),
        (BinaryOp::Add, Value::Bytes(a), Value::Bytes(b)) => Ok(Value::Bytes([a.as_slice(), b.as_slice()].concat())),
        (BinaryOp::Add, Value::List(a), Value::List(b)) => Ok(Value::List([a.as_slice(), b.as_slice()].concat())),
        (BinaryOp::Add, Value::Tuple(a), Value::Tuple(b)) => Ok(Value::Tuple([a.as_slice(), b.as_slice()].concat())),
        (BinaryOp::Mul, seq, Value::Int(n)) | (BinaryOp::Mul, Value::Int(n), seq) => {
            let times = usize::try_from(*n).unwrap_or(0);
            match seq {
                Value::Str(s) => {
                    repeat_len(op, s.len(), times)?;
                    Ok(Value::Str(s.repeat(times)))
                }
                Value::Bytes(b) => {
                    repeat_len(op, b.len(), times)?;
                    Ok(Value::Bytes(b.repeat(times)))
                }
                Value::List(items) => Ok(Value::List(repeat_items(op, items, times)?)),
                Value::Tuple(items) => Ok(Value::Tuple(repeat_items(op, items, times)?)),
                _ => Err(unsupported(op.name(), lhs, rhs)),
            }
        }
        _ => Err(unsupported(op.name(), lhs, rhs)),
    }
}

/// Length of `len * times`, rejected past [`MAX_REPEAT_LEN`].
fn repeat_len(op: BinaryOp, len: usize, times: usize) -> Result<usize, CoreError> {
    len.checked_mul(times)
        .filter(|total| *total <= MAX_REPEAT_LEN)
        .ok_or_else(|| CoreError::IntegerOverflow {
            op: op.name().to_string(),
        })
}

fn repeat_items(op: BinaryOp, items: &[Value], times: usize) -> Result<Vec<Value>, CoreError> {
    let total = repeat_len(op, items.len(), times)?;
    Ok(items.iter().cloned().cycle().take(total).collect())
}

fn int_arith(op: BinaryOp, a: i64, b: i64) -> Result<Value, CoreError> {
    let overflow = || CoreError::IntegerOverflow {
        op: op.name().to_string(),
    };
    let zero_check = || {
        if b == 0 {
            Err(CoreError::DivideByZero {
                op: op.name().to_string(),
            })
        } else {
            Ok(())
        }
    };
    match op {
        BinaryOp::Add => a.checked_add(b).map(Value::Int).ok_or_else(overflow),
        BinaryOp::Sub => a.checked_sub(b).map(Value::Int).ok_or_else(overflow),
        BinaryOp::Mul => a.checked_mul(b).map(Value::Int).ok_or_else(overflow),
        BinaryOp::Div => {
            zero_check()?;
            Ok(Value::Float(a as f64 / b as f64))
        }
        BinaryOp::FloorDiv => {
            zero_check()?;
            let q = a.checked_div(b).ok_or_else(overflow)?;
            let r = a.checked_rem(b).ok_or_else(overflow)?;
            let floored = if r != 0 && ((r < 0) != (b < 0)) { q - 1 } else { q };
            Ok(Value::Int(floored))
        }
        BinaryOp::Mod => {
            zero_check()?;
            // MIN % -1 overflows in Rust but is mathematically zero.
            let r = a.checked_rem(b).unwrap_or(0);
            let r = if r != 0 && ((r < 0) != (b < 0)) { r + b } else { r };
            Ok(Value::Int(r))
        }
        BinaryOp::Pow => {
            if b < 0 {
                return Ok(Value::Float((a as f64).powf(b as f64)));
            }
            let exp = u32::try_from(b).map_err(|_| overflow())?;
            a.checked_pow(exp).map(Value::Int).ok_or_else(overflow)
        }
        _ => unreachable!("int_arith called with non-arithmetic op {op:?}"),
    }
}

fn float_arith(op: BinaryOp, a: f64, b: f64) -> Result<Value, CoreError> {
    let zero_check = || {
        if b == 0.0 {
            Err(CoreError::DivideByZero {
                op: op.name().to_string(),
            })
        } else {
            Ok(())
        }
    };
    let x = match op {
        BinaryOp::Add => a + b,
        BinaryOp::Sub => a - b,
        BinaryOp::Mul => a * b,
        BinaryOp::Div => {
            zero_check()?;
            a / b
        }
        BinaryOp::FloorDiv => {
            zero_check()?;
            (a / b).floor()
        }
        BinaryOp::Mod => {
            zero_check()?;
            let r = a % b;
            if r != 0.0 && ((r < 0.0) != (b < 0.0)) {
                r + b
            } else {
                r
            }
        }
        BinaryOp::Pow => a.powf(b),
        _ => unreachable!("float_arith called with non-arithmetic op {op:?}"),
    };
    Ok(Value::Float(x))
}

fn bitwise(op: BinaryOp, lhs: &Value, rhs: &Value) -> Result<Value, CoreError> {
    if let (Value::Bool(a), Value::Bool(b)) = (lhs, rhs) {
        match op {
            BinaryOp::BitAnd => return Ok(Value::Bool(*a & *b)),
            BinaryOp::BitOr => return Ok(Value::Bool(*a | *b)),
            BinaryOp::BitXor => return Ok(Value::Bool(*a ^ *b)),
            _ => {}
        }
    }
    let (Some(a), Some(b)) = (lhs.as_int(), rhs.as_int()) else {
        return Err(unsupported(op.name(), lhs, rhs));
    };
    let overflow = || CoreError::IntegerOverflow {
        op: op.name().to_string(),
    };
    match op {
        BinaryOp::BitAnd => Ok(Value::Int(a & b)),
        BinaryOp::BitOr => Ok(Value::Int(a | b)),
        BinaryOp::BitXor => Ok(Value::Int(a ^ b)),
        BinaryOp::Shl | BinaryOp::Shr => {
            let Ok(shift) = u32::try_from(b) else {
                return Err(CoreError::UnsupportedOperation {
                    op: op.name().to_string(),
                    operand: "negative shift count".to_string(),
                });
            };
            if op == BinaryOp::Shr {
                return Ok(Value::Int(if shift >= 64 { a >> 63 } else { a >> shift }));
            }
            if a == 0 {
                return Ok(Value::Int(0));
            }
            if shift >= 64 {
                return Err(overflow());
            }
            let shifted = a << shift;
            if shifted >> shift == a {
                Ok(Value::Int(shifted))
            } else {
                Err(overflow())
            }
        }
        _ => unreachable!("bitwise called with non-bitwise op {op:?}"),
    }
}
