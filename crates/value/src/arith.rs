//! Arithmetic over [`Value`], mirroring the donor evaluator's pattern: try
//! integer arithmetic with overflow detection first, fall back to `f64`.

use crate::Value;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArithError {
    TypeMismatch { op: &'static str, left: &'static str, right: &'static str },
    DivisionByZero,
}

impl fmt::Display for ArithError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArithError::TypeMismatch { op, left, right } => {
                write!(f, "cannot apply `{op}` to {left} and {right}")
            }
            ArithError::DivisionByZero => write!(f, "division by zero"),
        }
    }
}

impl std::error::Error for ArithError {}

fn numeric(v: &Value) -> Option<NumKind> {
    match v {
        Value::Int(i) => Some(NumKind::Int(*i)),
        Value::Float(f) => Some(NumKind::Float(*f)),
        _ => None,
    }
}

enum NumKind {
    Int(i64),
    Float(f64),
}

/// `+`: numeric addition with checked-int/float-fallback, or string
/// concatenation when either side is a string.
pub fn add(left: &Value, right: &Value) -> Result<Value, ArithError> {
    if let (Value::String(_), _) | (_, Value::String(_)) = (left, right) {
        let mut out = String::with_capacity(16);
        out.push_str(&left.render_to_string());
        out.push_str(&right.render_to_string());
        return Ok(Value::String(out));
    }
    binary_numeric("+", left, right, i64::checked_add, |a, b| a + b)
}

pub fn subtract(left: &Value, right: &Value) -> Result<Value, ArithError> {
    binary_numeric("-", left, right, i64::checked_sub, |a, b| a - b)
}

pub fn multiply(left: &Value, right: &Value) -> Result<Value, ArithError> {
    binary_numeric("*", left, right, i64::checked_mul, |a, b| a * b)
}

/// `/`: always floating point, per the evaluator's division semantics —
/// mixing int division surprises are avoided entirely.
pub fn divide(left: &Value, right: &Value) -> Result<Value, ArithError> {
    let (Some(a), Some(b)) = (numeric(left), numeric(right)) else {
        return Err(ArithError::TypeMismatch { op: "/", left: left.type_name(), right: right.type_name() });
    };
    let (a, b) = (to_f64(a), to_f64(b));
    if b == 0.0 {
        return Err(ArithError::DivisionByZero);
    }
    Ok(Value::Float(a / b))
}

fn to_f64(k: NumKind) -> f64 {
    match k {
        NumKind::Int(i) => i as f64,
        NumKind::Float(f) => f,
    }
}

fn binary_numeric(
    op: &'static str,
    left: &Value,
    right: &Value,
    checked: impl Fn(i64, i64) -> Option<i64>,
    float_op: impl Fn(f64, f64) -> f64,
) -> Result<Value, ArithError> {
    let (Some(a), Some(b)) = (numeric(left), numeric(right)) else {
        return Err(ArithError::TypeMismatch { op, left: left.type_name(), right: right.type_name() });
    };
    match (a, b) {
        (NumKind::Int(a), NumKind::Int(b)) => match checked(a, b) {
            Some(result) => Ok(Value::Int(result)),
            None => Ok(Value::Float(float_op(a as f64, b as f64))),
        },
        (a, b) => Ok(Value::Float(float_op(to_f64(a), to_f64(b)))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int_addition_stays_int() {
        assert_eq!(add(&Value::Int(2), &Value::Int(3)).unwrap(), Value::Int(5));
    }

    #[test]
    fn overflow_falls_back_to_float() {
        let result = add(&Value::Int(i64::MAX), &Value::Int(1)).unwrap();
        assert!(matches!(result, Value::Float(_)));
    }

    #[test]
    fn mixed_int_float_promotes() {
        assert_eq!(add(&Value::Int(1), &Value::Float(1.5)).unwrap(), Value::Float(2.5));
    }

    #[test]
    fn string_concat_on_plus() {
        let r = add(&Value::string("a"), &Value::Int(1)).unwrap();
        assert_eq!(r, Value::string("a1"));
    }

    #[test]
    fn division_is_always_float() {
        assert_eq!(divide(&Value::Int(4), &Value::Int(2)).unwrap(), Value::Float(2.0));
    }

    #[test]
    fn division_by_zero_errors() {
        assert_eq!(divide(&Value::Int(1), &Value::Int(0)).unwrap_err(), ArithError::DivisionByZero);
    }

    #[test]
    fn type_mismatch_on_non_numeric() {
        let err = subtract(&Value::Bool(true), &Value::Int(1)).unwrap_err();
        assert!(matches!(err, ArithError::TypeMismatch { .. }));
    }
}
