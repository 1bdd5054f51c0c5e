//! Integer kernels.
//!
//! Int sits at the bottom of the numeric tower, so these slots only ever
//! see Int/Int operand pairs: any mixed pairing dispatches to the other
//! operand's type. Division by zero refuses the operands so the
//! dispatcher reports it with the pending exception.

use matte_core::error;
use matte_core::except::ids;
use matte_core::value::{Matrix, Range, Value};

fn both(a: &Value, b: &Value) -> Option<(i64, i64)> {
    match (a, b) {
        (Value::Int(a), Value::Int(b)) => Some((*a, *b)),
        _ => None,
    }
}

pub fn truth(a: &Value) -> bool {
    matches!(a, Value::Int(v) if *v != 0)
}

pub fn plus(a: &Value, b: &Value) -> Option<Value> {
    both(a, b).map(|(a, b)| Value::Int(a.wrapping_add(b)))
}

pub fn minus(a: &Value, b: &Value) -> Option<Value> {
    both(a, b).map(|(a, b)| Value::Int(a.wrapping_sub(b)))
}

pub fn uminus(a: &Value) -> Option<Value> {
    a.as_int().map(|v| Value::Int(-v))
}

pub fn times(a: &Value, b: &Value) -> Option<Value> {
    both(a, b).map(|(a, b)| Value::Int(a.wrapping_mul(b)))
}

pub fn rdivide(a: &Value, b: &Value) -> Option<Value> {
    let (a, b) = both(a, b)?;
    if b == 0 {
        error!(ids::UNDEFINED_FUNCTION, "division of {a} by zero");
        return None;
    }
    Some(Value::Int(a / b))
}

pub fn ldivide(a: &Value, b: &Value) -> Option<Value> {
    rdivide(b, a)
}

pub fn power(a: &Value, b: &Value) -> Option<Value> {
    let (base, exp) = both(a, b)?;
    if exp < 0 {
        // Negative exponents leave the integers; re-dispatch as floats.
        return Some(Value::Float((base as f64).powi(exp as i32)));
    }
    Some(Value::Int(base.wrapping_pow(exp.min(u32::MAX as i64) as u32)))
}

macro_rules! int_cmp {
    ($name:ident, $op:tt) => {
        pub fn $name(a: &Value, b: &Value) -> Option<Value> {
            both(a, b).map(|(a, b)| Value::Int((a $op b) as i64))
        }
    };
}

int_cmp!(lt, <);
int_cmp!(gt, >);
int_cmp!(le, <=);
int_cmp!(ge, >=);
int_cmp!(ne, !=);
int_cmp!(eq, ==);

pub fn and(a: &Value, b: &Value) -> Option<Value> {
    both(a, b).map(|(a, b)| Value::Int((a != 0 && b != 0) as i64))
}

pub fn or(a: &Value, b: &Value) -> Option<Value> {
    both(a, b).map(|(a, b)| Value::Int((a != 0 || b != 0) as i64))
}

pub fn not(a: &Value) -> Option<Value> {
    a.as_int().map(|v| Value::Int((v == 0) as i64))
}

/// `a : d : b` over integers produces a range.
pub fn colon(a: &Value, b: &Value, c: &Value) -> Option<Value> {
    match (a, b, c) {
        (Value::Int(begin), Value::Int(step), Value::Int(end)) => {
            Some(Value::Range(Range::new(*begin, *step, *end)))
        }
        _ => None,
    }
}

/// Scalar transpose is the identity.
pub fn transpose(a: &Value) -> Option<Value> {
    a.as_int().map(Value::Int)
}

pub fn horzcat(args: &[&Value]) -> Option<Value> {
    let mut data = Vec::with_capacity(args.len());
    for arg in args {
        data.push(arg.as_int()? as f64);
    }
    Some(Value::Vector(data))
}

pub fn vertcat(args: &[&Value]) -> Option<Value> {
    let mut data = Vec::with_capacity(args.len());
    for arg in args {
        data.push(arg.as_int()? as f64);
    }
    Some(Value::Matrix(Matrix { rows: data.len(), cols: 1, data }))
}
