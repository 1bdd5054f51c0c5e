//! Float kernels.
//!
//! Float outranks Int and Range, so these slots accept any real-scalar
//! pairing and coerce the lower operand. Anything non-scalar is refused
//! back to the dispatcher.

use matte_core::value::{Matrix, Value};

fn both(a: &Value, b: &Value) -> Option<(f64, f64)> {
    Some((a.as_scalar()?, b.as_scalar()?))
}

pub fn truth(a: &Value) -> bool {
    matches!(a, Value::Float(v) if *v != 0.0)
}

pub fn plus(a: &Value, b: &Value) -> Option<Value> {
    both(a, b).map(|(a, b)| Value::Float(a + b))
}

pub fn minus(a: &Value, b: &Value) -> Option<Value> {
    both(a, b).map(|(a, b)| Value::Float(a - b))
}

pub fn uminus(a: &Value) -> Option<Value> {
    a.as_scalar().map(|v| Value::Float(-v))
}

pub fn times(a: &Value, b: &Value) -> Option<Value> {
    both(a, b).map(|(a, b)| Value::Float(a * b))
}

pub fn rdivide(a: &Value, b: &Value) -> Option<Value> {
    both(a, b).map(|(a, b)| Value::Float(a / b))
}

pub fn ldivide(a: &Value, b: &Value) -> Option<Value> {
    both(a, b).map(|(a, b)| Value::Float(b / a))
}

pub fn power(a: &Value, b: &Value) -> Option<Value> {
    both(a, b).map(|(a, b)| Value::Float(a.powf(b)))
}

macro_rules! float_cmp {
    ($name:ident, $op:tt) => {
        pub fn $name(a: &Value, b: &Value) -> Option<Value> {
            both(a, b).map(|(a, b)| Value::Int((a $op b) as i64))
        }
    };
}

float_cmp!(lt, <);
float_cmp!(gt, >);
float_cmp!(le, <=);
float_cmp!(ge, >=);
float_cmp!(ne, !=);
float_cmp!(eq, ==);

pub fn and(a: &Value, b: &Value) -> Option<Value> {
    both(a, b).map(|(a, b)| Value::Int((a != 0.0 && b != 0.0) as i64))
}

pub fn or(a: &Value, b: &Value) -> Option<Value> {
    both(a, b).map(|(a, b)| Value::Int((a != 0.0 || b != 0.0) as i64))
}

pub fn not(a: &Value) -> Option<Value> {
    a.as_scalar().map(|v| Value::Int((v == 0.0) as i64))
}

/// `a : d : b` with a float endpoint or step expands to a vector.
pub fn colon(a: &Value, b: &Value, c: &Value) -> Option<Value> {
    let begin = a.as_scalar()?;
    let step = b.as_scalar()?;
    let end = c.as_scalar()?;
    if step == 0.0 {
        return Some(Value::Vector(Vec::new()));
    }
    let mut data = Vec::new();
    let mut v = begin;
    while (step > 0.0 && v <= end) || (step < 0.0 && v >= end) {
        data.push(v);
        v = begin + (data.len() as f64) * step;
    }
    Some(Value::Vector(data))
}

pub fn transpose(a: &Value) -> Option<Value> {
    a.as_scalar().map(Value::Float)
}

pub fn horzcat(args: &[&Value]) -> Option<Value> {
    let mut data = Vec::with_capacity(args.len());
    for arg in args {
        data.push(arg.as_scalar()?);
    }
    Some(Value::Vector(data))
}

pub fn vertcat(args: &[&Value]) -> Option<Value> {
    let mut data = Vec::with_capacity(args.len());
    for arg in args {
        data.push(arg.as_scalar()?);
    }
    Some(Value::Matrix(Matrix { rows: data.len(), cols: 1, data }))
}
