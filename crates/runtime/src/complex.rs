//! Complex float kernels.
//!
//! Complex outranks every real scalar kind; operands are lifted to
//! `Complex64` before the operation. Ordering comparisons have no
//! complex meaning and stay unimplemented.

use num_complex::Complex64;

use matte_core::value::{Value, ValueKind};

fn lift(v: &Value) -> Option<Complex64> {
    match v {
        Value::Complex(c) => Some(*c),
        Value::Int(i) => Some(Complex64::new(*i as f64, 0.0)),
        Value::Float(f) => Some(Complex64::new(*f, 0.0)),
        _ => None,
    }
}

fn both(a: &Value, b: &Value) -> Option<(Complex64, Complex64)> {
    Some((lift(a)?, lift(b)?))
}

pub fn truth(a: &Value) -> bool {
    matches!(a, Value::Complex(c) if c.norm_sqr() != 0.0)
}

pub fn plus(a: &Value, b: &Value) -> Option<Value> {
    both(a, b).map(|(a, b)| Value::Complex(a + b))
}

pub fn minus(a: &Value, b: &Value) -> Option<Value> {
    both(a, b).map(|(a, b)| Value::Complex(a - b))
}

pub fn uminus(a: &Value) -> Option<Value> {
    lift(a).map(|c| Value::Complex(-c))
}

pub fn times(a: &Value, b: &Value) -> Option<Value> {
    both(a, b).map(|(a, b)| Value::Complex(a * b))
}

pub fn rdivide(a: &Value, b: &Value) -> Option<Value> {
    both(a, b).map(|(a, b)| Value::Complex(a / b))
}

pub fn ldivide(a: &Value, b: &Value) -> Option<Value> {
    both(a, b).map(|(a, b)| Value::Complex(b / a))
}

pub fn power(a: &Value, b: &Value) -> Option<Value> {
    both(a, b).map(|(a, b)| Value::Complex(a.powc(b)))
}

pub fn eq(a: &Value, b: &Value) -> Option<Value> {
    both(a, b).map(|(a, b)| Value::Int((a == b) as i64))
}

pub fn ne(a: &Value, b: &Value) -> Option<Value> {
    both(a, b).map(|(a, b)| Value::Int((a != b) as i64))
}

pub fn not(a: &Value) -> Option<Value> {
    lift(a).map(|c| Value::Int((c.norm_sqr() == 0.0) as i64))
}

/// `a'` conjugates a complex scalar.
pub fn ctranspose(a: &Value) -> Option<Value> {
    match a {
        Value::Complex(c) => Some(Value::Complex(c.conj())),
        _ => None,
    }
}

/// `a.'` leaves a scalar untouched.
pub fn transpose(a: &Value) -> Option<Value> {
    match a {
        Value::Complex(c) => Some(Value::Complex(*c)),
        _ => None,
    }
}

pub fn horzcat(args: &[&Value]) -> Option<Value> {
    let mut data = Vec::with_capacity(args.len());
    for arg in args {
        data.push(lift_element(arg)?);
    }
    Some(Value::ComplexVector(data))
}

pub fn vertcat(args: &[&Value]) -> Option<Value> {
    horzcat(args)
}

fn lift_element(v: &Value) -> Option<Complex64> {
    if matches!(v.kind(), ValueKind::Complex | ValueKind::Int | ValueKind::Float) {
        lift(v)
    } else {
        None
    }
}
