//! Complex vector kernels. Only the element-wise surface the dispatch
//! layer needs; everything else refuses.

use matte_core::error;
use matte_core::except::ids;
use matte_core::value::{ComplexMatrix, Value};
use num_complex::Complex64;

fn lift(v: &Value) -> Option<Vec<Complex64>> {
    match v {
        Value::ComplexVector(data) => Some(data.clone()),
        Value::Vector(data) => Some(data.iter().map(|v| Complex64::new(*v, 0.0)).collect()),
        Value::Complex(c) => Some(vec![*c]),
        other => other.as_scalar().map(|s| vec![Complex64::new(s, 0.0)]),
    }
}

fn zip(a: &Value, b: &Value, op: fn(Complex64, Complex64) -> Complex64) -> Option<Value> {
    let scalar = |v: &Value| match v {
        Value::Complex(c) => Some(*c),
        other => other.as_scalar().map(|s| Complex64::new(s, 0.0)),
    };

    if let (Value::ComplexVector(data), Some(s)) = (a, scalar(b)) {
        return Some(Value::ComplexVector(data.iter().map(|v| op(*v, s)).collect()));
    }
    if let (Some(s), Value::ComplexVector(data)) = (scalar(a), b) {
        return Some(Value::ComplexVector(data.iter().map(|v| op(s, *v)).collect()));
    }

    let (xa, xb) = (lift(a)?, lift(b)?);
    if xa.len() != xb.len() {
        error!(ids::SIZE_MISMATCH, "operand sizes do not match");
        return None;
    }
    Some(Value::ComplexVector(xa.iter().zip(&xb).map(|(x, y)| op(*x, *y)).collect()))
}

pub fn truth(a: &Value) -> bool {
    match a {
        Value::ComplexVector(data) => {
            !data.is_empty() && data.iter().all(|v| v.norm_sqr() != 0.0)
        }
        _ => false,
    }
}

pub fn plus(a: &Value, b: &Value) -> Option<Value> {
    zip(a, b, |x, y| x + y)
}

pub fn minus(a: &Value, b: &Value) -> Option<Value> {
    zip(a, b, |x, y| x - y)
}

pub fn uminus(a: &Value) -> Option<Value> {
    match a {
        Value::ComplexVector(data) => {
            Some(Value::ComplexVector(data.iter().map(|v| -v).collect()))
        }
        _ => None,
    }
}

pub fn eq(a: &Value, b: &Value) -> Option<Value> {
    let (xa, xb) = (lift(a)?, lift(b)?);
    if xa.len() != xb.len() {
        error!(ids::SIZE_MISMATCH, "operand sizes do not match");
        return None;
    }
    Some(Value::Vector(
        xa.iter().zip(&xb).map(|(x, y)| (x == y) as i64 as f64).collect(),
    ))
}

pub fn ne(a: &Value, b: &Value) -> Option<Value> {
    match eq(a, b) {
        Some(Value::Vector(data)) => {
            Some(Value::Vector(data.iter().map(|v| (*v == 0.0) as i64 as f64).collect()))
        }
        _ => None,
    }
}

/// `v'` conjugate-transposes into a column.
pub fn ctranspose(a: &Value) -> Option<Value> {
    match a {
        Value::ComplexVector(data) => Some(Value::ComplexMatrix(ComplexMatrix {
            rows: data.len(),
            cols: 1,
            data: data.iter().map(|v| v.conj()).collect(),
        })),
        _ => None,
    }
}

pub fn transpose(a: &Value) -> Option<Value> {
    match a {
        Value::ComplexVector(data) => Some(Value::ComplexMatrix(ComplexMatrix {
            rows: data.len(),
            cols: 1,
            data: data.clone(),
        })),
        _ => None,
    }
}

pub fn horzcat(args: &[&Value]) -> Option<Value> {
    let mut data = Vec::new();
    for arg in args {
        data.extend(lift(arg)?);
    }
    Some(Value::ComplexVector(data))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mixing_real_and_complex_vectors_lifts() {
        let a = Value::ComplexVector(vec![Complex64::new(1.0, 1.0)]);
        let b = Value::Vector(vec![2.0]);
        let out = plus(&a, &b).unwrap();
        match out {
            Value::ComplexVector(v) => assert_eq!(v, vec![Complex64::new(3.0, 1.0)]),
            other => panic!("expected complex vector, got {other:?}"),
        }
    }

    #[test]
    fn ctranspose_conjugates_into_a_column() {
        let a = Value::ComplexVector(vec![Complex64::new(1.0, 2.0)]);
        match ctranspose(&a).unwrap() {
            Value::ComplexMatrix(m) => {
                assert_eq!((m.rows, m.cols), (1, 1));
                assert_eq!(m.data[0], Complex64::new(1.0, -2.0));
            }
            other => panic!("expected complex matrix, got {other:?}"),
        }
    }
}
