//! Real vector kernels.
//!
//! Element-wise operations accept a vector paired with any real scalar
//! (broadcast) or another vector of the same length; mismatched lengths
//! raise `matte:size-mismatch`.

use matte_core::error;
use matte_core::except::ids;
use matte_core::value::{Matrix, Value};

/// Lift a value to vector elements: vectors pass through, scalars and
/// ranges broadcast/expand. Returns `None` for anything else.
fn elements(v: &Value) -> Option<Vec<f64>> {
    match v {
        Value::Vector(data) => Some(data.clone()),
        Value::Range(r) => Some(r.iter().map(|v| v as f64).collect()),
        other => other.as_scalar().map(|s| vec![s]),
    }
}

fn zip(a: &Value, b: &Value, op: fn(f64, f64) -> f64) -> Option<Value> {
    // Scalar operands broadcast across the vector side.
    if let (Value::Vector(data), Some(s)) = (a, b.as_scalar()) {
        return Some(Value::Vector(data.iter().map(|v| op(*v, s)).collect()));
    }
    if let (Some(s), Value::Vector(data)) = (a.as_scalar(), b) {
        return Some(Value::Vector(data.iter().map(|v| op(s, *v)).collect()));
    }

    let (xa, xb) = (elements(a)?, elements(b)?);
    if xa.len() != xb.len() {
        error!(ids::SIZE_MISMATCH, "operand sizes do not match");
        return None;
    }
    Some(Value::Vector(xa.iter().zip(&xb).map(|(x, y)| op(*x, *y)).collect()))
}

pub fn truth(a: &Value) -> bool {
    match a {
        Value::Vector(data) => !data.is_empty() && data.iter().all(|v| *v != 0.0),
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
        Value::Vector(data) => Some(Value::Vector(data.iter().map(|v| -v).collect())),
        _ => None,
    }
}

pub fn times(a: &Value, b: &Value) -> Option<Value> {
    zip(a, b, |x, y| x * y)
}

pub fn rdivide(a: &Value, b: &Value) -> Option<Value> {
    zip(a, b, |x, y| x / y)
}

/// `a * b` with a scalar operand scales; vector by vector has no
/// unambiguous orientation here and is refused.
pub fn mtimes(a: &Value, b: &Value) -> Option<Value> {
    match (a, b) {
        (Value::Vector(data), s) | (s, Value::Vector(data)) => {
            let s = s.as_scalar()?;
            Some(Value::Vector(data.iter().map(|v| v * s).collect()))
        }
        _ => None,
    }
}

macro_rules! vec_cmp {
    ($name:ident, $op:tt) => {
        pub fn $name(a: &Value, b: &Value) -> Option<Value> {
            zip(a, b, |x, y| (x $op y) as i64 as f64)
        }
    };
}

vec_cmp!(lt, <);
vec_cmp!(gt, >);
vec_cmp!(le, <=);
vec_cmp!(ge, >=);
vec_cmp!(ne, !=);
vec_cmp!(eq, ==);

/// `v'` turns a row vector into a column matrix.
pub fn transpose(a: &Value) -> Option<Value> {
    match a {
        Value::Vector(data) => {
            Some(Value::Matrix(Matrix { rows: data.len(), cols: 1, data: data.clone() }))
        }
        _ => None,
    }
}

pub fn horzcat(args: &[&Value]) -> Option<Value> {
    let mut data = Vec::new();
    for arg in args {
        data.extend(elements(arg)?);
    }
    Some(Value::Vector(data))
}

/// Stacking equal-length rows produces a matrix.
pub fn vertcat(args: &[&Value]) -> Option<Value> {
    let rows: Vec<Vec<f64>> = args.iter().map(|a| elements(a)).collect::<Option<_>>()?;
    let cols = rows.first().map_or(0, Vec::len);
    if rows.iter().any(|r| r.len() != cols) {
        error!(ids::SIZE_MISMATCH, "operand sizes do not match");
        return None;
    }
    let mut m = Matrix::zeros(rows.len(), cols);
    for (i, row) in rows.iter().enumerate() {
        for (j, v) in row.iter().enumerate() {
            m.set(i, j, *v);
        }
    }
    Some(Value::Matrix(m))
}

#[cfg(test)]
mod tests {
    use super::*;
    use matte_core::except;
    use matte_core::value::Range;

    fn v(data: &[f64]) -> Value {
        Value::Vector(data.to_vec())
    }

    #[test]
    fn elementwise_with_matching_lengths() {
        let out = plus(&v(&[1.0, 2.0]), &v(&[10.0, 20.0])).unwrap();
        assert!(matches!(out, Value::Vector(x) if x == vec![11.0, 22.0]));
    }

    #[test]
    fn scalars_broadcast() {
        let out = times(&v(&[1.0, 2.0, 3.0]), &Value::Int(2)).unwrap();
        assert!(matches!(out, Value::Vector(x) if x == vec![2.0, 4.0, 6.0]));
    }

    #[test]
    fn length_mismatch_reports_size_mismatch() {
        except::clear();
        assert!(plus(&v(&[1.0]), &v(&[1.0, 2.0])).is_none());
        let e = except::take().unwrap();
        assert_eq!(e.id, ids::SIZE_MISMATCH);
    }

    #[test]
    fn comparison_is_elementwise() {
        let out = eq(&v(&[1.0, 2.0, 2.0]), &v(&[1.0, 0.0, 2.0])).unwrap();
        assert!(matches!(out, Value::Vector(x) if x == vec![1.0, 0.0, 1.0]));
    }

    #[test]
    fn truth_requires_every_element_nonzero() {
        assert!(truth(&v(&[1.0, 2.0])));
        assert!(!truth(&v(&[1.0, 0.0])));
        assert!(!truth(&v(&[])));
    }

    #[test]
    fn vertcat_stacks_rows_into_a_matrix() {
        let out = vertcat(&[&v(&[1.0, 2.0]), &v(&[3.0, 4.0])]).unwrap();
        match out {
            Value::Matrix(m) => {
                assert_eq!((m.rows, m.cols), (2, 2));
                assert_eq!(m.get(0, 1), 2.0);
                assert_eq!(m.get(1, 0), 3.0);
            }
            other => panic!("expected matrix, got {other:?}"),
        }
    }

    #[test]
    fn ranges_expand_when_mixed_in() {
        let r = Value::Range(Range::new(1, 1, 3));
        let out = horzcat(&[&r, &v(&[9.0])]).unwrap();
        assert!(matches!(out, Value::Vector(x) if x == vec![1.0, 2.0, 3.0, 9.0]));
    }
}
