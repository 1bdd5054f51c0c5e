//! Complex matrix kernels: the element-wise additive surface plus the
//! transposes.

use matte_core::error;
use matte_core::except::ids;
use matte_core::value::{ComplexMatrix, Value};
use num_complex::Complex64;

fn as_cmatrix(v: &Value) -> Option<&ComplexMatrix> {
    match v {
        Value::ComplexMatrix(m) => Some(m),
        _ => None,
    }
}

fn zip(a: &Value, b: &Value, op: fn(Complex64, Complex64) -> Complex64) -> Option<Value> {
    let (ma, mb) = (as_cmatrix(a)?, as_cmatrix(b)?);
    if ma.rows != mb.rows || ma.cols != mb.cols {
        error!(ids::SIZE_MISMATCH, "operand sizes do not match");
        return None;
    }
    Some(Value::ComplexMatrix(ComplexMatrix {
        rows: ma.rows,
        cols: ma.cols,
        data: ma.data.iter().zip(&mb.data).map(|(x, y)| op(*x, *y)).collect(),
    }))
}

pub fn plus(a: &Value, b: &Value) -> Option<Value> {
    zip(a, b, |x, y| x + y)
}

pub fn minus(a: &Value, b: &Value) -> Option<Value> {
    zip(a, b, |x, y| x - y)
}

pub fn uminus(a: &Value) -> Option<Value> {
    as_cmatrix(a).map(|m| {
        Value::ComplexMatrix(ComplexMatrix {
            rows: m.rows,
            cols: m.cols,
            data: m.data.iter().map(|v| -v).collect(),
        })
    })
}

fn transpose_with(a: &Value, map: fn(Complex64) -> Complex64) -> Option<Value> {
    let m = as_cmatrix(a)?;
    let mut out = ComplexMatrix::zeros(m.cols, m.rows);
    for i in 0..m.rows {
        for j in 0..m.cols {
            out.data[i * m.cols + j] = map(m.data[j * m.rows + i]);
        }
    }
    Some(Value::ComplexMatrix(out))
}

pub fn transpose(a: &Value) -> Option<Value> {
    transpose_with(a, |v| v)
}

pub fn ctranspose(a: &Value) -> Option<Value> {
    transpose_with(a, |v| v.conj())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plus_is_elementwise() {
        let a = Value::ComplexMatrix(ComplexMatrix {
            rows: 1,
            cols: 2,
            data: vec![Complex64::new(1.0, 0.0), Complex64::new(0.0, 1.0)],
        });
        let out = plus(&a, &a).unwrap();
        match out {
            Value::ComplexMatrix(m) => {
                assert_eq!(m.data[1], Complex64::new(0.0, 2.0));
            }
            other => panic!("expected complex matrix, got {other:?}"),
        }
    }

    #[test]
    fn ctranspose_conjugates() {
        let a = Value::ComplexMatrix(ComplexMatrix {
            rows: 1,
            cols: 1,
            data: vec![Complex64::new(2.0, 3.0)],
        });
        match ctranspose(&a).unwrap() {
            Value::ComplexMatrix(m) => assert_eq!(m.data[0], Complex64::new(2.0, -3.0)),
            other => panic!("expected complex matrix, got {other:?}"),
        }
    }
}
