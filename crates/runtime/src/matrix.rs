//! Real matrix kernels.

use matte_core::error;
use matte_core::except::ids;
use matte_core::value::{Matrix, Value};

fn as_matrix(v: &Value) -> Option<&Matrix> {
    match v {
        Value::Matrix(m) => Some(m),
        _ => None,
    }
}

fn zip(a: &Value, b: &Value, op: fn(f64, f64) -> f64) -> Option<Value> {
    if let (Value::Matrix(m), Some(s)) = (a, b.as_scalar()) {
        let data = m.data.iter().map(|v| op(*v, s)).collect();
        return Some(Value::Matrix(Matrix { rows: m.rows, cols: m.cols, data }));
    }
    if let (Some(s), Value::Matrix(m)) = (a.as_scalar(), b) {
        let data = m.data.iter().map(|v| op(s, *v)).collect();
        return Some(Value::Matrix(Matrix { rows: m.rows, cols: m.cols, data }));
    }

    let (ma, mb) = (as_matrix(a)?, as_matrix(b)?);
    if ma.rows != mb.rows || ma.cols != mb.cols {
        error!(ids::SIZE_MISMATCH, "operand sizes do not match");
        return None;
    }
    let data = ma.data.iter().zip(&mb.data).map(|(x, y)| op(*x, *y)).collect();
    Some(Value::Matrix(Matrix { rows: ma.rows, cols: ma.cols, data }))
}

pub fn truth(a: &Value) -> bool {
    match a {
        Value::Matrix(m) => !m.data.is_empty() && m.data.iter().all(|v| *v != 0.0),
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
    as_matrix(a).map(|m| {
        Value::Matrix(Matrix {
            rows: m.rows,
            cols: m.cols,
            data: m.data.iter().map(|v| -v).collect(),
        })
    })
}

pub fn times(a: &Value, b: &Value) -> Option<Value> {
    zip(a, b, |x, y| x * y)
}

/// Matrix product; scalar operands scale.
pub fn mtimes(a: &Value, b: &Value) -> Option<Value> {
    if a.as_scalar().is_some() || b.as_scalar().is_some() {
        return zip(a, b, |x, y| x * y);
    }

    let (ma, mb) = (as_matrix(a)?, as_matrix(b)?);
    if ma.cols != mb.rows {
        error!(ids::SIZE_MISMATCH, "operand sizes do not match");
        return None;
    }
    let mut out = Matrix::zeros(ma.rows, mb.cols);
    for i in 0..ma.rows {
        for j in 0..mb.cols {
            let mut acc = 0.0;
            for k in 0..ma.cols {
                acc += ma.get(i, k) * mb.get(k, j);
            }
            out.set(i, j, acc);
        }
    }
    Some(Value::Matrix(out))
}

pub fn eq(a: &Value, b: &Value) -> Option<Value> {
    zip(a, b, |x, y| (x == y) as i64 as f64)
}

pub fn ne(a: &Value, b: &Value) -> Option<Value> {
    zip(a, b, |x, y| (x != y) as i64 as f64)
}

pub fn transpose(a: &Value) -> Option<Value> {
    let m = as_matrix(a)?;
    let mut out = Matrix::zeros(m.cols, m.rows);
    for i in 0..m.rows {
        for j in 0..m.cols {
            out.set(j, i, m.get(i, j));
        }
    }
    Some(Value::Matrix(out))
}

/// Side-by-side concatenation; row counts must agree.
pub fn horzcat(args: &[&Value]) -> Option<Value> {
    let mats: Vec<&Matrix> = args.iter().map(|a| as_matrix(a)).collect::<Option<_>>()?;
    let rows = mats.first().map_or(0, |m| m.rows);
    if mats.iter().any(|m| m.rows != rows) {
        error!(ids::SIZE_MISMATCH, "operand sizes do not match");
        return None;
    }
    let cols = mats.iter().map(|m| m.cols).sum();
    let mut out = Matrix::zeros(rows, cols);
    let mut at = 0;
    for m in mats {
        for j in 0..m.cols {
            for i in 0..rows {
                out.set(i, at + j, m.get(i, j));
            }
        }
        at += m.cols;
    }
    Some(Value::Matrix(out))
}

/// Stacked concatenation; column counts must agree.
pub fn vertcat(args: &[&Value]) -> Option<Value> {
    let mats: Vec<&Matrix> = args.iter().map(|a| as_matrix(a)).collect::<Option<_>>()?;
    let cols = mats.first().map_or(0, |m| m.cols);
    if mats.iter().any(|m| m.cols != cols) {
        error!(ids::SIZE_MISMATCH, "operand sizes do not match");
        return None;
    }
    let rows = mats.iter().map(|m| m.rows).sum();
    let mut out = Matrix::zeros(rows, cols);
    let mut at = 0;
    for m in mats {
        for i in 0..m.rows {
            for j in 0..cols {
                out.set(at + i, j, m.get(i, j));
            }
        }
        at += m.rows;
    }
    Some(Value::Matrix(out))
}
