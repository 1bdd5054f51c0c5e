//! Range kernels.
//!
//! Ranges stay symbolic under the operations that preserve the
//! begin/step/end form (shifts, negation); anything else expands to a
//! vector or refuses.

use matte_core::value::{Matrix, Range, Value};

fn as_range(v: &Value) -> Option<Range> {
    match v {
        Value::Range(r) => Some(*r),
        _ => None,
    }
}

/// Expand to concrete elements.
fn elements(r: Range) -> Vec<f64> {
    r.iter().map(|v| v as f64).collect()
}

pub fn truth(a: &Value) -> bool {
    match a {
        Value::Range(r) => !r.is_empty() && r.iter().all(|v| v != 0),
        _ => false,
    }
}

/// A range shifted by an integer is still a range.
pub fn plus(a: &Value, b: &Value) -> Option<Value> {
    match (a, b) {
        (Value::Range(r), Value::Int(n)) | (Value::Int(n), Value::Range(r)) => {
            Some(Value::Range(Range::new(r.begin + n, r.step, r.end + n)))
        }
        _ => None,
    }
}

pub fn minus(a: &Value, b: &Value) -> Option<Value> {
    match (a, b) {
        (Value::Range(r), Value::Int(n)) => {
            Some(Value::Range(Range::new(r.begin - n, r.step, r.end - n)))
        }
        (Value::Int(n), Value::Range(r)) => {
            Some(Value::Range(Range::new(n - r.begin, -r.step, n - r.end)))
        }
        _ => None,
    }
}

pub fn uminus(a: &Value) -> Option<Value> {
    as_range(a).map(|r| Value::Range(Range::new(-r.begin, -r.step, -r.end)))
}

pub fn eq(a: &Value, b: &Value) -> Option<Value> {
    match (as_range(a), as_range(b)) {
        (Some(a), Some(b)) => Some(Value::Int((a == b) as i64)),
        _ => None,
    }
}

pub fn ne(a: &Value, b: &Value) -> Option<Value> {
    match eq(a, b) {
        Some(Value::Int(v)) => Some(Value::Int((v == 0) as i64)),
        _ => None,
    }
}

/// `r'` materializes the range as a column.
pub fn transpose(a: &Value) -> Option<Value> {
    as_range(a).map(|r| {
        let data = elements(r);
        Value::Matrix(Matrix { rows: data.len(), cols: 1, data })
    })
}

pub fn horzcat(args: &[&Value]) -> Option<Value> {
    let mut data = Vec::new();
    for arg in args {
        match arg {
            Value::Range(r) => data.extend(elements(*r)),
            other => data.push(other.as_scalar()?),
        }
    }
    Some(Value::Vector(data))
}

pub fn vertcat(args: &[&Value]) -> Option<Value> {
    let data = match horzcat(args)? {
        Value::Vector(data) => data,
        _ => return None,
    };
    Some(Value::Matrix(Matrix { rows: data.len(), cols: 1, data }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn r(begin: i64, step: i64, end: i64) -> Value {
        Value::Range(Range::new(begin, step, end))
    }

    #[test]
    fn shifts_preserve_the_range_form() {
        let out = plus(&r(1, 1, 3), &Value::Int(10)).unwrap();
        assert!(matches!(out, Value::Range(v) if v == Range::new(11, 1, 13)));

        let out = minus(&r(1, 1, 3), &Value::Int(1)).unwrap();
        assert!(matches!(out, Value::Range(v) if v == Range::new(0, 1, 2)));
    }

    #[test]
    fn truth_requires_nonempty_and_all_nonzero() {
        assert!(truth(&r(1, 1, 3)));
        assert!(!truth(&r(0, 1, 3)));
        assert!(!truth(&r(3, 1, 1)));
    }

    #[test]
    fn concatenation_expands_elements() {
        let a = r(1, 1, 3);
        let b = Value::Int(9);
        let out = horzcat(&[&a, &b]).unwrap();
        assert!(matches!(out, Value::Vector(v) if v == vec![1.0, 2.0, 3.0, 9.0]));
    }

    #[test]
    fn row_in_brackets_keeps_range_element_semantics() {
        // [1:3] parses as ROW(colon); the row survives simplification and
        // concatenates here into a vector of the expanded elements.
        let a = r(1, 1, 3);
        let out = horzcat(&[&a]).unwrap();
        assert!(matches!(out, Value::Vector(v) if v == vec![1.0, 2.0, 3.0]));
    }
}
