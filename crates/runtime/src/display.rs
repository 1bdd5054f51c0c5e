//! Value rendering and the user-observable display operation.
//!
//! `display` is what the emitted code invokes after any statement whose
//! display flag is set: scalars print as `label = value`, arrays print a
//! dump under the label, and temporaries arrive here labelled `ans`.

use matte_core::value::Value;
use num_complex::Complex64;

use crate::dispatch::type_info;

fn fmt_f64(v: f64) -> String {
    if v == v.trunc() && v.abs() < 1e15 {
        format!("{}", v as i64)
    } else {
        format!("{v}")
    }
}

fn fmt_complex(c: Complex64) -> String {
    if c.im < 0.0 {
        format!("{} - {}i", fmt_f64(c.re), fmt_f64(-c.im))
    } else {
        format!("{} + {}i", fmt_f64(c.re), fmt_f64(c.im))
    }
}

/// Bare rendering of a value, without any label.
pub fn render(v: &Value) -> String {
    match v {
        Value::Empty => "[]".to_string(),
        Value::Int(i) => format!("{i}"),
        Value::Float(f) => fmt_f64(*f),
        Value::Complex(c) => fmt_complex(*c),
        Value::Range(r) => format!("{} : {} : {}", r.begin, r.step, r.end),
        Value::Str(s) => format!("'{s}'"),
        Value::Vector(data) => {
            let cells: Vec<String> = data.iter().map(|v| fmt_f64(*v)).collect();
            format!("   {}", cells.join("   "))
        }
        Value::Matrix(m) => {
            let mut out = String::new();
            for i in 0..m.rows {
                let row: Vec<String> = (0..m.cols).map(|j| fmt_f64(m.get(i, j))).collect();
                out.push_str(&format!("   {}\n", row.join("   ")));
            }
            out.pop();
            out
        }
        Value::ComplexVector(data) => {
            let cells: Vec<String> = data.iter().map(|v| fmt_complex(*v)).collect();
            format!("   {}", cells.join("   "))
        }
        Value::ComplexMatrix(m) => {
            let mut out = String::new();
            for i in 0..m.rows {
                let row: Vec<String> =
                    (0..m.cols).map(|j| fmt_complex(m.data[j * m.rows + i])).collect();
                out.push_str(&format!("   {}\n", row.join("   ")));
            }
            out.pop();
            out
        }
        Value::Exception(e) => e.to_string(),
        Value::Cell(_) | Value::Record(_) | Value::List(_) | Value::Iterator(_) => {
            format!("<{}>", v.type_name())
        }
    }
}

/// Display slot for scalar-shaped kinds: `label = value`.
pub fn disp_scalar(v: &Value, label: &str) -> String {
    format!("{label} = {}", render(v))
}

/// Display slot for array kinds: label line, blank line, element dump.
pub fn disp_array(v: &Value, label: &str) -> String {
    format!("{label} =\n\n{}", render(v))
}

/// Display slot for the empty value.
pub fn disp_empty(_v: &Value, label: &str) -> String {
    format!("{label} = []")
}

/// Exceptions ignore the label: the rendering is the full red/bold dump.
pub fn disp_exception(v: &Value, _label: &str) -> String {
    render(v)
}

/// Labelled display through the type descriptor's display slot; `None`
/// means the type has no display and the caller must raise.
pub fn display(v: &Value, label: &str) -> Option<String> {
    type_info(v.kind()).disp.map(|slot| slot(v, label))
}

/// Truth test through the type descriptor; `None` means the type has no
/// truth slot.
pub fn truth(v: &Value) -> Option<bool> {
    type_info(v.kind()).truth.map(|slot| slot(v))
}

#[cfg(test)]
mod tests {
    use super::*;
    use matte_core::value::{Matrix, Range};

    #[test]
    fn scalars_display_with_a_label() {
        assert_eq!(display(&Value::Int(6), "s").unwrap(), "s = 6");
        assert_eq!(display(&Value::Float(2.5), "x").unwrap(), "x = 2.5");
        assert_eq!(display(&Value::Str("hi".into()), "msg").unwrap(), "msg = 'hi'");
        assert_eq!(
            display(&Value::Range(Range::new(1, 1, 10)), "r").unwrap(),
            "r = 1 : 1 : 10"
        );
    }

    #[test]
    fn temporaries_use_whatever_label_the_caller_passes() {
        assert_eq!(display(&Value::Int(3), "ans").unwrap(), "ans = 3");
    }

    #[test]
    fn arrays_dump_elements() {
        let text = display(&Value::Vector(vec![1.0, 2.0, 3.0]), "v").unwrap();
        assert!(text.starts_with("v =\n"));
        assert!(text.contains("1   2   3"));

        let m = Value::Matrix(Matrix { rows: 2, cols: 2, data: vec![1.0, 3.0, 2.0, 4.0] });
        let text = display(&m, "m").unwrap();
        assert!(text.contains("1   2"));
        assert!(text.contains("3   4"));
    }

    #[test]
    fn undisplayable_kinds_return_none() {
        assert!(display(&Value::List(Default::default()), "x").is_none());
    }

    #[test]
    fn truth_follows_the_descriptor() {
        assert_eq!(truth(&Value::Int(1)), Some(true));
        assert_eq!(truth(&Value::Int(0)), Some(false));
        assert_eq!(truth(&Value::Vector(vec![1.0, 1.0])), Some(true));
        assert_eq!(truth(&Value::Vector(vec![1.0, 0.0])), Some(false));
        assert_eq!(truth(&Value::Str("x".into())), None);
    }
}
