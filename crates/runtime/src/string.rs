//! String kernels. Strings are not numeric: they support equality,
//! concatenation, and nothing else.

use matte_core::value::Value;

fn both<'a>(a: &'a Value, b: &'a Value) -> Option<(&'a str, &'a str)> {
    match (a, b) {
        (Value::Str(a), Value::Str(b)) => Some((a, b)),
        _ => None,
    }
}

pub fn plus(a: &Value, b: &Value) -> Option<Value> {
    both(a, b).map(|(a, b)| Value::Str(format!("{a}{b}")))
}

pub fn eq(a: &Value, b: &Value) -> Option<Value> {
    both(a, b).map(|(a, b)| Value::Int((a == b) as i64))
}

pub fn ne(a: &Value, b: &Value) -> Option<Value> {
    both(a, b).map(|(a, b)| Value::Int((a != b) as i64))
}

pub fn horzcat(args: &[&Value]) -> Option<Value> {
    let mut out = String::new();
    for arg in args {
        match arg {
            Value::Str(s) => out.push_str(s),
            _ => return None,
        }
    }
    Some(Value::Str(out))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality_compares_contents() {
        let a = Value::Str("abc".into());
        let b = Value::Str("abc".into());
        let c = Value::Str("abd".into());
        assert!(matches!(eq(&a, &b), Some(Value::Int(1))));
        assert!(matches!(eq(&a, &c), Some(Value::Int(0))));
        assert!(matches!(ne(&a, &c), Some(Value::Int(1))));
    }

    #[test]
    fn horzcat_concatenates() {
        let a = Value::Str("foo".into());
        let b = Value::Str("bar".into());
        assert!(matches!(horzcat(&[&a, &b]), Some(Value::Str(s)) if s == "foobar"));
    }

    #[test]
    fn mixing_with_numbers_is_refused() {
        let a = Value::Str("foo".into());
        assert!(horzcat(&[&a, &Value::Int(1)]).is_none());
    }
}
