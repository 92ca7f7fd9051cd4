//! Named built-in transforms, addressable from schema documents.

use crate::processor::{Transform, kind_name};

use anyhow::{anyhow, bail};
use serde_json::{Number, Value};

/// Every name accepted by [`lookup`].
pub const NAMES: &[&str] = &[
    "str", "int", "float", "bool", "trim", "lower", "upper", "not_empty", "first", "group1",
];

/// Resolve a built-in transform by name.
pub fn lookup(name: &str) -> Option<Transform> {
    let transform = match name {
        "str" => Transform::named(name, to_str),
        "int" => Transform::named(name, to_int),
        "float" => Transform::named(name, to_float),
        "bool" => Transform::named(name, |v| Ok(Value::Bool(truthy(v)))),
        "trim" => Transform::named(name, |v| map_str(v, |s| s.trim().to_string()))
            .with_doc("Strip surrounding whitespace"),
        "lower" => Transform::named(name, |v| map_str(v, str::to_lowercase))
            .with_doc("Convert string to lower case"),
        "upper" => Transform::named(name, |v| map_str(v, str::to_uppercase))
            .with_doc("Convert string to upper case"),
        "not_empty" => Transform::named(name, not_empty).with_doc("Reject empty values"),
        "first" => Transform::named(name, |v| nth(v, 0)).with_doc("Take the first element"),
        "group1" => {
            Transform::named(name, |v| nth(v, 1)).with_doc("Take the first pattern group")
        }
        _ => return None,
    };
    Some(transform)
}

fn to_str(value: &Value) -> anyhow::Result<Value> {
    let s = match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        Value::Array(_) | Value::Object(_) => serde_json::to_string(value)?,
    };
    Ok(Value::String(s))
}

fn to_int(value: &Value) -> anyhow::Result<Value> {
    let n = match value {
        Value::Number(n) => match n.as_i64() {
            Some(i) => i,
            None => {
                let f = n
                    .as_f64()
                    .ok_or_else(|| anyhow!("cannot convert {} to integer", n))?;
                if !f.is_finite() || f.abs() >= i64::MAX as f64 {
                    bail!("cannot convert {} to integer", f);
                }
                f.trunc() as i64
            }
        },
        Value::String(s) => s
            .trim()
            .parse::<i64>()
            .map_err(|_| anyhow!("invalid literal for int(): {:?}", s))?,
        Value::Bool(b) => i64::from(*b),
        other => bail!("int() argument must be a string or a number, not {}", kind_name(other)),
    };
    Ok(Value::from(n))
}

fn to_float(value: &Value) -> anyhow::Result<Value> {
    let f = match value {
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| anyhow!("cannot convert {} to float", n))?,
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| anyhow!("could not convert string to float: {:?}", s))?,
        Value::Bool(b) => f64::from(u8::from(*b)),
        other => bail!("float() argument must be a string or a number, not {}", kind_name(other)),
    };
    Number::from_f64(f)
        .map(Value::Number)
        .ok_or_else(|| anyhow!("float value {} is not representable", f))
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

fn map_str(value: &Value, f: impl Fn(&str) -> String) -> anyhow::Result<Value> {
    match value {
        Value::String(s) => Ok(Value::String(f(s))),
        other => bail!("expected string, got {}", kind_name(other)),
    }
}

fn not_empty(value: &Value) -> anyhow::Result<Value> {
    let empty = match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    };
    if empty {
        bail!("value is empty");
    }
    Ok(value.clone())
}

fn nth(value: &Value, index: usize) -> anyhow::Result<Value> {
    match value {
        Value::Array(items) => items
            .get(index)
            .cloned()
            .ok_or_else(|| anyhow!("no element at index {}", index)),
        other => bail!("expected list, got {}", kind_name(other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn run(name: &str, value: Value) -> anyhow::Result<Value> {
        lookup(name).expect("known builtin").call(&value)
    }

    #[test]
    fn every_listed_name_resolves() {
        for name in NAMES {
            assert!(lookup(name).is_some(), "{name} should resolve");
        }
        assert!(lookup("nope").is_none());
    }

    #[test]
    fn int_conversion() {
        assert_eq!(run("int", json!(" 42 ")).unwrap(), json!(42));
        assert_eq!(run("int", json!(3.9)).unwrap(), json!(3));
        assert_eq!(run("int", json!(true)).unwrap(), json!(1));
        assert!(run("int", json!("4x")).is_err());
        assert!(run("int", json!([1])).is_err());
    }

    #[test]
    fn float_and_str_conversion() {
        assert_eq!(run("float", json!("2.5")).unwrap(), json!(2.5));
        assert_eq!(run("str", json!(7)).unwrap(), json!("7"));
        assert_eq!(run("str", json!([1, 2])).unwrap(), json!("[1,2]"));
    }

    #[test]
    fn bool_uses_truthiness() {
        assert_eq!(run("bool", json!("")).unwrap(), json!(false));
        assert_eq!(run("bool", json!([0])).unwrap(), json!(true));
        assert_eq!(run("bool", json!(0)).unwrap(), json!(false));
    }

    #[test]
    fn string_helpers() {
        assert_eq!(run("trim", json!("  a ")).unwrap(), json!("a"));
        assert_eq!(run("upper", json!("ab")).unwrap(), json!("AB"));
        assert!(run("lower", json!(1)).is_err());
    }

    #[test]
    fn not_empty_and_indexing() {
        assert!(run("not_empty", json!("")).is_err());
        assert_eq!(run("not_empty", json!("x")).unwrap(), json!("x"));
        assert_eq!(run("group1", json!(["ab", "b"])).unwrap(), json!("b"));
        assert!(run("first", json!([])).is_err());
    }
}
