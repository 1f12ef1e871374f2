//! Global functions available in templates

use minijinja::{Error, ErrorKind, Value};

fn invalid(message: impl Into<String>) -> Error {
    Error::new(ErrorKind::InvalidOperation, message.into())
}

/// Abort rendering with a message
///
/// Usage: {{ fail("ingress.host must be set") }}
pub fn fail(message: String) -> Result<Value, Error> {
    Err(invalid(message))
}

/// Build a mapping from alternating keys and values
///
/// Usage: {{ dict("app", release.name, "tier", "web") }}
pub fn dict(args: Vec<Value>) -> Result<Value, Error> {
    if args.len() % 2 != 0 {
        return Err(invalid(
            "dict requires an even number of arguments (key-value pairs)",
        ));
    }

    let mut map = serde_json::Map::new();
    for pair in args.chunks(2) {
        let key = pair[0]
            .as_str()
            .ok_or_else(|| invalid("dict keys must be strings"))?;
        let value = serde_json::to_value(&pair[1]).map_err(|e| invalid(e.to_string()))?;
        map.insert(key.to_string(), value);
    }

    Ok(Value::from_serialize(serde_json::Value::Object(map)))
}

/// Usage: {{ list("a", "b") }}
pub fn list(args: Vec<Value>) -> Value {
    Value::from(args)
}

/// Attribute lookup with a fallback
///
/// Usage: {{ get(values.labels, "team", "platform") }}
pub fn get(obj: Value, key: String, default: Option<Value>) -> Value {
    match obj.get_attr(&key) {
        Ok(v) if !v.is_undefined() => v,
        _ => default.unwrap_or(Value::UNDEFINED),
    }
}

/// First argument that is neither undefined, null nor an empty string
pub fn coalesce(args: Vec<Value>) -> Value {
    args.into_iter()
        .find(|arg| {
            !arg.is_undefined() && !arg.is_none() && arg.as_str().map(|s| !s.is_empty()).unwrap_or(true)
        })
        .unwrap_or(Value::UNDEFINED)
}

/// Usage: {{ ternary("yes", "no", values.enabled) }}
pub fn ternary(true_val: Value, false_val: Value, condition: Value) -> Value {
    if condition.is_true() {
        true_val
    } else {
        false_val
    }
}

pub fn tostring(value: Value) -> String {
    value
        .as_str()
        .map(str::to_string)
        .unwrap_or_else(|| value.to_string())
}

pub fn toint(value: Value) -> Result<i64, Error> {
    if let Some(n) = value.as_i64() {
        return Ok(n);
    }
    match value.as_str() {
        Some(s) => s
            .trim()
            .parse::<i64>()
            .map_err(|_| invalid(format!("cannot convert '{}' to int", s))),
        None => Err(invalid(format!("cannot convert {} to int", value))),
    }
}

/// Printf-style formatting with `%s`, `%d`, `%v` and `%%`
///
/// Usage: {{ printf("%s-%s", release.name, pack.name) }}
pub fn printf(format: String, args: Vec<Value>) -> Result<String, Error> {
    let mut result = String::with_capacity(format.len());
    let mut chars = format.chars();
    let mut args = args.iter();

    while let Some(c) = chars.next() {
        if c != '%' {
            result.push(c);
            continue;
        }

        match chars.next() {
            None => result.push('%'),
            Some('%') => result.push('%'),
            Some(_) => {
                let arg = args
                    .next()
                    .ok_or_else(|| invalid("not enough arguments for format string"))?;
                result.push_str(&tostring(arg.clone()));
            }
        }
    }

    Ok(result)
}
