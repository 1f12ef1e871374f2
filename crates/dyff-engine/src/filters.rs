//! Kubernetes-oriented template filters

use base64::Engine as _;
use minijinja::{Error, ErrorKind, Value};

fn invalid(message: impl Into<String>) -> Error {
    Error::new(ErrorKind::InvalidOperation, message.into())
}

/// Convert a value to YAML
///
/// Usage: {{ values.config | toyaml }}
pub fn toyaml(value: Value) -> Result<String, Error> {
    let json_value: serde_json::Value =
        serde_json::to_value(&value).map_err(|e| invalid(e.to_string()))?;

    let yaml = serde_yaml::to_string(&json_value).map_err(|e| invalid(e.to_string()))?;

    Ok(yaml.trim_start_matches("---\n").trim_end().to_string())
}

/// Convert a value to compact JSON
///
/// Usage: {{ values.config | tojson }}
pub fn tojson(value: Value) -> Result<String, Error> {
    let json_value: serde_json::Value =
        serde_json::to_value(&value).map_err(|e| invalid(e.to_string()))?;

    serde_json::to_string(&json_value).map_err(|e| invalid(e.to_string()))
}

/// Usage: {{ secret | b64encode }}
#[must_use]
pub fn b64encode(value: String) -> String {
    base64::engine::general_purpose::STANDARD.encode(value.as_bytes())
}

/// Usage: {{ encoded | b64decode }}
pub fn b64decode(value: String) -> Result<String, Error> {
    let decoded = base64::engine::general_purpose::STANDARD
        .decode(value.as_bytes())
        .map_err(|e| invalid(format!("base64 decode error: {}", e)))?;

    String::from_utf8(decoded).map_err(|e| invalid(format!("UTF-8 decode error: {}", e)))
}

fn as_text(value: &Value) -> String {
    value
        .as_str()
        .map(str::to_string)
        .unwrap_or_else(|| value.to_string())
}

/// Wrap in double quotes, escaping backslashes and quotes
#[must_use]
pub fn quote(value: Value) -> String {
    let s = as_text(&value);
    format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\""))
}

/// Wrap in single quotes, YAML style
#[must_use]
pub fn squote(value: Value) -> String {
    format!("'{}'", as_text(&value).replace('\'', "''"))
}

/// Newline followed by the indented text (Helm's `nindent`)
///
/// Usage: {{ content | nindent(4) }}
#[must_use]
pub fn nindent(value: String, spaces: usize) -> String {
    format!("\n{}", indent(value, spaces))
}

/// Indent every non-empty line
///
/// Usage: {{ content | indent(4) }}
#[must_use]
pub fn indent(value: String, spaces: usize) -> String {
    let pad = " ".repeat(spaces);

    value
        .lines()
        .map(|line| {
            if line.is_empty() {
                String::new()
            } else {
                format!("{}{}", pad, line)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Fail rendering when the value is undefined, null or an empty string
///
/// Usage: {{ values.host | required("host is required") }}
pub fn required(value: Value, message: Option<String>) -> Result<Value, Error> {
    let missing = value.is_undefined()
        || value.is_none()
        || value.as_str().map(str::is_empty).unwrap_or(false);

    if missing {
        Err(invalid(
            message.unwrap_or_else(|| "required value is missing".to_string()),
        ))
    } else {
        Ok(value)
    }
}

/// Usage: {% if values.list | empty %}
pub fn empty(value: Value) -> bool {
    if value.is_undefined() || value.is_none() {
        return true;
    }

    match value.len() {
        Some(len) => len == 0,
        None => value.as_str().map(str::is_empty).unwrap_or(false),
    }
}

/// Hex SHA-256 digest, typically for checksum annotations
///
/// Usage: {{ values.config | tojson | sha256 }}
pub fn sha256sum(value: String) -> String {
    use sha2::{Digest, Sha256};

    let mut hasher = Sha256::new();
    hasher.update(value.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Truncate to at most `length` characters
///
/// Usage: {{ name | trunc(63) }}
pub fn trunc(value: String, length: usize) -> String {
    value.chars().take(length).collect()
}

/// Usage: {{ tag | trimprefix("v") }}
pub fn trimprefix(value: String, prefix: String) -> String {
    value.strip_prefix(&prefix).unwrap_or(&value).to_string()
}

/// Usage: {{ name | trimsuffix("-") }}
pub fn trimsuffix(value: String, suffix: String) -> String {
    value.strip_suffix(&suffix).unwrap_or(&value).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toyaml() {
        let value = Value::from_serialize(serde_json::json!({"a": 1, "b": ["x"]}));
        assert_eq!(toyaml(value).unwrap(), "a: 1\nb:\n- x");
    }

    #[test]
    fn test_nindent() {
        assert_eq!(nindent("a: 1\n\nb: 2".to_string(), 2), "\n  a: 1\n\n  b: 2");
    }

    #[test]
    fn test_indent() {
        assert_eq!(indent("a\nb".to_string(), 4), "    a\n    b");
    }

    #[test]
    fn test_quote() {
        assert_eq!(quote(Value::from("say \"hi\"")), r#""say \"hi\"""#);
        assert_eq!(quote(Value::from(8080)), "\"8080\"");
        assert_eq!(squote(Value::from("it's")), "'it''s'");
    }

    #[test]
    fn test_b64_roundtrip_and_error() {
        assert_eq!(b64encode("admin".to_string()), "YWRtaW4=");
        assert!(b64decode("!!!".to_string()).is_err());
    }

    #[test]
    fn test_required() {
        assert!(required(Value::UNDEFINED, None).is_err());
        assert!(required(Value::from(""), Some("host is required".into())).is_err());
        assert!(required(Value::from("x"), None).is_ok());
    }

    #[test]
    fn test_empty() {
        assert!(empty(Value::from(Vec::<Value>::new())));
        assert!(empty(Value::from("")));
        assert!(!empty(Value::from(0)));
    }

    #[test]
    fn test_trunc_and_trim() {
        assert_eq!(trunc("abcdef".to_string(), 3), "abc");
        assert_eq!(trimprefix("v1.2".to_string(), "v".to_string()), "1.2");
        assert_eq!(trimsuffix("name-".to_string(), "-".to_string()), "name");
    }

    #[test]
    fn test_sha256() {
        assert_eq!(
            sha256sum(String::new()),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }
}
