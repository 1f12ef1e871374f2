//! Values handling with deep merge support

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;
use std::path::Path;

use crate::error::{CoreError, Result};

/// Largest list index accepted in a key path such as `servers[3].port`
pub const MAX_INDEX: usize = 65536;

/// Values container with deep merge capability
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Values(pub JsonValue);

impl Values {
    /// Create empty values
    pub fn new() -> Self {
        Self(JsonValue::Object(serde_json::Map::new()))
    }

    /// Load values from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&content)
    }

    /// Parse values from YAML string
    ///
    /// An empty document, or one holding only comments or `null`, yields
    /// empty values.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        if yaml.trim().is_empty() {
            return Ok(Self::new());
        }
        match serde_yaml::from_str(yaml)? {
            JsonValue::Null => Ok(Self::new()),
            value => Ok(Self(value)),
        }
    }

    /// Deep merge another Values into this one
    ///
    /// Rules:
    /// - Scalars: overlay replaces base
    /// - Objects: recursive merge
    /// - Arrays: overlay replaces base (not appended)
    /// - A null overlay leaves the base untouched
    pub fn merge(&mut self, overlay: &Values) {
        if overlay.0.is_null() {
            return;
        }
        deep_merge(&mut self.0, &overlay.0);
    }

    /// Set a value by an already parsed key path
    ///
    /// Intermediate objects and lists are created as needed. Lists are padded
    /// with nulls up to the requested index.
    pub fn set_path(&mut self, path: &[PathSegment], value: JsonValue) {
        set_nested(&mut self.0, path, value);
    }

    /// Get a value by key path
    pub fn get(&self, path: &str) -> Option<&JsonValue> {
        let segments = parse_key_path(path).ok()?;
        get_nested(&self.0, &segments)
    }

    /// Get the inner JSON value
    pub fn inner(&self) -> &JsonValue {
        &self.0
    }

    /// Convert to JSON value
    pub fn into_inner(self) -> JsonValue {
        self.0
    }

    /// Check if values are empty
    pub fn is_empty(&self) -> bool {
        match &self.0 {
            JsonValue::Object(map) => map.is_empty(),
            JsonValue::Null => true,
            _ => false,
        }
    }
}

/// One step of a key path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    /// Mapping key
    Key(String),
    /// List position
    Index(usize),
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Key(key) => write!(f, "{}", key),
            Self::Index(index) => write!(f, "[{}]", index),
        }
    }
}

/// Parse a key path such as `a.b`, `list[0].name` or `annotations.app\.io/name`
///
/// A backslash escapes the next character, so `\.` is a literal dot inside a key.
pub fn parse_key_path(path: &str) -> Result<Vec<PathSegment>> {
    let invalid = |message: String| CoreError::InvalidKeyPath {
        path: path.to_string(),
        message,
    };

    let mut segments = Vec::new();
    let mut current = String::new();
    let mut after_index = false;
    let mut chars = path.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                let escaped = chars
                    .next()
                    .ok_or_else(|| invalid("ends with an escape character".to_string()))?;
                current.push(escaped);
                after_index = false;
            }
            '.' => {
                if !current.is_empty() {
                    segments.push(PathSegment::Key(std::mem::take(&mut current)));
                } else if !after_index {
                    return Err(invalid("empty key segment".to_string()));
                }
                after_index = false;
            }
            '[' => {
                if !current.is_empty() {
                    segments.push(PathSegment::Key(std::mem::take(&mut current)));
                } else if segments.is_empty() {
                    return Err(invalid("list index without a key".to_string()));
                }

                let mut digits = String::new();
                loop {
                    match chars.next() {
                        Some(']') => break,
                        Some(d) if d.is_ascii_digit() => digits.push(d),
                        Some(other) => {
                            return Err(invalid(format!(
                                "invalid character '{}' in list index",
                                other
                            )));
                        }
                        None => return Err(invalid("unterminated list index".to_string())),
                    }
                }

                let index: usize = digits
                    .parse()
                    .map_err(|_| invalid("empty list index".to_string()))?;
                if index > MAX_INDEX {
                    return Err(invalid(format!(
                        "list index {} exceeds the maximum of {}",
                        index, MAX_INDEX
                    )));
                }
                segments.push(PathSegment::Index(index));
                after_index = true;

                match chars.peek() {
                    None | Some('.') | Some('[') => {}
                    Some(other) => {
                        return Err(invalid(format!("unexpected '{}' after list index", other)));
                    }
                }
            }
            other => {
                current.push(other);
                after_index = false;
            }
        }
    }

    if !current.is_empty() {
        segments.push(PathSegment::Key(current));
    } else if !after_index {
        return Err(invalid("empty key segment".to_string()));
    }

    Ok(segments)
}

/// Deep merge two JSON values
fn deep_merge(base: &mut JsonValue, overlay: &JsonValue) {
    match (base, overlay) {
        (JsonValue::Object(base_map), JsonValue::Object(overlay_map)) => {
            for (key, overlay_value) in overlay_map {
                match base_map.get_mut(key) {
                    Some(base_value) => deep_merge(base_value, overlay_value),
                    None => {
                        base_map.insert(key.clone(), overlay_value.clone());
                    }
                }
            }
        }
        (base, overlay) => {
            *base = overlay.clone();
        }
    }
}

/// Set a nested value by path
fn set_nested(target: &mut JsonValue, path: &[PathSegment], new_value: JsonValue) {
    let Some((head, rest)) = path.split_first() else {
        *target = new_value;
        return;
    };

    match head {
        PathSegment::Key(key) => {
            if !target.is_object() {
                *target = JsonValue::Object(serde_json::Map::new());
            }
            if let JsonValue::Object(map) = target {
                let entry = map.entry(key.clone()).or_insert(JsonValue::Null);
                set_nested(entry, rest, new_value);
            }
        }
        PathSegment::Index(index) => {
            if !target.is_array() {
                *target = JsonValue::Array(Vec::new());
            }
            if let JsonValue::Array(items) = target {
                if items.len() <= *index {
                    items.resize(*index + 1, JsonValue::Null);
                }
                set_nested(&mut items[*index], rest, new_value);
            }
        }
    }
}

/// Get a nested value by path
fn get_nested<'a>(value: &'a JsonValue, path: &[PathSegment]) -> Option<&'a JsonValue> {
    let Some((head, rest)) = path.split_first() else {
        return Some(value);
    };

    let child = match (head, value) {
        (PathSegment::Key(key), JsonValue::Object(map)) => map.get(key),
        (PathSegment::Index(index), JsonValue::Array(items)) => items.get(*index),
        _ => None,
    }?;

    get_nested(child, rest)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deep_merge() {
        let mut base = Values::from_yaml(
            r#"
image:
  repository: nginx
  tag: "1.0"
replicas: 1
"#,
        )
        .unwrap();

        let overlay = Values::from_yaml(
            r#"
image:
  tag: "2.0"
  pullPolicy: Always
replicas: 3
"#,
        )
        .unwrap();

        base.merge(&overlay);

        assert_eq!(base.get("image.repository").unwrap(), "nginx");
        assert_eq!(base.get("image.tag").unwrap(), "2.0");
        assert_eq!(base.get("image.pullPolicy").unwrap(), "Always");
        assert_eq!(base.get("replicas").unwrap(), 3);
    }

    #[test]
    fn test_merge_replaces_lists() {
        let mut base = Values::from_yaml("ports: [80, 443]").unwrap();
        let overlay = Values::from_yaml("ports: [8080]").unwrap();

        base.merge(&overlay);

        assert_eq!(base.get("ports").unwrap(), &serde_json::json!([8080]));
    }

    #[test]
    fn test_set_nested() {
        let mut values = Values::new();
        values.set_path(&parse_key_path("image.tag").unwrap(), JsonValue::String("v1".into()));
        values.set_path(&parse_key_path("replicas").unwrap(), JsonValue::Number(3.into()));

        assert_eq!(values.get("image.tag").unwrap(), "v1");
        assert_eq!(values.get("replicas").unwrap(), 3);
    }

    #[test]
    fn test_set_list_index_pads_with_null() {
        let mut values = Values::new();
        values.set_path(&parse_key_path("servers[2].port").unwrap(), JsonValue::from(80));

        assert_eq!(
            values.inner(),
            &serde_json::json!({"servers": [null, null, {"port": 80}]})
        );
        assert_eq!(values.get("servers[2].port").unwrap(), 80);
    }

    #[test]
    fn test_parse_key_path_escaped_dot() {
        let path = parse_key_path(r"annotations.app\.kubernetes\.io/name").unwrap();

        assert_eq!(
            path,
            vec![
                PathSegment::Key("annotations".into()),
                PathSegment::Key("app.kubernetes.io/name".into()),
            ]
        );
    }

    #[test]
    fn test_parse_key_path_nested_indices() {
        let path = parse_key_path("matrix[1][0]").unwrap();

        assert_eq!(
            path,
            vec![
                PathSegment::Key("matrix".into()),
                PathSegment::Index(1),
                PathSegment::Index(0),
            ]
        );
    }

    #[test]
    fn test_parse_key_path_rejects_malformed() {
        assert!(parse_key_path("").is_err());
        assert!(parse_key_path("a..b").is_err());
        assert!(parse_key_path("a.").is_err());
        assert!(parse_key_path("[0]").is_err());
        assert!(parse_key_path("a[x]").is_err());
        assert!(parse_key_path("a[1").is_err());
        assert!(parse_key_path("a[0]b").is_err());
        assert!(parse_key_path("a[65537]").is_err());
    }

    #[test]
    fn test_empty_yaml_is_empty_values() {
        assert!(Values::from_yaml("").unwrap().is_empty());
        assert!(Values::from_yaml("   \n").unwrap().is_empty());
        assert!(Values::default().is_empty());
        assert!(!Values::from_yaml("a: 1").unwrap().is_empty());
    }

    #[test]
    fn test_comment_only_yaml_is_empty_values() {
        let values = Values::from_yaml("# overrides go here\n").unwrap();
        assert_eq!(values, Values::new());
        assert_eq!(Values::from_yaml("~").unwrap(), Values::new());
        assert_eq!(Values::from_yaml("null\n").unwrap(), Values::new());
    }

    #[test]
    fn test_merge_null_overlay_keeps_base() {
        let mut base = Values::from_yaml("replicaCount: 5").unwrap();
        base.merge(&Values::default());

        assert_eq!(base.get("replicaCount").unwrap(), 5);
    }
}
