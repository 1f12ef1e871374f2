//! Schema validation for values
//!
//! Packs may ship a JSON Schema (`values.schema.json`, or the same document
//! written as YAML) that the rendered values must satisfy.

use serde_json::Value as JsonValue;
use std::path::Path;

use crate::error::{CoreError, Result, ValidationErrorInfo};
use crate::values::Values;

/// A JSON Schema document
#[derive(Debug, Clone, PartialEq)]
pub struct Schema(pub JsonValue);

impl Schema {
    /// Load schema from a `.json`, `.yaml` or `.yml` file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;

        if path.extension().is_some_and(|e| e == "json") {
            return Self::from_json(&content);
        }
        Ok(Self(serde_yaml::from_str(&content)?))
    }

    /// Load from JSON Schema string
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(Self(serde_json::from_str(json)?))
    }

    /// Defaults declared through `default` keywords, nested along `properties`
    pub fn extract_defaults(&self) -> JsonValue {
        extract_defaults_recursive(&self.0)
    }

    /// Get defaults as Values
    pub fn defaults_as_values(&self) -> Values {
        match self.extract_defaults() {
            JsonValue::Null => Values::new(),
            other => Values(other),
        }
    }
}

fn extract_defaults_recursive(schema: &JsonValue) -> JsonValue {
    let Some(obj) = schema.as_object() else {
        return JsonValue::Null;
    };

    if let Some(default) = obj.get("default") {
        return default.clone();
    }

    if let Some(props) = obj.get("properties").and_then(|p| p.as_object()) {
        let mut defaults = serde_json::Map::new();

        for (key, prop_schema) in props {
            let prop_default = extract_defaults_recursive(prop_schema);
            if !prop_default.is_null() {
                defaults.insert(key.clone(), prop_default);
            }
        }

        if !defaults.is_empty() {
            return JsonValue::Object(defaults);
        }
    }

    JsonValue::Null
}

/// Result of schema validation
#[derive(Debug)]
pub struct ValidationResult {
    /// Whether the values are valid
    pub is_valid: bool,
    /// Validation errors
    pub errors: Vec<ValidationErrorInfo>,
}

impl ValidationResult {
    pub fn success() -> Self {
        Self {
            is_valid: true,
            errors: vec![],
        }
    }

    pub fn failure(errors: Vec<ValidationErrorInfo>) -> Self {
        Self {
            is_valid: false,
            errors,
        }
    }

    /// Turn a failed validation into an error
    pub fn into_result(self) -> Result<()> {
        if self.is_valid {
            Ok(())
        } else {
            Err(CoreError::SchemaValidation {
                errors: self.errors,
            })
        }
    }
}

/// Schema validator with cached compiled schema
pub struct SchemaValidator {
    schema: Schema,
    compiled: jsonschema::Validator,
}

impl SchemaValidator {
    /// Compile a schema
    pub fn new(schema: Schema) -> Result<Self> {
        let compiled = jsonschema::validator_for(&schema.0).map_err(|e| CoreError::InvalidSchema {
            message: e.to_string(),
        })?;

        Ok(Self { schema, compiled })
    }

    /// Validate values against the schema
    pub fn validate(&self, values: &JsonValue) -> ValidationResult {
        if self.compiled.is_valid(values) {
            return ValidationResult::success();
        }

        let errors: Vec<ValidationErrorInfo> = self
            .compiled
            .iter_errors(values)
            .map(|e| {
                let path = e.instance_path.to_string();
                ValidationErrorInfo {
                    path: if path.is_empty() {
                        "(root)".to_string()
                    } else {
                        path
                    },
                    message: e.to_string().replace('"', "'"),
                }
            })
            .collect();

        ValidationResult::failure(errors)
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const SCHEMA: &str = r#"{
        "$schema": "http://json-schema.org/draft-07/schema#",
        "type": "object",
        "properties": {
            "replicaCount": { "type": "integer", "minimum": 0, "default": 1 },
            "image": {
                "type": "object",
                "properties": {
                    "tag": { "type": "string", "default": "latest" }
                }
            }
        }
    }"#;

    #[test]
    fn test_extract_defaults() {
        let schema = Schema::from_json(SCHEMA).unwrap();

        assert_eq!(
            schema.extract_defaults(),
            json!({"replicaCount": 1, "image": {"tag": "latest"}})
        );
    }

    #[test]
    fn test_no_defaults_gives_empty_values() {
        let schema = Schema::from_json(r#"{"type": "object"}"#).unwrap();
        assert!(schema.defaults_as_values().is_empty());
    }

    #[test]
    fn test_validation_success() {
        let validator = SchemaValidator::new(Schema::from_json(SCHEMA).unwrap()).unwrap();

        let result = validator.validate(&json!({"replicaCount": 5}));
        assert!(result.is_valid);
        assert!(result.errors.is_empty());
    }

    #[test]
    fn test_validation_failure() {
        let validator = SchemaValidator::new(Schema::from_json(SCHEMA).unwrap()).unwrap();

        let result = validator.validate(&json!({"replicaCount": "many"}));
        assert!(!result.is_valid);
        assert_eq!(result.errors[0].path, "/replicaCount");

        let err = result.into_result().unwrap_err();
        assert!(matches!(err, CoreError::SchemaValidation { .. }));
    }

    #[test]
    fn test_invalid_schema() {
        let schema = Schema(json!({"type": 12}));
        assert!(matches!(
            SchemaValidator::new(schema),
            Err(CoreError::InvalidSchema { .. })
        ));
    }

    #[test]
    fn test_yaml_schema_file() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("values.schema.yaml");
        std::fs::write(&path, "type: object\nrequired: [name]\n").unwrap();

        let validator = SchemaValidator::new(Schema::from_file(&path).unwrap()).unwrap();
        assert!(!validator.validate(&json!({})).is_valid);
        assert!(validator.validate(&json!({"name": "x"})).is_valid);
    }
}
