//! Core error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Pack not found: {path}")]
    PackNotFound { path: String },

    #[error("Invalid Pack.yaml: {message}")]
    InvalidPack { message: String },

    #[error("Failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid version: {0}")]
    InvalidVersion(#[from] semver::Error),

    /// A `-f`/`--set*` input could not be turned into values
    #[error("Failed to parse --{flag} '{input}': {message}")]
    ValueParse {
        flag: String,
        input: String,
        message: String,
    },

    #[error("Invalid key path '{path}': {message}")]
    InvalidKeyPath { path: String, message: String },

    #[error("Invalid schema: {message}")]
    InvalidSchema { message: String },

    #[error("Values do not match schema: {}", format_validation_errors(.errors))]
    SchemaValidation { errors: Vec<ValidationErrorInfo> },

    #[error("Archive error: {message}")]
    Archive { message: String },
}

pub type Result<T> = std::result::Result<T, CoreError>;

/// A single schema violation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationErrorInfo {
    /// JSON pointer of the offending value, `(root)` for the document itself
    pub path: String,
    pub message: String,
}

fn format_validation_errors(errors: &[ValidationErrorInfo]) -> String {
    errors
        .iter()
        .map(|e| format!("{}: {}", e.path, e.message))
        .collect::<Vec<_>>()
        .join("; ")
}
