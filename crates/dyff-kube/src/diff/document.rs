//! Loading multi-document YAML input files

use serde::Deserialize;
use serde_yaml::Value;
use std::fmt;
use std::path::Path;

use crate::error::DiffError;

/// Kubernetes identity of a document
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceId {
    pub api_version: String,
    pub kind: String,
    pub namespace: Option<String>,
    pub name: String,
}

impl ResourceId {
    /// Identity of a document carrying `kind` and `metadata.name`
    pub fn of(value: &Value) -> Option<Self> {
        let kind = value.get("kind")?.as_str()?;
        let metadata = value.get("metadata")?;
        let name = metadata.get("name")?.as_str()?;

        Some(Self {
            api_version: value
                .get("apiVersion")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            kind: kind.to_string(),
            namespace: metadata
                .get("namespace")
                .and_then(Value::as_str)
                .map(str::to_string),
            name: name.to_string(),
        })
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.api_version.is_empty() {
            write!(f, "{}/", self.api_version)?;
        }
        write!(f, "{}/", self.kind)?;
        if let Some(ns) = &self.namespace {
            write!(f, "{}/", ns)?;
        }
        write!(f, "{}", self.name)
    }
}

/// One YAML document of an input file
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// Position among the non-empty documents of the file
    pub index: usize,
    pub id: Option<ResourceId>,
    pub value: Value,
}

impl Document {
    /// Label used in reports: the resource identity, else the position
    pub fn label(&self) -> String {
        match &self.id {
            Some(id) => id.to_string(),
            None => format!("document #{}", self.index),
        }
    }
}

/// A parsed input file
#[derive(Debug, Clone, PartialEq)]
pub struct InputFile {
    pub location: String,
    pub documents: Vec<Document>,
}

/// Read and parse a multi-document YAML file
pub fn load_documents(path: &Path) -> Result<InputFile, DiffError> {
    let location = path.display().to_string();
    let content = std::fs::read_to_string(path).map_err(|source| DiffError::Read {
        file: location.clone(),
        source,
    })?;
    parse_documents(location, &content)
}

/// Parse multi-document YAML
///
/// Empty and comment-only documents are dropped.
pub fn parse_documents(location: impl Into<String>, content: &str) -> Result<InputFile, DiffError> {
    let location = location.into();
    let mut documents = Vec::new();

    for (raw_index, de) in serde_yaml::Deserializer::from_str(content).enumerate() {
        let value = Value::deserialize(de).map_err(|e| DiffError::Parse {
            file: location.clone(),
            index: raw_index,
            message: e.to_string(),
        })?;

        if value.is_null() {
            continue;
        }

        documents.push(Document {
            index: documents.len(),
            id: ResourceId::of(&value),
            value,
        });
    }

    Ok(InputFile {
        location,
        documents,
    })
}
