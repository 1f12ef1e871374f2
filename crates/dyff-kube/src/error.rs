//! Error types for dyff-kube

use dyff_core::CoreError;
use dyff_engine::EngineError;
use thiserror::Error;

/// Result type for release storage operations
pub type Result<T> = std::result::Result<T, KubeError>;

/// Errors raised while reading release records
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum KubeError {
    /// Kubernetes API error
    #[error("Kubernetes API error: {0}")]
    Api(#[from] kube::Error),

    #[error("release '{name}' not found in namespace '{namespace}'")]
    ReleaseNotFound { name: String, namespace: String },

    #[error("storage error: {0}")]
    Storage(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("compression error: {0}")]
    Compression(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for KubeError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

impl KubeError {
    /// Check if this is a not found error
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::ReleaseNotFound { .. } => true,
            Self::Api(kube::Error::Api(e)) => e.code == 404,
            _ => false,
        }
    }
}

/// Errors raised while locating and loading the target chart
#[derive(Debug, Error)]
pub enum ChartError {
    #[error("chart '{reference}' not found (searched: {})", .searched.join(", "))]
    NotFound {
        reference: String,
        searched: Vec<String>,
    },

    #[error("chart '{name}' has no version '{version}' (available: {})", .available.join(", "))]
    VersionNotFound {
        name: String,
        version: String,
        available: Vec<String>,
    },

    #[error("invalid chart at {path}: {source}")]
    Invalid {
        path: String,
        #[source]
        source: CoreError,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised by the dry-run render
#[derive(Debug, Error)]
pub enum RenderError {
    /// Chart defaults, schema or merged values are unusable
    #[error(transparent)]
    Values(#[from] CoreError),

    #[error(transparent)]
    Engine(#[from] EngineError),
}

/// A staged manifest could not be written
#[derive(Debug, Error)]
#[error("failed to stage {role} manifest: {source}")]
pub struct StagingError {
    pub role: &'static str,
    #[source]
    pub source: std::io::Error,
}

/// Errors raised while loading or comparing staged documents
#[derive(Debug, Error)]
pub enum DiffError {
    #[error("failed to parse document {index} of {file}: {message}")]
    Parse {
        file: String,
        index: usize,
        message: String,
    },

    #[error("failed to read {file}: {source}")]
    Read {
        file: String,
        #[source]
        source: std::io::Error,
    },
}

/// Everything that can abort an upgrade preview
#[derive(Debug, Error)]
pub enum PreviewError {
    #[error("invalid configuration: {0}")]
    Configuration(String),

    #[error(transparent)]
    Release(#[from] KubeError),

    #[error(transparent)]
    Values(#[from] CoreError),

    #[error(transparent)]
    ChartResolution(#[from] ChartError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error(transparent)]
    Staging(#[from] StagingError),

    #[error(transparent)]
    Diff(#[from] DiffError),

    #[error("failed to write report: {0}")]
    ReportWrite(#[source] std::io::Error),
}
