//! CLI error types with exit code handling
//!
//! Every pipeline failure is folded into one `CliError` that renders through
//! miette and knows which exit code it maps to.

use dyff_core::CoreError;
use dyff_engine::EngineError;
use dyff_kube::{ChartError, DiffError, KubeError, PreviewError, RenderError};
use miette::Diagnostic;
use thiserror::Error;

use crate::exit_codes;

/// CLI-specific error type that includes exit code information
#[derive(Error, Debug, Diagnostic, Clone)]
pub enum CliError {
    /// Value sources or schema validation failed
    #[error("Invalid values: {message}")]
    #[diagnostic(code(sherpack_dyff::cli::values))]
    Values {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// Template rendering failed
    #[error("Template error: {message}")]
    #[diagnostic(code(sherpack_dyff::cli::template))]
    Template {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// Chart lookup or loading failed
    #[error("Chart error: {message}")]
    #[diagnostic(code(sherpack_dyff::cli::chart))]
    Chart {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// The installed release could not be fetched
    #[error("{message}")]
    #[diagnostic(code(sherpack_dyff::cli::release))]
    Release {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// IO error (staging, reading staged files, writing the report)
    #[error("IO error: {message}")]
    #[diagnostic(code(sherpack_dyff::cli::io))]
    Io { message: String },

    /// Invalid invocation
    #[error("{message}")]
    #[diagnostic(code(sherpack_dyff::cli::usage))]
    Usage { message: String },

    #[error("{message}")]
    #[diagnostic(code(sherpack_dyff::cli::error))]
    Other { message: String },
}

impl CliError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Values { .. } => exit_codes::VALIDATION_ERROR,
            CliError::Template { .. } => exit_codes::TEMPLATE_ERROR,
            CliError::Chart { .. } => exit_codes::PACK_ERROR,
            CliError::Release { .. } => exit_codes::RELEASE_ERROR,
            CliError::Io { .. } => exit_codes::IO_ERROR,
            CliError::Usage { .. } => exit_codes::USAGE_ERROR,
            CliError::Other { .. } => exit_codes::ERROR,
        }
    }

    fn values(err: &CoreError) -> Self {
        let help = match err {
            CoreError::SchemaValidation { .. } => {
                Some("Check the overrides against the chart's values.schema.json".to_string())
            }
            CoreError::ValueParse { .. } => {
                Some("Use --set-string or --set-literal to pass the value verbatim".to_string())
            }
            _ => None,
        };
        Self::Values {
            message: err.to_string(),
            help,
        }
    }

    fn chart(err: &ChartError) -> Self {
        let help = match err {
            ChartError::NotFound { searched, .. } if searched.is_empty() => {
                Some("Pass a chart path or add a local repository with --repository".to_string())
            }
            ChartError::VersionNotFound { .. } => {
                Some("Pick one of the available versions with --version".to_string())
            }
            _ => None,
        };
        Self::Chart {
            message: err.to_string(),
            help,
        }
    }
}

impl From<KubeError> for CliError {
    fn from(err: KubeError) -> Self {
        let help = err.is_not_found().then(|| {
            "Check the release name and select its namespace with --namespace or SHERPACK_NAMESPACE"
                .to_string()
        });
        CliError::Release {
            message: err.to_string(),
            help,
        }
    }
}

impl From<RenderError> for CliError {
    fn from(err: RenderError) -> Self {
        match err {
            RenderError::Values(core) => CliError::values(&core),
            RenderError::Engine(EngineError::Template(template)) => CliError::Template {
                message: template.to_string(),
                help: template.suggestion,
            },
            RenderError::Engine(EngineError::Pack(core)) => CliError::Chart {
                message: core.to_string(),
                help: None,
            },
            RenderError::Engine(EngineError::Io(io)) => CliError::Io {
                message: io.to_string(),
            },
        }
    }
}

impl From<PreviewError> for CliError {
    fn from(err: PreviewError) -> Self {
        match err {
            PreviewError::Configuration(message) => CliError::Usage { message },
            PreviewError::Release(kube) => kube.into(),
            PreviewError::Values(core) => CliError::values(&core),
            PreviewError::ChartResolution(chart) => CliError::chart(&chart),
            PreviewError::Render(render) => render.into(),
            PreviewError::Staging(_)
            | PreviewError::ReportWrite(_)
            | PreviewError::Diff(DiffError::Read { .. }) => CliError::Io {
                message: err.to_string(),
            },
            PreviewError::Diff(diff) => CliError::Other {
                message: diff.to_string(),
            },
        }
    }
}

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;
