//! Engine error types

use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

use crate::suggestions::{suggest_undefined_variable, suggest_unknown_filter, suggest_unknown_function};

/// Main engine error type
#[derive(Error, Debug)]
pub enum EngineError {
    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error(transparent)]
    Pack(#[from] dyff_core::CoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, EngineError>;

/// Category of a template error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum TemplateErrorKind {
    UndefinedVariable,
    UnknownFilter,
    UnknownFunction,
    SyntaxError,
    TypeError,
    InvalidOperation,
    Other,
}

/// Template-specific error with source information
#[derive(Error, Debug, Diagnostic, Clone)]
#[error("{template}: {message}")]
#[diagnostic(code(sherpack_dyff::template::render))]
pub struct TemplateError {
    pub message: String,

    pub kind: TemplateErrorKind,

    /// Template path relative to `templates/`
    pub template: String,

    #[source_code]
    pub src: NamedSource<String>,

    #[label("error occurred here")]
    pub span: Option<SourceSpan>,

    #[help]
    pub suggestion: Option<String>,
}

impl TemplateError {
    /// Build from a MiniJinja error
    ///
    /// `values` enables key suggestions for undefined `values.*` lookups.
    pub fn from_minijinja(
        err: minijinja::Error,
        template_name: &str,
        template_source: &str,
        values: Option<&serde_json::Value>,
    ) -> Self {
        let kind = categorize(&err);
        let message = err
            .detail()
            .map(str::to_string)
            .unwrap_or_else(|| err.kind().to_string());
        let span = err
            .line()
            .and_then(|line| calculate_span(template_source, line));
        let suggestion = generate_suggestion(&err, kind, values);

        Self {
            message,
            kind,
            template: template_name.to_string(),
            src: NamedSource::new(template_name, template_source.to_string()),
            span,
            suggestion,
        }
    }

    pub fn kind(&self) -> TemplateErrorKind {
        self.kind
    }
}

fn categorize(err: &minijinja::Error) -> TemplateErrorKind {
    match err.kind() {
        minijinja::ErrorKind::UndefinedError => TemplateErrorKind::UndefinedVariable,
        minijinja::ErrorKind::UnknownFilter => TemplateErrorKind::UnknownFilter,
        minijinja::ErrorKind::UnknownFunction => TemplateErrorKind::UnknownFunction,
        minijinja::ErrorKind::SyntaxError => TemplateErrorKind::SyntaxError,
        minijinja::ErrorKind::InvalidOperation => TemplateErrorKind::InvalidOperation,
        minijinja::ErrorKind::NonPrimitive | minijinja::ErrorKind::NonKey => {
            TemplateErrorKind::TypeError
        }
        _ => TemplateErrorKind::Other,
    }
}

/// Span covering the whole of a 1-based line
fn calculate_span(source: &str, line_num: usize) -> Option<SourceSpan> {
    let mut offset = 0;

    for (index, line) in source.lines().enumerate() {
        if index + 1 == line_num {
            return Some(SourceSpan::new(offset.into(), line.len()));
        }
        offset += line.len() + 1;
    }

    None
}

/// The `{{ ... }}` expression on the line MiniJinja marks with `>`
fn failing_expression(err: &minijinja::Error) -> Option<String> {
    let detailed = format!("{:#}", err);

    detailed
        .lines()
        .filter(|line| line.trim_start().contains(" > ") || line.trim_start().starts_with("> "))
        .find_map(|line| {
            let start = line.find("{{")?;
            let end = line[start..].find("}}")?;
            let expr = line[start + 2..start + end].trim();
            Some(expr.to_string())
        })
}

fn generate_suggestion(
    err: &minijinja::Error,
    kind: TemplateErrorKind,
    values: Option<&serde_json::Value>,
) -> Option<String> {
    match kind {
        TemplateErrorKind::UndefinedVariable => {
            let expr = failing_expression(err)?;
            let variable = expr.split('|').next().unwrap_or(&expr).trim();
            suggest_undefined_variable(variable, values)
        }
        TemplateErrorKind::UnknownFilter => {
            let expr = failing_expression(err)?;
            let filter = expr.rsplit('|').next()?.split_whitespace().next()?;
            let filter = filter.split('(').next().unwrap_or(filter);
            suggest_unknown_filter(filter)
        }
        TemplateErrorKind::UnknownFunction => {
            let expr = failing_expression(err)?;
            let function = expr.split('(').next()?.trim();
            suggest_unknown_function(function)
        }
        TemplateErrorKind::SyntaxError => Some(
            "Check bracket matching: `{{ }}` for expressions, `{% %}` for statements".to_string(),
        ),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_calculate_span() {
        let source = "line one\nline two\nline three";

        let span = calculate_span(source, 2).unwrap();
        assert_eq!(span.offset(), 9);
        assert_eq!(span.len(), 8);

        assert!(calculate_span(source, 4).is_none());
    }

    #[test]
    fn test_syntax_error_has_help() {
        let mut env = minijinja::Environment::new();
        let err = env
            .add_template("broken.yaml", "value: {{ values.x ")
            .unwrap_err();

        let template_error = TemplateError::from_minijinja(err, "broken.yaml", "value: {{ values.x ", None);

        assert_eq!(template_error.kind(), TemplateErrorKind::SyntaxError);
        assert!(template_error.suggestion.is_some());
        assert!(template_error.to_string().starts_with("broken.yaml: "));
    }
}
