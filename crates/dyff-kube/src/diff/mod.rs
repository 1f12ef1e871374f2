//! Structural diff of manifests
//!
//! Manifests are compared as YAML documents rather than text: documents are
//! matched by Kubernetes identity, mappings by key and lists of named
//! entries by name, so reformatting and reordering produce no noise.

mod compare;
mod document;
mod human;

pub use compare::{
    CompareOptions, Detail, DetailKind, Diff, DiffPath, DiffReport, PathElement, compare,
};
pub use document::{Document, InputFile, ResourceId, load_documents, parse_documents};
pub use human::HumanReport;

use std::io::Write;
use tracing::debug;

use crate::error::DiffError;
use crate::stage::StagedDocumentPair;

/// Loads a staged pair and compares it, ignoring order changes
#[derive(Debug, Clone, Copy)]
pub struct DiffInvoker {
    options: CompareOptions,
}

impl Default for DiffInvoker {
    fn default() -> Self {
        Self {
            options: CompareOptions {
                ignore_order_changes: true,
            },
        }
    }
}

impl DiffInvoker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn invoke(&self, staged: &StagedDocumentPair) -> Result<DiffReport, DiffError> {
        let from = load_documents(staged.source_path())?;
        let to = load_documents(staged.target_path())?;
        debug!(
            from = from.documents.len(),
            to = to.documents.len(),
            "loaded staged documents"
        );

        Ok(compare(&from, &to, self.options))
    }
}

/// Report settings used by the preview
#[derive(Debug, Clone, Copy)]
pub struct ReportEmitter {
    pub indent: usize,
    pub omit_header: bool,
    pub color: bool,
}

impl Default for ReportEmitter {
    fn default() -> Self {
        Self {
            indent: 2,
            omit_header: true,
            color: false,
        }
    }
}

impl ReportEmitter {
    pub fn emit<W: Write>(&self, report: &DiffReport, out: &mut W) -> std::io::Result<()> {
        HumanReport::new(report)
            .indent(self.indent)
            .omit_header(self.omit_header)
            .color(self.color)
            .write_report(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stage::ManifestStager;

    #[test]
    fn test_invoke_ignores_order() {
        let tmp = tempfile::TempDir::new().unwrap();
        let staged = ManifestStager::in_dir(tmp.path())
            .stage("kind: A\nmetadata:\n  name: a\nitems: [1, 2]\n", "kind: A\nmetadata:\n  name: a\nitems: [2, 1]\n")
            .unwrap();

        let report = DiffInvoker::new().invoke(&staged).unwrap();
        assert!(report.is_empty());
        assert_eq!(report.from_location, staged.source_path().display().to_string());
    }

    #[test]
    fn test_invoke_parse_error() {
        let tmp = tempfile::TempDir::new().unwrap();
        let staged = ManifestStager::in_dir(tmp.path())
            .stage("a: 1\n", "a: [\n")
            .unwrap();

        let err = DiffInvoker::new().invoke(&staged).unwrap_err();
        assert!(matches!(err, DiffError::Parse { .. }));
    }

    #[test]
    fn test_emitter_defaults_omit_header() {
        let report = DiffReport {
            from_location: "a".to_string(),
            to_location: "b".to_string(),
            diffs: Vec::new(),
        };
        let mut out = Vec::new();
        ReportEmitter::default().emit(&report, &mut out).unwrap();
        assert!(out.is_empty());
    }
}
