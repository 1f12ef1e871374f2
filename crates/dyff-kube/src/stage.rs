//! Staging of the two manifests as temporary files

use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::StagingError;

const SOURCE_PREFIX: &str = "dyff-source-";
const TARGET_PREFIX: &str = "dyff-target-";

/// The installed and desired manifests on disk
///
/// Both files are deleted when the pair is dropped.
#[derive(Debug)]
pub struct StagedDocumentPair {
    source: NamedTempFile,
    target: NamedTempFile,
}

impl StagedDocumentPair {
    /// The manifest of the installed release
    pub fn source_path(&self) -> &Path {
        self.source.path()
    }

    /// The manifest the proposed chart would install
    pub fn target_path(&self) -> &Path {
        self.target.path()
    }
}

/// Writes manifests to temporary files
#[derive(Debug, Clone, Default)]
pub struct ManifestStager {
    dir: Option<PathBuf>,
}

impl ManifestStager {
    /// Stage into the system temporary directory
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage into `dir` instead of the system temporary directory
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: Some(dir.into()),
        }
    }

    /// Write both manifests, fully flushed to disk
    ///
    /// If the second file fails, the first one is removed before returning.
    pub fn stage(&self, current: &str, desired: &str) -> Result<StagedDocumentPair, StagingError> {
        let source = self.write(SOURCE_PREFIX, current).map_err(|source| StagingError {
            role: "current",
            source,
        })?;
        let target = self.write(TARGET_PREFIX, desired).map_err(|source| StagingError {
            role: "desired",
            source,
        })?;

        debug!(
            source = %source.path().display(),
            target = %target.path().display(),
            "staged manifests"
        );
        Ok(StagedDocumentPair { source, target })
    }

    fn write(&self, prefix: &str, content: &str) -> std::io::Result<NamedTempFile> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(prefix).suffix(".yaml");

        let mut file = match &self.dir {
            Some(dir) => builder.tempfile_in(dir)?,
            None => builder.tempfile()?,
        };

        file.write_all(content.as_bytes())?;
        file.flush()?;
        file.as_file().sync_all()?;
        Ok(file)
    }
}
