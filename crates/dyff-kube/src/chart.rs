//! Target chart resolution and loading
//!
//! The target version is fixed first (explicit override, else the version of
//! the installed release) and then handed to a [`ChartLocator`], which turns
//! the chart reference into a loaded pack.

use dyff_core::LoadedPack;
use dyff_core::archive::{extract_archive, find_pack_root, is_archive};
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, warn};

use crate::error::ChartError;

/// Chart reference plus the version that must be rendered
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartTarget {
    pub reference: String,
    pub version: String,
}

/// Decides which chart version the preview renders
#[derive(Debug, Clone, Copy, Default)]
pub struct ChartResolver;

impl ChartResolver {
    pub fn new() -> Self {
        Self
    }

    /// A non-empty explicit version wins, otherwise the installed chart
    /// version is kept verbatim
    pub fn target(&self, reference: &str, explicit: Option<&str>, current_version: &str) -> ChartTarget {
        let version = explicit
            .filter(|v| !v.is_empty())
            .unwrap_or(current_version)
            .to_string();

        ChartTarget {
            reference: reference.to_string(),
            version,
        }
    }
}

/// A loaded chart, plus the scratch directory it was extracted into
#[derive(Debug)]
pub struct LocatedChart {
    pack: LoadedPack,
    // Archives are unpacked here; dropped together with the pack.
    _scratch: Option<TempDir>,
}

impl LocatedChart {
    pub fn pack(&self) -> &LoadedPack {
        &self.pack
    }
}

/// Turns a [`ChartTarget`] into a loaded chart
pub trait ChartLocator: Send + Sync {
    fn locate(&self, target: &ChartTarget) -> Result<LocatedChart, ChartError>;
}

/// Locates charts on the local filesystem
///
/// A reference naming an existing directory or `.tar.gz` archive is loaded
/// directly. Anything else is looked up by name and exact version in the
/// configured repository directories.
#[derive(Debug, Clone, Default)]
pub struct LocalChartLocator {
    repositories: Vec<PathBuf>,
}

impl LocalChartLocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_repositories(repositories: impl IntoIterator<Item = PathBuf>) -> Self {
        Self {
            repositories: repositories.into_iter().collect(),
        }
    }

    fn search_repositories(&self, target: &ChartTarget) -> Result<LocatedChart, ChartError> {
        let chart_name = target
            .reference
            .rsplit('/')
            .next()
            .unwrap_or(&target.reference);

        let mut candidates = Vec::new();
        for repository in &self.repositories {
            candidates.extend(scan_repository(repository, chart_name)?);
        }

        if candidates.is_empty() {
            return Err(ChartError::NotFound {
                reference: target.reference.clone(),
                searched: self
                    .repositories
                    .iter()
                    .map(|r| r.display().to_string())
                    .collect(),
            });
        }

        if let Some(candidate) = candidates.iter().find(|c| c.version == target.version) {
            debug!(chart = chart_name, version = %candidate.version, path = %candidate.path.display(), "found chart in repository");
            let located = load_local(&candidate.path)?;
            if located.pack.name() != chart_name {
                return Err(ChartError::Invalid {
                    path: candidate.path.display().to_string(),
                    source: dyff_core::CoreError::InvalidPack {
                        message: format!(
                            "expected pack '{}', found '{}'",
                            chart_name,
                            located.pack.name()
                        ),
                    },
                });
            }
            return Ok(located);
        }

        Err(ChartError::VersionNotFound {
            name: chart_name.to_string(),
            version: target.version.clone(),
            available: sorted_versions(&candidates),
        })
    }
}

impl ChartLocator for LocalChartLocator {
    fn locate(&self, target: &ChartTarget) -> Result<LocatedChart, ChartError> {
        let path = Path::new(&target.reference);

        if path.is_dir() || (path.is_file() && is_archive(path)) {
            let located = load_local(path)?;
            let found = located.pack.version().to_string();
            if found != target.version {
                warn!(
                    chart = %path.display(),
                    requested = %target.version,
                    found = %found,
                    "local chart path ignores the requested version"
                );
            }
            return Ok(located);
        }

        self.search_repositories(target)
    }
}

/// A chart version available in a repository directory
struct Candidate {
    version: String,
    path: PathBuf,
}

fn scan_repository(repository: &Path, chart_name: &str) -> Result<Vec<Candidate>, ChartError> {
    if !repository.is_dir() {
        warn!(repository = %repository.display(), "chart repository is not a directory");
        return Ok(Vec::new());
    }

    let archive_prefix = format!("{}-", chart_name);
    let mut candidates = Vec::new();

    for entry in std::fs::read_dir(repository)? {
        let path = entry?.path();

        if path.is_dir() && path.join("Pack.yaml").exists() {
            match LoadedPack::read_metadata(&path) {
                Ok(metadata) if metadata.name == chart_name => candidates.push(Candidate {
                    version: metadata.version.to_string(),
                    path,
                }),
                Ok(_) => {}
                Err(e) => debug!(path = %path.display(), error = %e, "skipping unreadable pack"),
            }
        } else if path.is_file() && is_archive(&path) {
            let version = path
                .file_name()
                .and_then(|n| n.to_str())
                .map(strip_archive_suffix)
                .and_then(|stem| stem.strip_prefix(&archive_prefix))
                .filter(|v| semver::Version::parse(v).is_ok())
                .map(str::to_string);

            if let Some(version) = version {
                candidates.push(Candidate { version, path });
            }
        }
    }

    Ok(candidates)
}

fn strip_archive_suffix(file_name: &str) -> &str {
    file_name
        .strip_suffix(".tar.gz")
        .or_else(|| file_name.strip_suffix(".tgz"))
        .unwrap_or(file_name)
}

/// Distinct versions, SemVer ascending
fn sorted_versions(candidates: &[Candidate]) -> Vec<String> {
    let mut versions: Vec<semver::Version> = candidates
        .iter()
        .filter_map(|c| semver::Version::parse(&c.version).ok())
        .collect();
    versions.sort();
    versions.dedup();
    versions.iter().map(ToString::to_string).collect()
}

fn invalid(path: &Path, source: dyff_core::CoreError) -> ChartError {
    ChartError::Invalid {
        path: path.display().to_string(),
        source,
    }
}

fn load_local(path: &Path) -> Result<LocatedChart, ChartError> {
    if path.is_dir() {
        let pack = LoadedPack::load(path).map_err(|e| invalid(path, e))?;
        return Ok(LocatedChart {
            pack,
            _scratch: None,
        });
    }

    let scratch = tempfile::Builder::new().prefix("dyff-chart-").tempdir()?;
    extract_archive(path, scratch.path()).map_err(|e| invalid(path, e))?;
    let root = find_pack_root(scratch.path()).map_err(|e| invalid(path, e))?;
    let pack = LoadedPack::load(&root).map_err(|e| invalid(path, e))?;
    debug!(archive = %path.display(), root = %root.display(), "extracted chart archive");

    Ok(LocatedChart {
        pack,
        _scratch: Some(scratch),
    })
}
