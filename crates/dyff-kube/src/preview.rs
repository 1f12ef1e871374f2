//! The upgrade preview pipeline
//!
//! Stages run strictly in order: namespace, installed release, values,
//! target chart, dry-run render, staging, diff, report. Any failure aborts
//! the run; staged files never outlive it.

use dyff_core::{ValueResolver, ValueSourceSet, Values, ValuesOrigin};
use std::io::Write;
use tracing::{debug, warn};

use crate::chart::{ChartLocator, ChartResolver, ChartTarget};
use crate::diff::{DiffInvoker, ReportEmitter};
use crate::error::PreviewError;
use crate::namespace::resolve_namespace;
use crate::release::StoredRelease;
use crate::render::{RenderRequest, Renderer};
use crate::stage::ManifestStager;
use crate::storage::StorageDriver;

/// Everything one preview needs, built once per invocation
#[derive(Debug, Clone)]
pub struct PreviewConfig {
    pub release_name: String,
    pub chart_reference: String,

    /// `--namespace`, if given
    pub namespace: Option<String>,

    /// Value of the namespace environment variable, if set
    pub namespace_env: Option<String>,

    /// `--version`, if given
    pub version: Option<String>,

    pub values: ValueSourceSet,

    pub report: ReportEmitter,
}

impl PreviewConfig {
    pub fn new(release_name: impl Into<String>, chart_reference: impl Into<String>) -> Self {
        Self {
            release_name: release_name.into(),
            chart_reference: chart_reference.into(),
            namespace: None,
            namespace_env: None,
            version: None,
            values: ValueSourceSet::new(),
            report: ReportEmitter::default(),
        }
    }
}

/// The installed release as seen by the preview
#[derive(Debug, Clone, PartialEq)]
pub struct ReleaseState {
    pub name: String,
    pub namespace: String,
    pub revision: u32,
    pub chart_name: String,
    pub chart_version: String,
    pub manifest: String,
    pub values: Values,
}

impl From<StoredRelease> for ReleaseState {
    fn from(release: StoredRelease) -> Self {
        Self {
            name: release.name,
            namespace: release.namespace,
            revision: release.version,
            chart_name: release.pack.name,
            chart_version: release.pack.version.to_string(),
            manifest: release.manifest,
            values: release.values,
        }
    }
}

/// Summary of a completed preview
#[derive(Debug, Clone, PartialEq)]
pub struct PreviewOutcome {
    pub namespace: String,
    pub target: ChartTarget,
    pub values_origin: ValuesOrigin,
    pub differences: usize,
}

/// Previews an upgrade with pluggable storage, chart lookup and rendering
pub struct UpgradePreview<S, L, R> {
    storage: S,
    locator: L,
    renderer: R,
    stager: ManifestStager,
    values: ValueResolver,
    charts: ChartResolver,
    diff: DiffInvoker,
}

impl<S, L, R> UpgradePreview<S, L, R>
where
    S: StorageDriver,
    L: ChartLocator,
    R: Renderer,
{
    pub fn new(storage: S, locator: L, renderer: R) -> Self {
        Self {
            storage,
            locator,
            renderer,
            stager: ManifestStager::new(),
            values: ValueResolver::new(),
            charts: ChartResolver::new(),
            diff: DiffInvoker::new(),
        }
    }

    pub fn with_stager(mut self, stager: ManifestStager) -> Self {
        self.stager = stager;
        self
    }

    /// Fetch the installed release, render the proposed one and write the
    /// difference to `out`
    pub async fn run<W: Write>(
        &self,
        config: &PreviewConfig,
        out: &mut W,
    ) -> Result<PreviewOutcome, PreviewError> {
        if config.release_name.is_empty() {
            return Err(PreviewError::Configuration("release name is empty".to_string()));
        }
        if config.chart_reference.is_empty() {
            return Err(PreviewError::Configuration("chart reference is empty".to_string()));
        }

        let namespace = resolve_namespace(config.namespace.as_deref(), config.namespace_env.as_deref());
        debug!(namespace = %namespace, "resolved namespace");

        let stored = self.storage.get_latest(&namespace, &config.release_name).await?;
        if !stored.is_deployed() {
            warn!(
                release = %stored.name,
                revision = stored.version,
                status = %stored.status,
                "latest revision is not deployed, comparing against it anyway"
            );
        }
        let current = ReleaseState::from(stored);
        debug!(
            release = %current.name,
            revision = current.revision,
            chart = %current.chart_name,
            version = %current.chart_version,
            "fetched installed release"
        );

        let effective = self.values.resolve(&config.values, &current.values)?;
        debug!(origin = ?effective.origin, "resolved values");

        let target = self.charts.target(
            &config.chart_reference,
            config.version.as_deref(),
            &current.chart_version,
        );
        let chart = self.locator.locate(&target)?;
        debug!(chart = %target.reference, version = %target.version, "loaded target chart");

        let desired = self.renderer.render(&RenderRequest {
            release_name: &current.name,
            namespace: &namespace,
            chart: chart.pack(),
            values: &effective.values,
        })?;

        let staged = self.stager.stage(&current.manifest, &desired.manifest)?;
        let report = self.diff.invoke(&staged)?;
        drop(staged);
        debug!(differences = report.len(), "compared manifests");

        config
            .report
            .emit(&report, out)
            .map_err(PreviewError::ReportWrite)?;

        Ok(PreviewOutcome {
            namespace,
            target,
            values_origin: effective.origin,
            differences: report.len(),
        })
    }
}
