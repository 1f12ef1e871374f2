//! Upgrade previews for Sherpack releases
//!
//! This crate provides:
//! - **Storage Drivers**: Read release records from Kubernetes Secrets or a local directory
//! - **Chart Lookup**: Resolve the target chart version and locate it on disk
//! - **Rendering**: Dry-run install of a pack into a single manifest stream
//! - **Diff Engine**: Structural comparison of the installed and proposed manifests
//! - **Preview**: The pipeline tying it all together

pub mod chart;
pub mod diff;
pub mod error;
pub mod namespace;
pub mod preview;
pub mod release;
pub mod render;
pub mod stage;
pub mod storage;

pub use chart::{ChartLocator, ChartResolver, ChartTarget, LocalChartLocator, LocatedChart};
pub use diff::{CompareOptions, DiffInvoker, DiffReport, HumanReport, ReportEmitter};
pub use error::{ChartError, DiffError, KubeError, PreviewError, RenderError, Result, StagingError};
pub use namespace::{DEFAULT_NAMESPACE, NAMESPACE_ENV, resolve_namespace};
pub use preview::{PreviewConfig, PreviewOutcome, ReleaseState, UpgradePreview};
pub use release::{ReleaseStatus, StoredRelease};
pub use render::{DesiredState, PackRenderer, RenderRequest, Renderer};
pub use stage::{ManifestStager, StagedDocumentPair};
pub use storage::{
    CompressionMethod, FileDriver, MockStorageDriver, OperationCounts, SecretsDriver, StorageConfig,
    StorageDriver,
};
