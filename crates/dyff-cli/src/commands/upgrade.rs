//! Upgrade command - preview the changes an upgrade would make

use clap::{Args, ValueEnum};
use dyff_core::{ValueSourceKind, ValueSourceSet};
use dyff_kube::{
    FileDriver, LocalChartLocator, NAMESPACE_ENV, PackRenderer, PreviewConfig, SecretsDriver,
    StorageConfig, StorageDriver, UpgradePreview,
};
use std::io::Write;
use std::path::PathBuf;
use tracing::debug;

use crate::error::{CliError, Result};

/// Where installed releases are read from
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StorageKind {
    /// Kubernetes Secrets in the release namespace
    Secrets,
    /// JSON records under --storage-dir
    File,
}

#[derive(Args, Debug)]
pub struct UpgradeArgs {
    /// Name of the installed release
    pub release: String,

    /// Chart to upgrade to: a pack directory, a packed archive, or a name
    /// looked up in the --repository directories
    pub chart: String,

    /// Namespace of the release
    #[arg(short, long)]
    pub namespace: Option<String>,

    /// Chart version to preview (defaults to the installed version)
    #[arg(short = 'v', long)]
    pub version: Option<String>,

    /// Values file(s) to merge
    #[arg(short = 'f', long = "values", value_delimiter = ',')]
    pub values: Vec<String>,

    /// Set values on command line (key=value)
    #[arg(long = "set")]
    pub set: Vec<String>,

    /// Set string values on command line (key=value)
    #[arg(long = "set-string")]
    pub set_string: Vec<String>,

    /// Set values from files (key=path)
    #[arg(long = "set-file")]
    pub set_file: Vec<String>,

    /// Set JSON values on command line (key=json)
    #[arg(long = "set-json")]
    pub set_json: Vec<String>,

    /// Set a literal string value (key=value, taken verbatim)
    #[arg(long = "set-literal")]
    pub set_literal: Vec<String>,

    /// Skip schema validation before rendering
    #[arg(long)]
    pub skip_schema: bool,

    /// Local chart repository directory
    #[arg(long = "repository")]
    pub repositories: Vec<PathBuf>,

    /// Release storage backend
    #[arg(long, value_enum, default_value_t = StorageKind::Secrets)]
    pub storage: StorageKind,

    /// Base directory of the file storage backend
    #[arg(long)]
    pub storage_dir: Option<PathBuf>,
}

impl UpgradeArgs {
    fn value_sources(&self) -> ValueSourceSet {
        ValueSourceSet::new()
            .with(ValueSourceKind::File, &self.values)
            .with(ValueSourceKind::Set, &self.set)
            .with(ValueSourceKind::SetString, &self.set_string)
            .with(ValueSourceKind::SetFile, &self.set_file)
            .with(ValueSourceKind::SetJson, &self.set_json)
            .with(ValueSourceKind::SetLiteral, &self.set_literal)
    }

    fn preview_config(&self, namespace_env: Option<String>, color: bool) -> PreviewConfig {
        let mut config = PreviewConfig::new(&self.release, &self.chart);
        config.namespace = self.namespace.clone();
        config.namespace_env = namespace_env;
        config.version = self.version.clone();
        config.values = self.value_sources();
        config.report.color = color;
        config
    }
}

fn default_storage_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("sherpack")
        .join("releases")
}

/// Run the upgrade command
pub async fn run(args: UpgradeArgs, color: bool) -> Result<()> {
    let config = args.preview_config(std::env::var(NAMESPACE_ENV).ok(), color);
    let locator = LocalChartLocator::with_repositories(args.repositories.iter().cloned());
    let renderer = PackRenderer::new().skip_schema_validation(args.skip_schema);

    match args.storage {
        StorageKind::Secrets => {
            let storage = SecretsDriver::new(StorageConfig::default()).await?;
            preview(storage, locator, renderer, &config).await
        }
        StorageKind::File => {
            let dir = args.storage_dir.clone().unwrap_or_else(default_storage_dir);
            debug!(dir = %dir.display(), "reading releases from file storage");
            let storage = FileDriver::new(dir, StorageConfig::default());
            preview(storage, locator, renderer, &config).await
        }
    }
}

async fn preview<S: StorageDriver>(
    storage: S,
    locator: LocalChartLocator,
    renderer: PackRenderer,
    config: &PreviewConfig,
) -> Result<()> {
    let preview = UpgradePreview::new(storage, locator, renderer);

    let mut out = std::io::stdout();
    let outcome = preview.run(config, &mut out).await?;
    out.flush().map_err(|e| CliError::Io {
        message: e.to_string(),
    })?;

    debug!(
        namespace = %outcome.namespace,
        version = %outcome.target.version,
        differences = outcome.differences,
        "preview complete"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use dyff_core::{ValueResolver, Values};

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        args: UpgradeArgs,
    }

    fn parse(args: &[&str]) -> UpgradeArgs {
        TestCli::try_parse_from(std::iter::once("upgrade").chain(args.iter().copied()))
            .unwrap()
            .args
    }

    #[test]
    fn test_defaults() {
        let args = parse(&["app", "web"]);

        assert_eq!(args.release, "app");
        assert_eq!(args.chart, "web");
        assert_eq!(args.storage, StorageKind::Secrets);
        assert!(args.version.is_none());
        assert!(!args.skip_schema);
        assert!(args.value_sources().is_empty());
    }

    #[test]
    fn test_short_flags() {
        let args = parse(&["app", "web", "-n", "prod", "-v", "2.0.0", "-f", "a.yaml,b.yaml"]);

        assert_eq!(args.namespace.as_deref(), Some("prod"));
        assert_eq!(args.version.as_deref(), Some("2.0.0"));
        assert_eq!(args.values, vec!["a.yaml", "b.yaml"]);
    }

    #[test]
    fn test_set_keeps_commas_for_the_value_parser() {
        let args = parse(&["app", "web", "--set", "a=1,b=2", "--set-literal", "c=x,y"]);

        assert_eq!(args.set, vec!["a=1,b=2"]);
        assert_eq!(args.set_literal, vec!["c=x,y"]);
    }

    #[test]
    fn test_preview_config() {
        let args = parse(&[
            "app",
            "web",
            "--set-string",
            "image.tag=2",
            "--set",
            "image.tag=1",
            "--storage",
            "file",
        ]);
        let config = args.preview_config(Some("staging".to_string()), false);

        assert_eq!(args.storage, StorageKind::File);
        assert_eq!(config.namespace, None);
        assert_eq!(config.namespace_env.as_deref(), Some("staging"));
        assert!(!config.report.color);

        // --set-string outranks --set whatever the flag order
        let merged = ValueResolver::new().merge(&config.values).unwrap();
        assert_eq!(merged, Values::from_yaml("image:\n  tag: \"2\"").unwrap());
    }

    #[test]
    fn test_skip_schema_flag() {
        let args = parse(&["app", "web", "--skip-schema", "--set", "replicaCount=0"]);

        assert!(args.skip_schema);
        assert_eq!(args.set, vec!["replicaCount=0"]);
    }

    #[test]
    fn test_rejects_unknown_storage() {
        let result = TestCli::try_parse_from(["upgrade", "app", "web", "--storage", "sqlite"]);
        assert!(result.is_err());
    }
}
