//! Dry-run install render of the target chart

use dyff_core::{LoadedPack, PackMetadata, ReleaseInfo, SchemaValidator, TemplateContext, Values};
use dyff_engine::{Engine, RenderResult};
use tracing::debug;

use crate::error::RenderError;

/// What to render and for which release
#[derive(Debug, Clone, Copy)]
pub struct RenderRequest<'a> {
    pub release_name: &'a str,
    pub namespace: &'a str,
    pub chart: &'a LoadedPack,
    pub values: &'a Values,
}

/// The manifest the proposed chart would install
#[derive(Debug, Clone, PartialEq)]
pub struct DesiredState {
    /// All rendered documents, ordered by template path
    pub manifest: String,

    /// Rendered NOTES, never part of the comparison
    pub notes: Option<String>,

    pub chart: PackMetadata,
}

/// Renders the desired state of a release
pub trait Renderer: Send + Sync {
    fn render(&self, request: &RenderRequest<'_>) -> Result<DesiredState, RenderError>;
}

/// Renders Sherpack packs locally, without touching the cluster
#[derive(Debug, Clone, Copy, Default)]
pub struct PackRenderer {
    skip_schema_validation: bool,
}

impl PackRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Render even when the values do not satisfy the pack schema
    pub fn skip_schema_validation(mut self, skip: bool) -> Self {
        self.skip_schema_validation = skip;
        self
    }

    /// Schema defaults, then `values.yaml`, then the effective values
    fn merged_values(&self, chart: &LoadedPack, overrides: &Values) -> Result<Values, RenderError> {
        let schema = chart.load_schema()?;

        let mut values = schema
            .as_ref()
            .map(|s| s.defaults_as_values())
            .unwrap_or_else(Values::new);
        values.merge(&chart.default_values()?);
        values.merge(overrides);

        if let Some(schema) = schema {
            if self.skip_schema_validation {
                debug!(pack = chart.name(), "schema validation skipped");
            } else {
                SchemaValidator::new(schema)?
                    .validate(values.inner())
                    .into_result()?;
            }
        }

        Ok(values)
    }
}

impl Renderer for PackRenderer {
    fn render(&self, request: &RenderRequest<'_>) -> Result<DesiredState, RenderError> {
        let chart = request.chart;
        let values = self.merged_values(chart, request.values)?;

        let release = ReleaseInfo::for_install(request.release_name, request.namespace);
        let context = TemplateContext::new(values, release, &chart.pack.metadata);

        let engine = Engine::builder().strict(chart.pack.engine.strict).build();
        let result = engine.render_pack(chart, &context)?;
        debug!(
            pack = chart.name(),
            version = %chart.version(),
            templates = result.manifests.len(),
            "rendered desired state"
        );

        Ok(DesiredState {
            manifest: join_manifests(&result),
            notes: result.notes,
            chart: chart.pack.metadata.clone(),
        })
    }
}

/// `---` separated documents, each preceded by a `# Source:` comment
pub fn join_manifests(result: &RenderResult) -> String {
    let mut manifest = String::new();

    for (name, content) in &result.manifests {
        let content = content.trim();
        let content = content.strip_prefix("---").map(str::trim_start).unwrap_or(content);

        manifest.push_str("---\n# Source: ");
        manifest.push_str(name);
        manifest.push('\n');
        manifest.push_str(content);
        manifest.push('\n');
    }

    manifest
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use tempfile::TempDir;

    fn write_pack(dir: &Path, schema: Option<&str>) {
        std::fs::create_dir_all(dir.join("templates")).unwrap();
        std::fs::write(
            dir.join("Pack.yaml"),
            "apiVersion: sherpack/v1\nmetadata:\n  name: web\n  version: 1.0.0\n",
        )
        .unwrap();
        std::fs::write(
            dir.join("values.yaml"),
            "replicaCount: 3\nimage:\n  repository: nginx\n  tag: \"1.25\"\n",
        )
        .unwrap();
        std::fs::write(
            dir.join("templates/deployment.yaml"),
            "apiVersion: apps/v1\nkind: Deployment\nmetadata:\n  name: {{ release.name }}\n  namespace: {{ release.namespace }}\nspec:\n  replicas: {{ values.replicaCount }}\n  template:\n    spec:\n      containers:\n        - name: web\n          image: \"{{ values.image.repository }}:{{ values.image.tag }}\"\n",
        )
        .unwrap();
        std::fs::write(
            dir.join("templates/service.yaml"),
            "---\napiVersion: v1\nkind: Service\nmetadata:\n  name: {{ release.name }}\n",
        )
        .unwrap();
        std::fs::write(dir.join("templates/NOTES.txt"), "Release {{ release.name }}").unwrap();
        if let Some(schema) = schema {
            std::fs::write(dir.join("values.schema.json"), schema).unwrap();
        }
    }

    fn render(dir: &Path, overrides: &Values) -> Result<DesiredState, RenderError> {
        let pack = LoadedPack::load(dir).unwrap();
        PackRenderer::new().render(&RenderRequest {
            release_name: "app",
            namespace: "prod",
            chart: &pack,
            values: overrides,
        })
    }

    #[test]
    fn test_render_merges_defaults_under_overrides() {
        let tmp = TempDir::new().unwrap();
        write_pack(tmp.path(), None);

        let desired = render(tmp.path(), &Values::from_yaml("replicaCount: 5").unwrap()).unwrap();

        assert!(desired.manifest.contains("replicas: 5"));
        assert!(desired.manifest.contains("image: \"nginx:1.25\""));
        assert!(desired.manifest.contains("namespace: prod"));
        assert_eq!(desired.notes.as_deref(), Some("Release app"));
        assert_eq!(desired.chart.name, "web");
    }

    #[test]
    fn test_manifest_layout() {
        let tmp = TempDir::new().unwrap();
        write_pack(tmp.path(), None);

        let desired = render(tmp.path(), &Values::new()).unwrap();

        assert!(desired.manifest.starts_with("---\n# Source: deployment.yaml\napiVersion: apps/v1\n"));
        assert!(desired.manifest.contains("---\n# Source: service.yaml\napiVersion: v1\n"));
        assert!(!desired.manifest.contains("---\n---"));
        assert!(!desired.manifest.contains("NOTES"));
    }

    #[test]
    fn test_schema_defaults_and_validation() {
        let tmp = TempDir::new().unwrap();
        write_pack(
            tmp.path(),
            Some(r#"{"type":"object","properties":{"replicaCount":{"type":"integer","minimum":1}}}"#),
        );

        assert!(render(tmp.path(), &Values::from_yaml("replicaCount: 2").unwrap()).is_ok());

        let err = render(tmp.path(), &Values::from_yaml("replicaCount: 0").unwrap()).unwrap_err();
        assert!(matches!(
            err,
            RenderError::Values(dyff_core::CoreError::SchemaValidation { .. })
        ));

        let pack = LoadedPack::load(tmp.path()).unwrap();
        let skipped = PackRenderer::new().skip_schema_validation(true).render(&RenderRequest {
            release_name: "app",
            namespace: "prod",
            chart: &pack,
            values: &Values::from_yaml("replicaCount: 0").unwrap(),
        });
        assert!(skipped.is_ok());
    }

    #[test]
    fn test_comment_only_values_keep_schema_defaults() {
        let tmp = TempDir::new().unwrap();
        write_pack(
            tmp.path(),
            Some(
                r#"{"type":"object","properties":{"replicaCount":{"type":"integer","default":4},"image":{"type":"object","properties":{"repository":{"default":"nginx"},"tag":{"default":"1.25"}}}}}"#,
            ),
        );
        std::fs::write(tmp.path().join("values.yaml"), "# defaults live in the schema\n").unwrap();

        let desired = render(tmp.path(), &Values::new()).unwrap();

        assert!(desired.manifest.contains("replicas: 4"));
        assert!(desired.manifest.contains("image: \"nginx:1.25\""));
    }

    #[test]
    fn test_template_error_surfaces() {
        let tmp = TempDir::new().unwrap();
        write_pack(tmp.path(), None);
        std::fs::write(tmp.path().join("templates/bad.yaml"), "x: {{ values.missing.key }}").unwrap();

        let err = render(tmp.path(), &Values::new()).unwrap_err();
        assert!(matches!(err, RenderError::Engine(_)));
    }
}
