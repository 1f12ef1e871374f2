//! Pack definition and loading

use semver::Version;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::{CoreError, Result};
use crate::schema::Schema;
use crate::values::Values;

/// API version accepted in `Pack.yaml`
pub const API_VERSION: &str = "sherpack/v1";

/// A Sherpack Pack - equivalent to a Helm Chart
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pack {
    /// API version (sherpack/v1)
    pub api_version: String,

    /// Pack type
    #[serde(default)]
    pub kind: PackKind,

    /// Pack metadata
    pub metadata: PackMetadata,

    /// Engine configuration
    #[serde(default)]
    pub engine: EngineConfig,
}

/// Pack type
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum PackKind {
    #[default]
    Application,
    Library,
}

/// Pack metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackMetadata {
    /// Pack name (required)
    pub name: String,

    /// Pack version (required, SemVer)
    #[serde(with = "version_serde")]
    pub version: Version,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Application version
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_version: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keywords: Vec<String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
}

impl PackMetadata {
    /// Minimal metadata, mostly useful in tests
    pub fn new(name: impl Into<String>, version: Version) -> Self {
        Self {
            name: name.into(),
            version,
            description: None,
            app_version: None,
            keywords: Vec::new(),
            annotations: BTreeMap::new(),
        }
    }
}

/// Engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Fail on undefined variables
    #[serde(default = "default_true")]
    pub strict: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self { strict: true }
    }
}

fn default_true() -> bool {
    true
}

/// Loaded pack with resolved paths
#[derive(Debug, Clone)]
pub struct LoadedPack {
    /// Pack definition
    pub pack: Pack,

    /// Root directory of the pack
    pub root: PathBuf,

    /// Templates directory
    pub templates_dir: PathBuf,

    /// Values file path
    pub values_path: PathBuf,

    /// Schema file path (if present)
    pub schema_path: Option<PathBuf>,
}

impl LoadedPack {
    /// Load a pack from a directory
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let root = path.as_ref().to_path_buf();

        if !root.exists() {
            return Err(CoreError::PackNotFound {
                path: root.display().to_string(),
            });
        }

        let pack_file = root.join("Pack.yaml");
        if !pack_file.exists() {
            return Err(CoreError::InvalidPack {
                message: format!("Pack.yaml not found in {}", root.display()),
            });
        }

        let pack_content = std::fs::read_to_string(&pack_file)?;
        let pack: Pack = serde_yaml::from_str(&pack_content)?;

        if pack.api_version != API_VERSION {
            return Err(CoreError::InvalidPack {
                message: format!(
                    "Unsupported API version: {}. Expected: {}",
                    pack.api_version, API_VERSION
                ),
            });
        }

        let templates_dir = root.join("templates");
        let values_path = root.join("values.yaml");
        let schema_path = Self::find_schema_file(&root);

        Ok(Self {
            pack,
            root,
            templates_dir,
            values_path,
            schema_path,
        })
    }

    /// Read only the metadata of a pack directory, without validating the rest
    pub fn read_metadata<P: AsRef<Path>>(path: P) -> Result<PackMetadata> {
        let content = std::fs::read_to_string(path.as_ref().join("Pack.yaml"))?;
        let pack: Pack = serde_yaml::from_str(&content)?;
        Ok(pack.metadata)
    }

    /// Find schema file, checking the standard locations
    fn find_schema_file(root: &Path) -> Option<PathBuf> {
        let candidates = [
            "values.schema.json",
            "values.schema.yaml",
            "schema.json",
            "schema.yaml",
        ];

        candidates
            .iter()
            .map(|candidate| root.join(candidate))
            .find(|path| path.exists())
    }

    /// Load the schema if present
    pub fn load_schema(&self) -> Result<Option<Schema>> {
        match &self.schema_path {
            Some(path) => Ok(Some(Schema::from_file(path)?)),
            None => Ok(None),
        }
    }

    /// Default values from `values.yaml` (empty when the file is absent)
    pub fn default_values(&self) -> Result<Values> {
        if !self.values_path.exists() {
            return Ok(Values::new());
        }
        Values::from_file(&self.values_path)
    }

    /// Get list of template files, sorted by path
    pub fn template_files(&self) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();

        if !self.templates_dir.exists() {
            return Ok(files);
        }

        for entry in walkdir::WalkDir::new(&self.templates_dir)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();
            if path.is_file() {
                if let Some(ext) = path.extension() {
                    let ext = ext.to_string_lossy().to_lowercase();
                    if matches!(ext.as_str(), "yaml" | "yml" | "j2" | "jinja2" | "txt" | "json") {
                        files.push(path.to_path_buf());
                    }
                }
            }
        }

        files.sort();
        Ok(files)
    }

    pub fn name(&self) -> &str {
        &self.pack.metadata.name
    }

    pub fn version(&self) -> &Version {
        &self.pack.metadata.version
    }
}

mod version_serde {
    use semver::Version;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(version: &Version, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&version.to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Version, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Version::parse(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_pack(dir: &Path, api_version: &str) {
        std::fs::create_dir_all(dir.join("templates/_partials")).unwrap();
        std::fs::write(
            dir.join("Pack.yaml"),
            format!(
                "apiVersion: {}\nmetadata:\n  name: web\n  version: 1.2.0\n  appVersion: \"2.0\"\n",
                api_version
            ),
        )
        .unwrap();
        std::fs::write(dir.join("values.yaml"), "replicaCount: 1\n").unwrap();
        std::fs::write(dir.join("templates/service.yaml"), "kind: Service\n").unwrap();
        std::fs::write(dir.join("templates/deployment.yaml"), "kind: Deployment\n").unwrap();
        std::fs::write(dir.join("templates/_partials/_helpers.j2"), "").unwrap();
        std::fs::write(dir.join("templates/README.md"), "ignored").unwrap();
    }

    #[test]
    fn test_pack_deserialize() {
        let yaml = r#"
apiVersion: sherpack/v1
kind: application
metadata:
  name: myapp
  version: 1.0.0
  description: My application
"#;
        let pack: Pack = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(pack.metadata.name, "myapp");
        assert_eq!(pack.metadata.version.to_string(), "1.0.0");
        assert_eq!(pack.kind, PackKind::Application);
        assert!(pack.engine.strict);
    }

    #[test]
    fn test_invalid_version_rejected() {
        let yaml = "apiVersion: sherpack/v1\nmetadata:\n  name: x\n  version: one\n";
        assert!(serde_yaml::from_str::<Pack>(yaml).is_err());
    }

    #[test]
    fn test_load_pack() {
        let temp = TempDir::new().unwrap();
        write_pack(temp.path(), API_VERSION);

        let pack = LoadedPack::load(temp.path()).unwrap();

        assert_eq!(pack.name(), "web");
        assert_eq!(pack.version(), &Version::new(1, 2, 0));
        assert_eq!(pack.default_values().unwrap().get("replicaCount").unwrap(), 1);
        assert!(pack.schema_path.is_none());

        let names: Vec<_> = pack
            .template_files()
            .unwrap()
            .iter()
            .map(|p| p.strip_prefix(&pack.templates_dir).unwrap().display().to_string())
            .collect();
        assert_eq!(
            names,
            vec!["_partials/_helpers.j2", "deployment.yaml", "service.yaml"]
        );
    }

    #[test]
    fn test_load_rejects_foreign_api_version() {
        let temp = TempDir::new().unwrap();
        write_pack(temp.path(), "v2");

        let err = LoadedPack::load(temp.path()).unwrap_err();
        assert!(matches!(err, CoreError::InvalidPack { .. }));
    }

    #[test]
    fn test_load_missing_dir() {
        let err = LoadedPack::load("/nonexistent/pack").unwrap_err();
        assert!(matches!(err, CoreError::PackNotFound { .. }));
    }

    #[test]
    fn test_missing_values_file_gives_empty_defaults() {
        let temp = TempDir::new().unwrap();
        write_pack(temp.path(), API_VERSION);
        std::fs::remove_file(temp.path().join("values.yaml")).unwrap();

        let pack = LoadedPack::load(temp.path()).unwrap();
        assert!(pack.default_values().unwrap().is_empty());
    }
}
