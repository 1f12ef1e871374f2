//! What templates see during a dry-run install
//!
//! A preview renders the target chart exactly as a fresh install would:
//! revision 1, `isInstall` set, and no cluster to ask for capabilities.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::pack::PackMetadata;
use crate::values::Values;

/// Kubernetes version reported to templates, as (major, minor)
pub const DRY_RUN_KUBE_VERSION: (u32, u32) = (1, 31);

/// The `release` object
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseInfo {
    pub name: String,
    pub namespace: String,
    pub revision: u32,
    pub is_install: bool,
    pub is_upgrade: bool,

    /// Always "Sherpack"
    pub service: String,
}

impl ReleaseInfo {
    pub fn for_install(name: &str, namespace: &str) -> Self {
        Self {
            name: name.to_string(),
            namespace: namespace.to_string(),
            revision: 1,
            is_install: true,
            is_upgrade: false,
            service: "Sherpack".to_string(),
        }
    }
}

/// The `pack` object, a flattened view of `Pack.yaml` metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackInfo {
    pub name: String,
    pub version: String,
    pub app_version: Option<String>,
}

/// The `capabilities` object
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Capabilities {
    pub kube_version: KubeVersion,

    /// Empty: there is no cluster to discover API groups from
    pub api_versions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KubeVersion {
    pub version: String,
    pub major: String,
    pub minor: String,
}

impl KubeVersion {
    pub fn new(major: u32, minor: u32) -> Self {
        Self {
            version: format!("v{}.{}.0", major, minor),
            major: major.to_string(),
            minor: minor.to_string(),
        }
    }
}

impl Capabilities {
    pub fn dry_run() -> Self {
        let (major, minor) = DRY_RUN_KUBE_VERSION;
        Self {
            kube_version: KubeVersion::new(major, minor),
            api_versions: Vec::new(),
        }
    }
}

/// Root of the template context: `values`, `release`, `pack`, `capabilities`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateContext {
    pub values: JsonValue,
    pub release: ReleaseInfo,
    pub pack: PackInfo,
    pub capabilities: Capabilities,
}

impl TemplateContext {
    pub fn new(values: Values, release: ReleaseInfo, pack: &PackMetadata) -> Self {
        Self {
            values: values.into_inner(),
            release,
            pack: PackInfo {
                name: pack.name.clone(),
                version: pack.version.to_string(),
                app_version: pack.app_version.clone(),
            },
            capabilities: Capabilities::dry_run(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use semver::Version;

    #[test]
    fn test_dry_run_context() {
        let mut pack = PackMetadata::new("web", Version::new(2, 0, 0));
        pack.app_version = Some("1.27".to_string());

        let ctx = TemplateContext::new(
            Values::from_yaml("replicaCount: 3").unwrap(),
            ReleaseInfo::for_install("app", "prod"),
            &pack,
        );

        assert_eq!(ctx.values["replicaCount"], 3);
        assert_eq!(ctx.pack.version, "2.0.0");
        assert_eq!(ctx.release.revision, 1);
        assert!(ctx.release.is_install && !ctx.release.is_upgrade);
    }

    #[test]
    fn test_serialized_names() {
        let json = serde_json::to_value(Capabilities::dry_run()).unwrap();
        assert_eq!(json["kubeVersion"]["version"], "v1.31.0");
        assert_eq!(json["apiVersions"], serde_json::json!([]));

        let json = serde_json::to_value(ReleaseInfo::for_install("app", "prod")).unwrap();
        assert_eq!(json["isInstall"], true);
        assert_eq!(json["service"], "Sherpack");
    }
}
