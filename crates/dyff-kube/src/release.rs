//! Stored release records
//!
//! The record layout matches what Sherpack persists for every revision:
//! camelCase JSON with the lifecycle state tagged by `status`. Fields this
//! tool has no use for (hooks, provenance, timeouts) are ignored on read.

use chrono::{DateTime, Utc};
use dyff_core::{PackMetadata, Values};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Prefix shared by all release storage keys
pub const STORAGE_KEY_PREFIX: &str = "sh.sherpack.release.v1";

/// A stored release revision
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredRelease {
    pub name: String,

    pub namespace: String,

    /// Revision number (1-indexed, increments with each upgrade)
    pub version: u32,

    #[serde(rename = "state")]
    pub status: ReleaseStatus,

    /// Pack metadata at deploy time
    pub pack: PackMetadata,

    /// Values the revision was rendered with
    pub values: Values,

    /// Rendered manifest (all Kubernetes resources)
    pub manifest: String,

    #[serde(default)]
    pub labels: HashMap<String, String>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,

    #[serde(default)]
    pub notes: Option<String>,
}

impl StoredRelease {
    /// A deployed revision, as left behind by a successful install or upgrade
    pub fn deployed(
        name: impl Into<String>,
        namespace: impl Into<String>,
        version: u32,
        pack: PackMetadata,
        values: Values,
        manifest: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            name: name.into(),
            namespace: namespace.into(),
            version,
            status: ReleaseStatus::Deployed,
            pack,
            values,
            manifest: manifest.into(),
            labels: HashMap::new(),
            created_at: now,
            updated_at: now,
            notes: None,
        }
    }

    /// Storage key for this revision
    pub fn storage_key(&self) -> String {
        storage_key(&self.name, self.version)
    }

    pub fn is_deployed(&self) -> bool {
        self.status == ReleaseStatus::Deployed
    }
}

/// `sh.sherpack.release.v1.<name>.v<revision>`
pub fn storage_key(name: &str, version: u32) -> String {
    format!("{}.{}.v{}", STORAGE_KEY_PREFIX, name, version)
}

/// Lifecycle state of a revision
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(tag = "status", rename_all = "kebab-case")]
#[non_exhaustive]
pub enum ReleaseStatus {
    #[default]
    Deployed,

    Failed {
        reason: String,
        #[serde(default)]
        recoverable: bool,
        failed_at: DateTime<Utc>,
    },

    Uninstalled,

    /// Replaced by a newer revision
    Superseded,

    PendingInstall { started_at: DateTime<Utc> },

    PendingUpgrade {
        started_at: DateTime<Utc>,
        previous_version: u32,
    },

    PendingRollback {
        started_at: DateTime<Utc>,
        target_version: u32,
    },

    PendingUninstall { started_at: DateTime<Utc> },

    Recovering {
        from_status: String,
        attempt: u32,
        started_at: DateTime<Utc>,
    },
}

impl ReleaseStatus {
    pub fn is_pending(&self) -> bool {
        matches!(
            self,
            Self::PendingInstall { .. }
                | Self::PendingUpgrade { .. }
                | Self::PendingRollback { .. }
                | Self::PendingUninstall { .. }
                | Self::Recovering { .. }
        )
    }

    /// Human-readable status name
    pub fn status_name(&self) -> &'static str {
        match self {
            Self::Deployed => "deployed",
            Self::Failed { .. } => "failed",
            Self::Uninstalled => "uninstalled",
            Self::Superseded => "superseded",
            Self::PendingInstall { .. } => "pending-install",
            Self::PendingUpgrade { .. } => "pending-upgrade",
            Self::PendingRollback { .. } => "pending-rollback",
            Self::PendingUninstall { .. } => "pending-uninstall",
            Self::Recovering { .. } => "recovering",
        }
    }
}

impl std::fmt::Display for ReleaseStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Failed { reason, .. } => write!(f, "failed: {}", reason),
            Self::Recovering {
                from_status,
                attempt,
                ..
            } => write!(f, "recovering from {} (attempt {})", from_status, attempt),
            other => write!(f, "{}", other.status_name()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use semver::Version;

    fn release() -> StoredRelease {
        StoredRelease::deployed(
            "myapp",
            "default",
            1,
            PackMetadata::new("test", Version::new(1, 0, 0)),
            Values::new(),
            "apiVersion: v1",
        )
    }

    #[test]
    fn test_storage_key() {
        assert_eq!(release().storage_key(), "sh.sherpack.release.v1.myapp.v1");
    }

    #[test]
    fn test_status_serialization() {
        let json = serde_json::to_value(ReleaseStatus::Deployed).unwrap();
        assert_eq!(json, serde_json::json!({"status": "deployed"}));

        let pending: ReleaseStatus = serde_json::from_value(serde_json::json!({
            "status": "pending-upgrade",
            "started_at": "2024-01-01T00:00:00Z",
            "timeout": 300,
            "previous_version": 1
        }))
        .unwrap();
        assert!(pending.is_pending());
        assert_eq!(pending.status_name(), "pending-upgrade");
    }

    #[test]
    fn test_reads_records_with_extra_fields() {
        let mut json = serde_json::to_value(release()).unwrap();
        let obj = json.as_object_mut().unwrap();
        obj.insert("hooks".to_string(), serde_json::json!([]));
        obj.insert("valuesProvenance".to_string(), serde_json::json!({"sources": {}}));

        let parsed: StoredRelease = serde_json::from_value(json).unwrap();
        assert_eq!(parsed.name, "myapp");
        assert!(parsed.is_deployed());
    }

    #[test]
    fn test_failed_display() {
        let status = ReleaseStatus::Failed {
            reason: "timeout".to_string(),
            recoverable: true,
            failed_at: Utc::now(),
        };
        assert_eq!(status.to_string(), "failed: timeout");
        assert!(!status.is_pending());
    }
}
