//! Kubernetes Secrets storage driver
//!
//! This is the default driver. Each revision lives in a Secret named
//! `sh.sherpack.release.v1.<name>.v<revision>` whose `release` key holds
//! the encoded record.

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::Client;
use kube::api::{Api, ListParams};
use std::collections::BTreeMap;
use tracing::{debug, warn};

use super::{
    COMPRESSION_LABEL, CompressionMethod, MANAGED_BY_LABEL, RELEASE_NAME_LABEL, StorageConfig,
    StorageDriver, decode_from_storage, encode_for_storage, newest_first, not_found,
    storage_labels,
};
use crate::error::{KubeError, Result};
use crate::release::{StoredRelease, storage_key};

/// Secret type used for release payloads
pub const RELEASE_SECRET_TYPE: &str = "sherpack.io/release.v1";

const CHUNKED_LABEL: &str = "sherpack.io/chunked";
const CHUNK_PARENT_LABEL: &str = "sherpack.io/chunk-parent";

/// Kubernetes Secrets storage driver
pub struct SecretsDriver {
    client: Client,
    config: StorageConfig,
}

impl SecretsDriver {
    /// Connect using the default kubeconfig or in-cluster configuration
    pub async fn new(config: StorageConfig) -> Result<Self> {
        let client = Client::try_default().await?;
        Ok(Self { client, config })
    }

    fn secrets_api(&self, namespace: &str) -> Api<Secret> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

#[async_trait]
impl StorageDriver for SecretsDriver {
    async fn get(&self, namespace: &str, name: &str, version: u32) -> Result<StoredRelease> {
        let key = storage_key(name, version);

        match self.secrets_api(namespace).get(&key).await {
            Ok(secret) => release_from_secret(&secret, self.config.compression),
            Err(kube::Error::Api(e)) if e.code == 404 => Err(not_found(namespace, name)),
            Err(e) => Err(e.into()),
        }
    }

    async fn history(&self, namespace: &str, name: &str) -> Result<Vec<StoredRelease>> {
        let label_selector = format!(
            "{}=sherpack,{}={}",
            MANAGED_BY_LABEL, RELEASE_NAME_LABEL, name
        );
        let lp = ListParams::default().labels(&label_selector);
        let secrets = self.secrets_api(namespace).list(&lp).await?;
        debug!(namespace, name, count = secrets.items.len(), "listed release secrets");

        let mut releases = Vec::new();
        let mut first_error = None;

        for secret in &secrets.items {
            if has_label(secret, CHUNK_PARENT_LABEL) {
                continue;
            }
            match release_from_secret(secret, self.config.compression) {
                Ok(release) => releases.push(release),
                Err(e) => {
                    warn!(
                        secret = secret.metadata.name.as_deref().unwrap_or_default(),
                        error = %e,
                        "skipping unreadable release secret"
                    );
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            Some(e) if releases.is_empty() => Err(e),
            _ => newest_first(releases, namespace, name),
        }
    }
}

fn has_label(secret: &Secret, label: &str) -> bool {
    secret
        .metadata
        .labels
        .as_ref()
        .map(|l| l.contains_key(label))
        .unwrap_or(false)
}

fn label_value<'a>(secret: &'a Secret, label: &str) -> Option<&'a str> {
    secret
        .metadata
        .labels
        .as_ref()
        .and_then(|l| l.get(label))
        .map(String::as_str)
}

/// Decode the release held by a Secret
///
/// The compression label wins over `fallback`. Releases split across
/// several Secrets are not supported.
pub fn release_from_secret(secret: &Secret, fallback: CompressionMethod) -> Result<StoredRelease> {
    let name = secret.metadata.name.as_deref().unwrap_or("<unnamed>");

    if label_value(secret, CHUNKED_LABEL) == Some("true") {
        return Err(KubeError::Storage(format!(
            "release secret '{}' is chunked, which is not supported",
            name
        )));
    }

    let data = secret
        .data
        .as_ref()
        .and_then(|d| d.get("release"))
        .ok_or_else(|| KubeError::Storage(format!("secret '{}' missing 'release' data", name)))?;

    let encoded = std::str::from_utf8(&data.0)
        .map_err(|e| KubeError::Storage(format!("invalid UTF-8 in secret '{}': {}", name, e)))?;

    let compression = label_value(secret, COMPRESSION_LABEL)
        .and_then(CompressionMethod::from_label)
        .unwrap_or(fallback);

    decode_from_storage(encoded, compression)
}

/// Build the Secret Sherpack stores for a revision
pub fn release_secret(release: &StoredRelease, compression: CompressionMethod) -> Result<Secret> {
    let encoded = encode_for_storage(release, compression)?;

    let mut labels = storage_labels(release);
    labels.insert("sherpack.io/storage-driver".to_string(), "secrets".to_string());
    labels.insert(COMPRESSION_LABEL.to_string(), compression.label().to_string());

    let mut data = BTreeMap::new();
    data.insert(
        "release".to_string(),
        k8s_openapi::ByteString(encoded.into_bytes()),
    );

    Ok(Secret {
        metadata: ObjectMeta {
            name: Some(release.storage_key()),
            namespace: Some(release.namespace.clone()),
            labels: Some(labels),
            ..Default::default()
        },
        type_: Some(RELEASE_SECRET_TYPE.to_string()),
        data: Some(data),
        ..Default::default()
    })
}
