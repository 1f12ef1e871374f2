//! Storage drivers for reading release records
//!
//! Releases are read from the same backends Sherpack writes them to:
//! - **Secrets** (default): one Kubernetes Secret per revision
//! - **File**: local JSON files, for offline use and tests
//! - **Mock**: in-memory, for unit tests
//!
//! Payloads are JSON, optionally zstd or gzip compressed, and base64
//! encoded inside Secrets.

mod file;
mod mock;
mod secrets;

pub use file::FileDriver;
pub use mock::{MockStorageDriver, OperationCounts};
pub use secrets::SecretsDriver;

use async_trait::async_trait;
use std::collections::BTreeMap;

use crate::error::{KubeError, Result};
use crate::release::StoredRelease;

/// Label marking resources owned by Sherpack
pub const MANAGED_BY_LABEL: &str = "app.kubernetes.io/managed-by";
pub const RELEASE_NAME_LABEL: &str = "sherpack.io/release-name";
pub const RELEASE_VERSION_LABEL: &str = "sherpack.io/release-version";
/// Label carrying the compression method of a stored payload
pub const COMPRESSION_LABEL: &str = "sherpack.io/compression";

/// Read access to persisted releases
///
/// Implementations must be Send + Sync for use across async tasks.
#[async_trait]
pub trait StorageDriver: Send + Sync {
    /// Get a specific revision of a release
    async fn get(&self, namespace: &str, name: &str, version: u32) -> Result<StoredRelease>;

    /// All revisions of a release, newest first
    ///
    /// Returns `ReleaseNotFound` when there is none.
    async fn history(&self, namespace: &str, name: &str) -> Result<Vec<StoredRelease>>;

    /// The newest revision of a release
    async fn get_latest(&self, namespace: &str, name: &str) -> Result<StoredRelease> {
        self.history(namespace, name)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| not_found(namespace, name))
    }
}

pub(crate) fn not_found(namespace: &str, name: &str) -> KubeError {
    KubeError::ReleaseNotFound {
        name: name.to_string(),
        namespace: namespace.to_string(),
    }
}

/// Storage configuration
#[derive(Debug, Clone, Default)]
pub struct StorageConfig {
    /// Compression used when the payload does not say otherwise
    pub compression: CompressionMethod,
}

/// Compression method for release data
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionMethod {
    None,

    /// Gzip compression (Helm-compatible)
    Gzip { level: u32 },

    Zstd { level: i32 },
}

impl Default for CompressionMethod {
    fn default() -> Self {
        Self::Zstd { level: 3 }
    }
}

impl CompressionMethod {
    /// Value of the compression label
    pub fn label(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Gzip { .. } => "gzip",
            Self::Zstd { .. } => "zstd",
        }
    }

    /// Parse a compression label, `None` for unknown values
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "none" => Some(Self::None),
            "gzip" => Some(Self::Gzip { level: 6 }),
            "zstd" => Some(Self::Zstd { level: 3 }),
            _ => None,
        }
    }
}

#[must_use = "compression result should be used"]
pub fn compress(data: &[u8], method: CompressionMethod) -> Result<Vec<u8>> {
    match method {
        CompressionMethod::None => Ok(data.to_vec()),
        CompressionMethod::Gzip { level } => {
            use std::io::Write;
            let mut encoder =
                flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::new(level));
            encoder
                .write_all(data)
                .map_err(|e| KubeError::Compression(e.to_string()))?;
            encoder
                .finish()
                .map_err(|e| KubeError::Compression(e.to_string()))
        }
        CompressionMethod::Zstd { level } => zstd::encode_all(std::io::Cursor::new(data), level)
            .map_err(|e| KubeError::Compression(e.to_string())),
    }
}

#[must_use = "decompression result should be used"]
pub fn decompress(data: &[u8], method: CompressionMethod) -> Result<Vec<u8>> {
    match method {
        CompressionMethod::None => Ok(data.to_vec()),
        CompressionMethod::Gzip { .. } => {
            use std::io::Read;
            let mut decoder = flate2::read::GzDecoder::new(data);
            let mut decompressed = Vec::new();
            decoder
                .read_to_end(&mut decompressed)
                .map_err(|e| KubeError::Compression(e.to_string()))?;
            Ok(decompressed)
        }
        CompressionMethod::Zstd { .. } => zstd::decode_all(std::io::Cursor::new(data))
            .map_err(|e| KubeError::Compression(e.to_string())),
    }
}

pub fn serialize_release(release: &StoredRelease) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(release)?)
}

pub fn deserialize_release(data: &[u8]) -> Result<StoredRelease> {
    Ok(serde_json::from_slice(data)?)
}

/// Serialize, compress and base64-encode a release
pub fn encode_for_storage(release: &StoredRelease, compression: CompressionMethod) -> Result<String> {
    let json = serialize_release(release)?;
    let compressed = compress(&json, compression)?;
    Ok(base64::Engine::encode(
        &base64::engine::general_purpose::STANDARD,
        &compressed,
    ))
}

/// Reverse of [`encode_for_storage`]
pub fn decode_from_storage(data: &str, compression: CompressionMethod) -> Result<StoredRelease> {
    let decoded = base64::Engine::decode(&base64::engine::general_purpose::STANDARD, data.trim())
        .map_err(|e| KubeError::Serialization(format!("base64 decode error: {}", e)))?;
    let decompressed = decompress(&decoded, compression)?;
    deserialize_release(&decompressed)
}

/// Labels carried by every stored revision
pub fn storage_labels(release: &StoredRelease) -> BTreeMap<String, String> {
    let mut labels = BTreeMap::new();
    labels.insert(MANAGED_BY_LABEL.to_string(), "sherpack".to_string());
    labels.insert(RELEASE_NAME_LABEL.to_string(), release.name.clone());
    labels.insert(RELEASE_VERSION_LABEL.to_string(), release.version.to_string());
    labels
}

/// Sort newest first, or report the release as missing
pub(crate) fn newest_first(
    mut releases: Vec<StoredRelease>,
    namespace: &str,
    name: &str,
) -> Result<Vec<StoredRelease>> {
    if releases.is_empty() {
        return Err(not_found(namespace, name));
    }
    releases.sort_by(|a, b| b.version.cmp(&a.version));
    Ok(releases)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::release::ReleaseStatus;
    use dyff_core::{PackMetadata, Values};

    fn test_release(manifest: &str) -> StoredRelease {
        StoredRelease::deployed(
            "test",
            "default",
            1,
            PackMetadata::new("test-pack", semver::Version::new(1, 0, 0)),
            Values::new(),
            manifest,
        )
    }

    #[test]
    fn test_compression_roundtrip() {
        let data = b"Hello, World! This is test data for compression.";
        for method in [
            CompressionMethod::None,
            CompressionMethod::Gzip { level: 6 },
            CompressionMethod::Zstd { level: 3 },
        ] {
            let compressed = compress(data, method).unwrap();
            let decompressed = decompress(&compressed, method).unwrap();
            assert_eq!(data.as_slice(), decompressed.as_slice());
        }
    }

    #[test]
    fn test_encode_decode_large_manifest() {
        let manifest = "apiVersion: v1\nkind: ConfigMap\n".repeat(1000);
        let release = test_release(&manifest);

        let encoded = encode_for_storage(&release, CompressionMethod::default()).unwrap();
        let decoded = decode_from_storage(&encoded, CompressionMethod::default()).unwrap();

        assert_eq!(decoded.manifest, manifest);
        assert!(encoded.len() < manifest.len());
    }

    #[test]
    fn test_decode_wrong_compression_fails() {
        let release = test_release("apiVersion: v1");
        let encoded = encode_for_storage(&release, CompressionMethod::Gzip { level: 6 }).unwrap();

        assert!(decode_from_storage(&encoded, CompressionMethod::None).is_err());
    }

    #[test]
    fn test_decode_invalid_base64() {
        let result = decode_from_storage("not valid base64!!!", CompressionMethod::None);
        assert!(matches!(result, Err(KubeError::Serialization(_))));
    }

    #[test]
    fn test_release_status_preserved() {
        let mut release = test_release("apiVersion: v1");
        release.status = ReleaseStatus::Failed {
            reason: "Test failure".to_string(),
            recoverable: true,
            failed_at: chrono::Utc::now(),
        };

        let deserialized = deserialize_release(&serialize_release(&release).unwrap()).unwrap();

        assert!(
            matches!(deserialized.status, ReleaseStatus::Failed { reason, .. } if reason == "Test failure")
        );
    }

    #[test]
    fn test_compression_labels() {
        assert_eq!(CompressionMethod::from_label("gzip"), Some(CompressionMethod::Gzip { level: 6 }));
        assert_eq!(CompressionMethod::from_label("brotli"), None);
        assert_eq!(CompressionMethod::default().label(), "zstd");
    }

    #[test]
    fn test_storage_labels() {
        let labels = storage_labels(&test_release(""));

        assert_eq!(labels.get(MANAGED_BY_LABEL), Some(&"sherpack".to_string()));
        assert_eq!(labels.get(RELEASE_NAME_LABEL), Some(&"test".to_string()));
        assert_eq!(labels.get(RELEASE_VERSION_LABEL), Some(&"1".to_string()));
    }
}
