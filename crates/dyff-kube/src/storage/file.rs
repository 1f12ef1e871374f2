//! File-based storage driver
//!
//! Layout: `<base>/<namespace>/<name>/v<revision>.json`, each file holding
//! the serialized record compressed with the configured method. Useful
//! without a cluster and as a fixture store in tests.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use super::{
    StorageConfig, StorageDriver, compress, decompress, deserialize_release, newest_first,
    not_found, serialize_release,
};
use crate::error::Result;
use crate::release::StoredRelease;

/// File-based storage driver
pub struct FileDriver {
    base_dir: PathBuf,
    config: StorageConfig,
}

impl FileDriver {
    pub fn new(base_dir: impl Into<PathBuf>, config: StorageConfig) -> Self {
        Self {
            base_dir: base_dir.into(),
            config,
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn release_path(&self, namespace: &str, name: &str, version: u32) -> PathBuf {
        self.release_dir(namespace, name)
            .join(format!("v{}.json", version))
    }

    fn release_dir(&self, namespace: &str, name: &str) -> PathBuf {
        self.base_dir.join(namespace).join(name)
    }

    /// Write a revision, replacing any previous record with the same number
    pub fn store(&self, release: &StoredRelease) -> Result<PathBuf> {
        let path = self.release_path(&release.namespace, &release.name, release.version);

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let json = serialize_release(release)?;
        let data = compress(&json, self.config.compression)?;
        std::fs::write(&path, data)?;

        debug!(path = %path.display(), "stored release");
        Ok(path)
    }

    fn read_release(&self, path: &Path) -> Result<StoredRelease> {
        let data = std::fs::read(path)?;
        let decompressed = decompress(&data, self.config.compression)?;
        deserialize_release(&decompressed)
    }
}

#[async_trait]
impl StorageDriver for FileDriver {
    async fn get(&self, namespace: &str, name: &str, version: u32) -> Result<StoredRelease> {
        let path = self.release_path(namespace, name, version);

        if !path.exists() {
            return Err(not_found(namespace, name));
        }

        self.read_release(&path)
    }

    async fn history(&self, namespace: &str, name: &str) -> Result<Vec<StoredRelease>> {
        let dir = self.release_dir(namespace, name);

        if !dir.is_dir() {
            return Err(not_found(namespace, name));
        }

        let mut releases = Vec::new();
        let mut first_error = None;

        for entry in std::fs::read_dir(&dir)? {
            let path = entry?.path();
            if path.extension().map(|e| e != "json").unwrap_or(true) {
                continue;
            }
            match self.read_release(&path) {
                Ok(release) => releases.push(release),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "skipping unreadable release file");
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
