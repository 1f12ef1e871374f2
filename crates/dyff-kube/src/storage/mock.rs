//! Mock storage driver for testing
//!
//! Stores releases in memory so the pipeline can be exercised without a
//! Kubernetes cluster.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::{StorageDriver, newest_first, not_found};
use crate::error::Result;
use crate::release::StoredRelease;

type Store = HashMap<String, HashMap<String, HashMap<u32, StoredRelease>>>;

/// In-memory storage driver for testing
#[derive(Clone, Default)]
pub struct MockStorageDriver {
    /// namespace -> name -> version -> release
    store: Arc<RwLock<Store>>,
    operations: Arc<RwLock<OperationCounts>>,
}

/// Counts of operations performed, for assertions
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct OperationCounts {
    pub gets: usize,
    pub lists: usize,
}

// Poisoned locks are recovered, the data is still consistent.
fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|e| e.into_inner())
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|e| e.into_inner())
}

impl MockStorageDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create with pre-populated releases
    pub fn with_releases(releases: impl IntoIterator<Item = StoredRelease>) -> Self {
        let driver = Self::new();
        for release in releases {
            driver.insert(release);
        }
        driver
    }

    pub fn insert(&self, release: StoredRelease) {
        write(&self.store)
            .entry(release.namespace.clone())
            .or_default()
            .entry(release.name.clone())
            .or_default()
            .insert(release.version, release);
    }

    pub fn operation_counts(&self) -> OperationCounts {
        read(&self.operations).clone()
    }
}

#[async_trait]
impl StorageDriver for MockStorageDriver {
    async fn get(&self, namespace: &str, name: &str, version: u32) -> Result<StoredRelease> {
        write(&self.operations).gets += 1;

        read(&self.store)
            .get(namespace)
            .and_then(|ns| ns.get(name))
            .and_then(|versions| versions.get(&version))
            .cloned()
            .ok_or_else(|| not_found(namespace, name))
    }

    async fn history(&self, namespace: &str, name: &str) -> Result<Vec<StoredRelease>> {
        write(&self.operations).lists += 1;

        let releases = read(&self.store)
            .get(namespace)
            .and_then(|ns| ns.get(name))
            .map(|versions| versions.values().cloned().collect())
            .unwrap_or_default();

        newest_first(releases, namespace, name)
    }
}
