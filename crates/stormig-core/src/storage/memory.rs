use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::RwLock;

use super::StorageEngine;
use crate::error::{MigrateError, Result};

/// Number of calls made against a [`MemoryStorage`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallCounts {
    pub exists: usize,
    pub open: usize,
    pub save: usize,
}

impl CallCounts {
    pub fn total(&self) -> usize {
        self.exists + self.open + self.save
    }
}

/// Process-local storage engine. Useful as a scratch target and in tests,
/// where the call counters show exactly what a migration touched.
#[derive(Default)]
pub struct MemoryStorage {
    files: RwLock<HashMap<String, Vec<u8>>>,
    exists_calls: AtomicUsize,
    open_calls: AtomicUsize,
    save_calls: AtomicUsize,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a file without counting it as a `save` call.
    pub async fn insert(&self, name: &str, data: impl Into<Vec<u8>>) {
        self.files.write().await.insert(name.to_string(), data.into());
    }

    /// Inspect a stored file without counting it as an `open` call.
    pub async fn get(&self, name: &str) -> Option<Vec<u8>> {
        self.files.read().await.get(name).cloned()
    }

    pub async fn len(&self) -> usize {
        self.files.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.files.read().await.is_empty()
    }

    pub fn calls(&self) -> CallCounts {
        CallCounts {
            exists: self.exists_calls.load(Ordering::Relaxed),
            open: self.open_calls.load(Ordering::Relaxed),
            save: self.save_calls.load(Ordering::Relaxed),
        }
    }
}

#[async_trait]
impl StorageEngine for MemoryStorage {
    async fn exists(&self, name: &str) -> Result<bool> {
        self.exists_calls.fetch_add(1, Ordering::Relaxed);
        Ok(self.files.read().await.contains_key(name))
    }

    async fn open(&self, name: &str) -> Result<Vec<u8>> {
        self.open_calls.fetch_add(1, Ordering::Relaxed);
        self.files
            .read()
            .await
            .get(name)
            .cloned()
            .ok_or_else(|| MigrateError::FileNotFound {
                name: name.to_string(),
            })
    }

    async fn save(&self, name: &str, data: Vec<u8>) -> Result<String> {
        self.save_calls.fetch_add(1, Ordering::Relaxed);
        self.files.write().await.insert(name.to_string(), data);
        Ok(name.to_string())
    }
}
