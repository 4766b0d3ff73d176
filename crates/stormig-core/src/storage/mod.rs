pub mod local;
pub mod memory;
pub mod sqlite;

#[cfg(feature = "s3")]
pub mod s3;

pub use local::LocalStorage;
pub use memory::MemoryStorage;
pub use sqlite::SqliteStorage;

#[cfg(feature = "s3")]
pub use s3::S3Storage;

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

use crate::config::EngineConfig;
use crate::error::{MigrateError, Result};

/// Trait for pluggable file storage engines.
///
/// Files are addressed by name only; engines know nothing about records.
#[async_trait]
pub trait StorageEngine: Send + Sync {
    /// Check whether a file with this name is stored.
    async fn exists(&self, name: &str) -> Result<bool>;

    /// Read the full contents of a file.
    ///
    /// Fails with `FileNotFound` if the name is not stored.
    async fn open(&self, name: &str) -> Result<Vec<u8>>;

    /// Store `data` under `name`, replacing any existing content.
    /// Returns the name the file was stored under.
    async fn save(&self, name: &str, data: Vec<u8>) -> Result<String>;
}

/// Named set of storage engines built from configuration.
#[derive(Default, Clone)]
pub struct StorageRegistry {
    engines: HashMap<String, Arc<dyn StorageEngine>>,
}

impl StorageRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build every engine declared in the configuration.
    pub async fn from_config(engines: &HashMap<String, EngineConfig>) -> Result<Self> {
        let mut registry = StorageRegistry::new();
        for (name, config) in engines {
            let engine: Arc<dyn StorageEngine> = match config {
                EngineConfig::Local { root } => Arc::new(LocalStorage::new(root.clone())),
                EngineConfig::Sqlite { path } => Arc::new(SqliteStorage::new(path).await?),
                EngineConfig::Memory => Arc::new(MemoryStorage::new()),
                #[cfg(feature = "s3")]
                EngineConfig::S3 { bucket, prefix } => {
                    Arc::new(S3Storage::new(bucket.clone(), prefix.clone()).await?)
                }
                #[cfg(not(feature = "s3"))]
                EngineConfig::S3 { .. } => {
                    return Err(MigrateError::Config(format!(
                        "engine '{name}' needs the `s3` feature"
                    )))
                }
            };
            tracing::debug!(engine = %name, kind = config.kind(), "storage engine ready");
            registry.insert(name.clone(), engine);
        }
        Ok(registry)
    }

    pub fn insert(&mut self, name: impl Into<String>, engine: Arc<dyn StorageEngine>) {
        self.engines.insert(name.into(), engine);
    }

    pub fn get(&self, name: &str) -> Result<Arc<dyn StorageEngine>> {
        self.engines
            .get(name)
            .cloned()
            .ok_or_else(|| MigrateError::EngineNotFound {
                name: name.to_string(),
            })
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.engines.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_registry_lookup() {
        let mut registry = StorageRegistry::new();
        registry.insert("a", Arc::new(MemoryStorage::new()));
        assert!(registry.get("a").is_ok());
        assert!(matches!(
            registry.get("b"),
            Err(MigrateError::EngineNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_registry_from_config() {
        let dir = tempfile::tempdir().unwrap();
        let mut engines = HashMap::new();
        engines.insert(
            "disk".to_string(),
            EngineConfig::Local {
                root: dir.path().join("media"),
            },
        );
        engines.insert("scratch".to_string(), EngineConfig::Memory);

        let registry = StorageRegistry::from_config(&engines).await.unwrap();
        assert_eq!(registry.names(), vec!["disk", "scratch"]);
    }
}
