use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use super::StorageEngine;
use crate::error::{MigrateError, Result};

/// Files stored under a root directory on the local filesystem.
pub struct LocalStorage {
    root: PathBuf,
}

impl LocalStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        LocalStorage { root: root.into() }
    }

    /// Resolve a file name inside the root, refusing anything that escapes it.
    fn path_for(&self, name: &str) -> Result<PathBuf> {
        let relative = Path::new(name);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if name.is_empty() || escapes {
            return Err(MigrateError::InvalidName {
                name: name.to_string(),
            });
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl StorageEngine for LocalStorage {
    async fn exists(&self, name: &str) -> Result<bool> {
        let path = self.path_for(name)?;
        match tokio::fs::metadata(&path).await {
            Ok(meta) => Ok(meta.is_file()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn open(&self, name: &str) -> Result<Vec<u8>> {
        let path = self.path_for(name)?;
        match tokio::fs::read(&path).await {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(MigrateError::FileNotFound {
                name: name.to_string(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    async fn save(&self, name: &str, data: Vec<u8>) -> Result<String> {
        let path = self.path_for(name)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, data).await?;
        Ok(name.to_string())
    }
}
