use async_trait::async_trait;
use rusqlite::OptionalExtension;
use tokio_rusqlite::Connection;

use super::StorageEngine;
use crate::error::{MigrateError, Result};

/// File storage inside a SQLite database, one row per file.
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    pub async fn new(path: &str) -> Result<Self> {
        let conn = if path == ":memory:" {
            Connection::open_in_memory()
                .await
                .map_err(|e: rusqlite::Error| MigrateError::Storage(e.to_string()))?
        } else {
            Connection::open(path)
                .await
                .map_err(|e: rusqlite::Error| MigrateError::Storage(e.to_string()))?
        };

        let storage = SqliteStorage { conn };
        storage.initialize().await?;
        Ok(storage)
    }

    async fn initialize(&self) -> Result<()> {
        self.conn
            .call(|conn| -> std::result::Result<(), rusqlite::Error> {
                conn.execute_batch(
                    "
                    PRAGMA journal_mode = WAL;
                    PRAGMA synchronous = NORMAL;
                    PRAGMA busy_timeout = 5000;
                    CREATE TABLE IF NOT EXISTS files (
                        name TEXT PRIMARY KEY,
                        data BLOB NOT NULL,
                        updated_at TEXT NOT NULL DEFAULT (datetime('now'))
                    );
                    ",
                )?;
                Ok(())
            })
            .await
            .map_err(|e: tokio_rusqlite::Error| MigrateError::Storage(e.to_string()))
    }
}

#[async_trait]
impl StorageEngine for SqliteStorage {
    async fn exists(&self, name: &str) -> Result<bool> {
        let name = name.to_string();

        self.conn
            .call(move |conn| -> std::result::Result<bool, rusqlite::Error> {
                let mut stmt = conn.prepare("SELECT COUNT(*) FROM files WHERE name = ?1")?;
                let count: i64 = stmt.query_row(rusqlite::params![name], |row| row.get(0))?;
                Ok(count > 0)
            })
            .await
            .map_err(|e: tokio_rusqlite::Error| MigrateError::Storage(e.to_string()))
    }

    async fn open(&self, name: &str) -> Result<Vec<u8>> {
        let key = name.to_string();

        let data = self
            .conn
            .call(move |conn| -> std::result::Result<Option<Vec<u8>>, rusqlite::Error> {
                let mut stmt = conn.prepare("SELECT data FROM files WHERE name = ?1")?;
                let result = stmt
                    .query_row(rusqlite::params![key], |row| row.get::<_, Vec<u8>>(0))
                    .optional()?;
                Ok(result)
            })
            .await
            .map_err(|e: tokio_rusqlite::Error| MigrateError::Storage(e.to_string()))?;

        data.ok_or_else(|| MigrateError::FileNotFound {
            name: name.to_string(),
        })
    }

    async fn save(&self, name: &str, data: Vec<u8>) -> Result<String> {
        let key = name.to_string();

        self.conn
            .call(move |conn| -> std::result::Result<(), rusqlite::Error> {
                conn.execute(
                    "INSERT OR REPLACE INTO files (name, data, updated_at) VALUES (?1, ?2, datetime('now'))",
                    rusqlite::params![key, data],
                )?;
                Ok(())
            })
            .await
            .map_err(|e: tokio_rusqlite::Error| MigrateError::Storage(e.to_string()))?;
        Ok(name.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_save_open() {
        let storage = SqliteStorage::new(":memory:").await.unwrap();
        storage.save("a/b.png", b"png".to_vec()).await.unwrap();
        assert_eq!(storage.open("a/b.png").await.unwrap(), b"png");
    }

    #[tokio::test]
    async fn test_open_missing_file() {
        let storage = SqliteStorage::new(":memory:").await.unwrap();
        assert!(matches!(
            storage.open("missing").await,
            Err(MigrateError::FileNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_exists() {
        let storage = SqliteStorage::new(":memory:").await.unwrap();
        storage.save("x", b"data".to_vec()).await.unwrap();
        assert!(storage.exists("x").await.unwrap());
        assert!(!storage.exists("y").await.unwrap());
    }

    #[tokio::test]
    async fn test_save_replaces() {
        let storage = SqliteStorage::new(":memory:").await.unwrap();
        storage.save("x", b"one".to_vec()).await.unwrap();
        storage.save("x", b"two".to_vec()).await.unwrap();
        assert_eq!(storage.open("x").await.unwrap(), b"two");
    }

    #[tokio::test]
    async fn test_persists_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("files.db");
        let path = path.to_str().unwrap();
        {
            let storage = SqliteStorage::new(path).await.unwrap();
            storage.save("kept.txt", b"kept".to_vec()).await.unwrap();
        }
        let reopened = SqliteStorage::new(path).await.unwrap();
        assert_eq!(reopened.open("kept.txt").await.unwrap(), b"kept");
    }
}
