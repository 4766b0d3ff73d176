//! Migration configuration, read once at startup.
//!
//! A configuration file names the storage engines, the record database,
//! the record schemas and the two field→engine mapping sides ("old" and
//! "new") a migration moves files between.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use crate::error::{MigrateError, Result};
use crate::schema::{ModelSchema, Schema};
use crate::types::FieldPath;

/// How to construct one named storage engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum EngineConfig {
    Local {
        root: PathBuf,
    },
    Sqlite {
        path: String,
    },
    Memory,
    S3 {
        bucket: String,
        #[serde(default)]
        prefix: String,
    },
}

impl EngineConfig {
    pub fn kind(&self) -> &'static str {
        match self {
            EngineConfig::Local { .. } => "local",
            EngineConfig::Sqlite { .. } => "sqlite",
            EngineConfig::Memory => "memory",
            EngineConfig::S3 { .. } => "s3",
        }
    }
}

/// Per-field overrides plus a default, for one side of a migration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageMapping {
    #[serde(default)]
    pub default: Option<String>,
    #[serde(default)]
    pub overrides: HashMap<String, String>,
}

impl StorageMapping {
    pub fn new(default: Option<&str>) -> Self {
        StorageMapping {
            default: default.map(str::to_string),
            overrides: HashMap::new(),
        }
    }

    pub fn with_override(mut self, path: &str, engine: &str) -> Self {
        self.overrides.insert(path.to_string(), engine.to_string());
        self
    }

    /// Engine for a field path: its override, else this side's default,
    /// else the engine the field is currently bound to.
    pub fn resolve<'a>(&'a self, path: &FieldPath, bound: &'a str) -> &'a str {
        self.overrides
            .get(path.as_str())
            .or(self.default.as_ref())
            .map(String::as_str)
            .unwrap_or(bound)
    }

    fn engine_names(&self) -> impl Iterator<Item = &str> {
        self.default
            .iter()
            .chain(self.overrides.values())
            .map(String::as_str)
    }
}

fn default_storage_name() -> String {
    "default".to_string()
}

/// Top-level configuration file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationConfig {
    /// Path of the SQLite database holding the records.
    pub database: String,
    /// Engine a file field is bound to when its descriptor names none.
    #[serde(default = "default_storage_name")]
    pub default_storage: String,
    /// Report would-be copies instead of writing anything.
    #[serde(default)]
    pub dry_run: bool,
    pub engines: HashMap<String, EngineConfig>,
    #[serde(default)]
    pub old: StorageMapping,
    #[serde(default)]
    pub new: StorageMapping,
    #[serde(default)]
    pub models: Vec<ModelSchema>,
}

impl MigrationConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: MigrationConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            MigrateError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_json_str(&raw)
    }

    /// Check that every referenced engine is declared and model labels are unique.
    pub fn validate(&self) -> Result<()> {
        let known = |name: &str, context: &str| -> Result<()> {
            if self.engines.contains_key(name) {
                Ok(())
            } else {
                Err(MigrateError::Config(format!(
                    "{context} refers to unknown engine '{name}'"
                )))
            }
        };

        known(&self.default_storage, "default_storage")?;
        for name in self.old.engine_names() {
            known(name, "old mapping")?;
        }
        for name in self.new.engine_names() {
            known(name, "new mapping")?;
        }

        let mut labels = HashSet::new();
        for model in &self.models {
            let label = model.label().to_string();
            if !labels.insert(label.to_lowercase()) {
                return Err(MigrateError::Config(format!("duplicate model '{label}'")));
            }
            for field in &model.fields {
                if let Some(storage) = &field.storage {
                    known(storage, &format!("field {}.{}", label, field.name))?;
                }
            }
        }
        Ok(())
    }

    pub fn schema(&self) -> Schema {
        Schema::new(self.models.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "database": "app.db",
        "default_storage": "disk",
        "engines": {
            "disk": {"type": "local", "root": "media"},
            "blobs": {"type": "sqlite", "path": "blobs.db"}
        },
        "old": {"default": "disk", "overrides": {"app.Document.file": "blobs"}},
        "new": {"default": "blobs"},
        "models": [{
            "namespace": "app",
            "name": "Document",
            "table": "app_document",
            "fields": [{"name": "file"}, {"name": "title", "kind": "other"}]
        }]
    }"#;

    #[test]
    fn test_parse_sample() {
        let config = MigrationConfig::from_json_str(SAMPLE).unwrap();
        assert_eq!(config.database, "app.db");
        assert!(!config.dry_run);
        assert_eq!(config.engines.len(), 2);
        assert_eq!(
            config.engines["disk"],
            EngineConfig::Local {
                root: PathBuf::from("media")
            }
        );
        assert_eq!(config.models[0].primary_key, "id");
    }

    #[test]
    fn test_mapping_resolution_order() {
        let mapping = StorageMapping::new(Some("default-engine")).with_override("app.A.f", "special");
        assert_eq!(mapping.resolve(&FieldPath::from("app.A.f"), "bound"), "special");
        assert_eq!(mapping.resolve(&FieldPath::from("app.A.g"), "bound"), "default-engine");

        let empty = StorageMapping::default();
        assert_eq!(empty.resolve(&FieldPath::from("app.A.f"), "bound"), "bound");
    }

    #[test]
    fn test_unknown_engine_rejected() {
        let json = SAMPLE.replace(r#""new": {"default": "blobs"}"#, r#""new": {"default": "s3"}"#);
        let err = MigrationConfig::from_json_str(&json).unwrap_err();
        assert!(err.to_string().contains("unknown engine 's3'"));
    }

    #[test]
    fn test_duplicate_model_rejected() {
        let mut config = MigrationConfig::from_json_str(SAMPLE).unwrap();
        let mut copy = config.models[0].clone();
        copy.name = "DOCUMENT".to_string();
        config.models.push(copy);
        assert!(matches!(config.validate(), Err(MigrateError::Config(_))));
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stormig.json");
        std::fs::write(&path, SAMPLE).unwrap();
        let config = MigrationConfig::from_file(&path).unwrap();
        assert_eq!(config.schema().models().len(), 1);

        let missing = MigrationConfig::from_file(&dir.path().join("nope.json"));
        assert!(matches!(missing, Err(MigrateError::Config(_))));
    }
}
