pub mod config;
pub mod error;
pub mod migration;
pub mod records;
pub mod schema;
pub mod storage;
pub mod types;

// Re-export primary types for convenience
pub use config::{EngineConfig, MigrationConfig, StorageMapping};
pub use error::{MigrateError, Result};
pub use migration::{
    FileOutcome, LabelReport, LabelStatus, MigrationJob, MigrationOptions, MigrationProgress,
    MigrationReport, MigrationStats,
};
pub use records::{FileAttribute, MemoryRecordSource, Record, RecordSource, SqliteRecordSource};
pub use schema::{FieldDescriptor, ModelSchema, Schema};
pub use storage::{LocalStorage, MemoryStorage, SqliteStorage, StorageEngine, StorageRegistry};
pub use types::{Direction, FieldKind, FieldPath, ModelLabel};
