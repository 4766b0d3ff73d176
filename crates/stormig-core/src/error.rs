use thiserror::Error;

#[derive(Debug, Error)]
pub enum MigrateError {
    #[error("invalid label: {label} (expected <namespace>.<TypeName>)")]
    InvalidLabel { label: String },

    #[error("storage engine not configured: {name}")]
    EngineNotFound { name: String },

    #[error("file not found: {name}")]
    FileNotFound { name: String },

    #[error("invalid file name: {name}")]
    InvalidName { name: String },

    #[error("storage error: {0}")]
    Storage(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, MigrateError>;

impl From<serde_json::Error> for MigrateError {
    fn from(e: serde_json::Error) -> Self {
        MigrateError::Serialization(e.to_string())
    }
}
