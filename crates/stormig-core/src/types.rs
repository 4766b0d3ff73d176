use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{MigrateError, Result};

/// A record type label of the form `<namespace>.<TypeName>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModelLabel {
    pub namespace: String,
    pub name: String,
}

impl ModelLabel {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        ModelLabel {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Parse `app.Document`. Exactly two non-empty parts are accepted.
    pub fn parse(label: &str) -> Result<Self> {
        let invalid = || MigrateError::InvalidLabel {
            label: label.to_string(),
        };
        let (namespace, name) = label.split_once('.').ok_or_else(invalid)?;
        if namespace.is_empty() || name.is_empty() || name.contains('.') {
            return Err(invalid());
        }
        Ok(ModelLabel::new(namespace, name))
    }

    /// Key used by the override tables for one field of this type.
    pub fn field_path(&self, field: &str) -> FieldPath {
        FieldPath(format!("{}.{}.{}", self.namespace, self.name, field))
    }
}

impl fmt::Display for ModelLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.namespace, self.name)
    }
}

impl FromStr for ModelLabel {
    type Err = MigrateError;

    fn from_str(s: &str) -> Result<Self> {
        ModelLabel::parse(s)
    }
}

/// `<namespace>.<TypeName>.<field>`, the lookup key of a storage mapping.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FieldPath(pub String);

impl FieldPath {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for FieldPath {
    fn from(s: &str) -> Self {
        FieldPath(s.to_string())
    }
}

/// Capability tag of a field in a model schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    /// Holds zero or one file name.
    #[default]
    File,
    /// Holds any number of file names.
    Files,
    /// Not file-backed; never read by a migration.
    Other,
}

impl FieldKind {
    pub fn is_file_valued(self) -> bool {
        matches!(self, FieldKind::File | FieldKind::Files)
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldKind::File => write!(f, "file"),
            FieldKind::Files => write!(f, "files"),
            FieldKind::Other => write!(f, "other"),
        }
    }
}

/// Which mapping side files are read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Copy from the old side to the new side.
    #[default]
    Forward,
    /// Copy from the new side back to the old side.
    Reverse,
    /// Copy from the engine each field is currently bound to into the new
    /// side, ignoring the old mapping.
    ToNew,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Forward => write!(f, "forward"),
            Direction::Reverse => write!(f, "reverse"),
            Direction::ToNew => write!(f, "to_new"),
        }
    }
}
