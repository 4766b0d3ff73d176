pub mod memory;
pub mod sqlite;

pub use memory::MemoryRecordSource;
pub use sqlite::SqliteRecordSource;

use async_trait::async_trait;
use std::collections::BTreeMap;

use crate::error::Result;
use crate::schema::ModelSchema;

/// The file names held by one file-valued attribute of a record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileAttribute {
    pub names: Vec<String>,
    /// Engine the record itself says the files live in, when it records one.
    /// `None` falls back to the field descriptor's binding.
    pub engine: Option<String>,
}

impl FileAttribute {
    pub fn single(name: &str) -> Self {
        FileAttribute {
            names: vec![name.to_string()],
            engine: None,
        }
    }

    pub fn many<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        FileAttribute {
            names: names.into_iter().map(Into::into).collect(),
            engine: None,
        }
    }

    pub fn on(mut self, engine: &str) -> Self {
        self.engine = Some(engine.to_string());
        self
    }

    /// Non-empty file names, in order.
    pub fn file_names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str).filter(|n| !n.is_empty())
    }

    pub fn is_empty(&self) -> bool {
        self.file_names().next().is_none()
    }
}

/// One stored record, reduced to its file-valued attributes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
    pub id: String,
    pub files: BTreeMap<String, FileAttribute>,
    /// Fields whose stored value could not be read as file names.
    pub errors: BTreeMap<String, String>,
}

impl Record {
    pub fn new(id: impl Into<String>) -> Self {
        Record {
            id: id.into(),
            files: BTreeMap::new(),
            errors: BTreeMap::new(),
        }
    }

    pub fn with_file(mut self, field: &str, attribute: FileAttribute) -> Self {
        self.files.insert(field.to_string(), attribute);
        self
    }

    pub fn with_error(mut self, field: &str, error: impl Into<String>) -> Self {
        self.errors.insert(field.to_string(), error.into());
        self
    }

    /// Why a field's value could not be decoded, if it couldn't.
    pub fn error(&self, field: &str) -> Option<&str> {
        self.errors.get(field).map(String::as_str)
    }

    /// The attribute for a field; absent fields read as empty.
    pub fn file(&self, field: &str) -> FileAttribute {
        self.files.get(field).cloned().unwrap_or_default()
    }
}

/// Enumerates the records of a record type.
#[async_trait]
pub trait RecordSource: Send + Sync {
    /// All records of `model`, with every file-valued field populated.
    ///
    /// A value that cannot be decoded is reported through
    /// [`Record::errors`] rather than failing the whole read.
    async fn records(&self, model: &ModelSchema) -> Result<Vec<Record>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_names_are_ignored() {
        assert!(FileAttribute::default().is_empty());
        assert!(FileAttribute::single("").is_empty());
        assert!(FileAttribute::many(["", ""]).is_empty());

        let attr = FileAttribute::many(["a.png", "", "b.png"]);
        assert!(!attr.is_empty());
        assert_eq!(attr.file_names().collect::<Vec<_>>(), vec!["a.png", "b.png"]);
    }

    #[test]
    fn test_missing_field_reads_empty() {
        let record = Record::new("1").with_file("file", FileAttribute::single("x.pdf").on("disk"));
        assert_eq!(record.file("file").engine.as_deref(), Some("disk"));
        assert!(record.file("thumbnail").is_empty());
        assert!(record.error("file").is_none());
    }

    #[test]
    fn test_decode_error_is_per_field() {
        let record = Record::new("7").with_error("photos", "not a JSON array");
        assert_eq!(record.error("photos"), Some("not a JSON array"));
        assert!(record.file("photos").is_empty());
    }
}
