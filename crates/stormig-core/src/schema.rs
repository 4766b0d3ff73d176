//! Explicit record-type metadata.
//!
//! A migration never inspects the database to find file fields; each record
//! type declares its fields with a capability tag instead.

use serde::{Deserialize, Serialize};

use crate::types::{FieldKind, ModelLabel};

fn default_primary_key() -> String {
    "id".to_string()
}

/// One declared field of a record type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub name: String,
    /// Column holding the field; defaults to `name`.
    #[serde(default)]
    pub column: Option<String>,
    #[serde(default)]
    pub kind: FieldKind,
    /// Engine this field is currently bound to; `None` means the configured
    /// `default_storage`.
    #[serde(default)]
    pub storage: Option<String>,
}

impl FieldDescriptor {
    pub fn file(name: &str) -> Self {
        FieldDescriptor {
            name: name.to_string(),
            column: None,
            kind: FieldKind::File,
            storage: None,
        }
    }

    pub fn files(name: &str) -> Self {
        FieldDescriptor {
            kind: FieldKind::Files,
            ..Self::file(name)
        }
    }

    pub fn other(name: &str) -> Self {
        FieldDescriptor {
            kind: FieldKind::Other,
            ..Self::file(name)
        }
    }

    pub fn bound_to(mut self, storage: &str) -> Self {
        self.storage = Some(storage.to_string());
        self
    }

    pub fn column(&self) -> &str {
        self.column.as_deref().unwrap_or(&self.name)
    }
}

/// A record type and where its rows live.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelSchema {
    pub namespace: String,
    pub name: String,
    pub table: String,
    #[serde(default = "default_primary_key")]
    pub primary_key: String,
    #[serde(default)]
    pub fields: Vec<FieldDescriptor>,
}

impl ModelSchema {
    pub fn new(namespace: &str, name: &str, table: &str) -> Self {
        ModelSchema {
            namespace: namespace.to_string(),
            name: name.to_string(),
            table: table.to_string(),
            primary_key: default_primary_key(),
            fields: Vec::new(),
        }
    }

    pub fn with_field(mut self, field: FieldDescriptor) -> Self {
        self.fields.push(field);
        self
    }

    /// The declared label, used for storage mapping keys.
    pub fn label(&self) -> ModelLabel {
        ModelLabel::new(&self.namespace, &self.name)
    }

    /// Fields holding file references, in declaration order.
    pub fn file_fields(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields.iter().filter(|f| f.kind.is_file_valued())
    }
}

/// Registry of known record types.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    models: Vec<ModelSchema>,
}

impl Schema {
    pub fn new(models: Vec<ModelSchema>) -> Self {
        Schema { models }
    }

    pub fn models(&self) -> &[ModelSchema] {
        &self.models
    }

    /// Find a record type. The namespace must match exactly; the type name
    /// is compared case-insensitively.
    pub fn resolve(&self, label: &ModelLabel) -> Option<&ModelSchema> {
        self.models
            .iter()
            .find(|m| m.namespace == label.namespace && m.name.eq_ignore_ascii_case(&label.name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn document() -> ModelSchema {
        ModelSchema::new("app", "Document", "app_document")
            .with_field(FieldDescriptor::other("title"))
            .with_field(FieldDescriptor::file("file"))
            .with_field(FieldDescriptor::files("scans").bound_to("disk"))
    }

    #[test]
    fn test_file_fields_skip_other_kinds() {
        let model = document();
        let names: Vec<&str> = model.file_fields().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["file", "scans"]);
    }

    #[test]
    fn test_resolve_is_case_insensitive_on_name() {
        let schema = Schema::new(vec![document()]);
        let found = schema.resolve(&ModelLabel::new("app", "document")).unwrap();
        assert_eq!(found.label().to_string(), "app.Document");
        assert!(schema.resolve(&ModelLabel::new("App", "Document")).is_none());
        assert!(schema.resolve(&ModelLabel::new("app", "Image")).is_none());
    }

    #[test]
    fn test_column_defaults_to_name() {
        let mut field = FieldDescriptor::file("file");
        assert_eq!(field.column(), "file");
        field.column = Some("file_path".to_string());
        assert_eq!(field.column(), "file_path");
    }
}
