use async_trait::async_trait;
use rusqlite::types::Value;
use tokio_rusqlite::Connection;
use tracing::warn;

use super::{FileAttribute, Record, RecordSource};
use crate::error::{MigrateError, Result};
use crate::schema::{FieldDescriptor, ModelSchema};
use crate::types::FieldKind;

/// Reads records from the tables of an application's SQLite database.
///
/// `file` columns hold a single name, `files` columns a JSON array of names.
/// NULL and `''` both mean "no file". A value that cannot be decoded is
/// recorded as an error on that record's field; the other rows and fields
/// are still returned. Only the primary key and file columns are selected;
/// nothing is ever written back.
pub struct SqliteRecordSource {
    conn: Connection,
}

impl SqliteRecordSource {
    pub async fn open(path: &str) -> Result<Self> {
        let conn = if path == ":memory:" {
            Connection::open_in_memory()
                .await
                .map_err(|e: rusqlite::Error| MigrateError::Database(e.to_string()))?
        } else {
            Connection::open(path)
                .await
                .map_err(|e: rusqlite::Error| MigrateError::Database(e.to_string()))?
        };
        Ok(SqliteRecordSource { conn })
    }
}

fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

fn select_sql(model: &ModelSchema, fields: &[FieldDescriptor]) -> String {
    let mut columns = vec![quote_ident(&model.primary_key)];
    columns.extend(fields.iter().map(|f| quote_ident(f.column())));
    format!(
        "SELECT {} FROM {} ORDER BY {}",
        columns.join(", "),
        quote_ident(&model.table),
        quote_ident(&model.primary_key)
    )
}

fn key_to_string(value: Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Integer(i) => i.to_string(),
        Value::Real(f) => f.to_string(),
        Value::Text(s) => s,
        Value::Blob(b) => String::from_utf8_lossy(&b).into_owned(),
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "NULL",
        Value::Integer(_) => "INTEGER",
        Value::Real(_) => "REAL",
        Value::Text(_) => "TEXT",
        Value::Blob(_) => "BLOB",
    }
}

fn parse_attribute(field: &FieldDescriptor, value: Value) -> Result<FileAttribute> {
    let raw = match value {
        Value::Null => return Ok(FileAttribute::default()),
        Value::Text(raw) if raw.trim().is_empty() => return Ok(FileAttribute::default()),
        Value::Text(raw) => raw,
        other => {
            return Err(MigrateError::Serialization(format!(
                "column '{}' holds {} instead of TEXT",
                field.column(),
                value_kind(&other)
            )))
        }
    };
    match field.kind {
        FieldKind::Files => {
            let names: Vec<String> = serde_json::from_str(&raw).map_err(|e| {
                MigrateError::Serialization(format!(
                    "column '{}' is not a JSON array of file names: {}",
                    field.column(),
                    e
                ))
            })?;
            Ok(FileAttribute::many(names))
        }
        _ => Ok(FileAttribute::single(&raw)),
    }
}

#[async_trait]
impl RecordSource for SqliteRecordSource {
    async fn records(&self, model: &ModelSchema) -> Result<Vec<Record>> {
        let fields: Vec<FieldDescriptor> = model.file_fields().cloned().collect();
        let sql = select_sql(model, &fields);
        let width = fields.len();

        let rows = self
            .conn
            .call(move |conn| -> std::result::Result<Vec<(Value, Vec<Value>)>, rusqlite::Error> {
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt.query_map([], |row| {
                    let id: Value = row.get(0)?;
                    let mut values = Vec::with_capacity(width);
                    for i in 0..width {
                        values.push(row.get::<_, Value>(i + 1)?);
                    }
                    Ok((id, values))
                })?;
                let mut out = Vec::new();
                for row in rows {
                    out.push(row?);
                }
                Ok(out)
            })
            .await
            .map_err(|e: tokio_rusqlite::Error| MigrateError::Database(e.to_string()))?;

        let mut records = Vec::with_capacity(rows.len());
        for (id, values) in rows {
            let mut record = Record::new(key_to_string(id));
            for (field, value) in fields.iter().zip(values) {
                match parse_attribute(field, value) {
                    Ok(attribute) => {
                        record.files.insert(field.name.clone(), attribute);
                    }
                    Err(e) => {
                        warn!(record = %record.id, field = %field.name, error = %e, "cannot decode file field");
                        record.errors.insert(field.name.clone(), e.to_string());
                    }
                }
            }
            records.push(record);
        }
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_sql_quotes_identifiers() {
        let model = ModelSchema::new("app", "Document", "app_document")
            .with_field(FieldDescriptor::file("file"))
            .with_field(FieldDescriptor::other("title"));
        let fields: Vec<FieldDescriptor> = model.file_fields().cloned().collect();
        assert_eq!(
            select_sql(&model, &fields),
            r#"SELECT "id", "file" FROM "app_document" ORDER BY "id""#
        );
        assert_eq!(quote_ident(r#"we"ird"#), r#""we""ird""#);
    }

    #[test]
    fn test_parse_attribute() {
        let single = FieldDescriptor::file("file");
        let many = FieldDescriptor::files("scans");

        assert!(parse_attribute(&single, Value::Null).unwrap().is_empty());
        assert!(parse_attribute(&single, Value::Text(String::new()))
            .unwrap()
            .is_empty());
        assert_eq!(
            parse_attribute(&single, Value::Text("a.pdf".into()))
                .unwrap()
                .names,
            vec!["a.pdf"]
        );
        assert_eq!(
            parse_attribute(&many, Value::Text(r#"["a.png","b.png"]"#.into()))
                .unwrap()
                .names,
            vec!["a.png", "b.png"]
        );
        assert!(matches!(
            parse_attribute(&many, Value::Text("a.png".into())),
            Err(MigrateError::Serialization(_))
        ));
    }

    #[test]
    fn test_parse_attribute_rejects_non_text() {
        let single = FieldDescriptor::file("file");
        let err = parse_attribute(&single, Value::Integer(42)).unwrap_err();
        assert!(err.to_string().contains("holds INTEGER instead of TEXT"));
        let err = parse_attribute(&single, Value::Blob(b"x".to_vec())).unwrap_err();
        assert!(err.to_string().contains("holds BLOB instead of TEXT"));
    }
}
