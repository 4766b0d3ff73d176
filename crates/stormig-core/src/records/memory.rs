use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::{Record, RecordSource};
use crate::error::Result;
use crate::schema::ModelSchema;

/// Records held in memory, keyed by the lowercased model label.
#[derive(Default)]
pub struct MemoryRecordSource {
    records: RwLock<HashMap<String, Vec<Record>>>,
}

impl MemoryRecordSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, model: &ModelSchema, record: Record) {
        let key = model.label().to_string().to_lowercase();
        self.records.write().await.entry(key).or_default().push(record);
    }
}

#[async_trait]
impl RecordSource for MemoryRecordSource {
    async fn records(&self, model: &ModelSchema) -> Result<Vec<Record>> {
        let key = model.label().to_string().to_lowercase();
        Ok(self.records.read().await.get(&key).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::FileAttribute;

    #[tokio::test]
    async fn test_records_by_model() {
        let source = MemoryRecordSource::new();
        let doc = ModelSchema::new("app", "Document", "app_document");
        let img = ModelSchema::new("app", "Image", "app_image");

        source
            .insert(&doc, Record::new("1").with_file("file", FileAttribute::single("a.pdf")))
            .await;
        source.insert(&doc, Record::new("2")).await;

        assert_eq!(source.records(&doc).await.unwrap().len(), 2);
        assert!(source.records(&img).await.unwrap().is_empty());
    }
}
