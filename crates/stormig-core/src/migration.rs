//! Copy file attachments of stored records between storage engines.
//!
//! For every record of a record type, each file-valued attribute is copied
//! from the engine resolved on the source side to the engine resolved on the
//! destination side. Files already present at the destination are left
//! alone unless `overwrite` is set, so a run can be repeated safely.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::{MigrationConfig, StorageMapping};
use crate::error::Result;
use crate::records::{Record, RecordSource, SqliteRecordSource};
use crate::schema::{FieldDescriptor, ModelSchema, Schema};
use crate::storage::{StorageEngine, StorageRegistry};
use crate::types::{Direction, ModelLabel};

/// Switches that change how files are copied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MigrationOptions {
    /// Replace files that already exist at the destination.
    pub overwrite: bool,
    pub direction: Direction,
    /// Record would-be copies as notices instead of saving anything.
    pub dry_run: bool,
}

/// Progress callback data, sent after each record.
pub struct MigrationProgress<'a> {
    pub label: &'a str,
    pub current: usize,
    pub total: usize,
}

/// What happened to a single file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileOutcome {
    Copied,
    /// Dry run: the file would have been copied.
    Planned,
    MissingSource,
    AlreadyPresent,
}

/// Per-label counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MigrationStats {
    pub records: usize,
    pub copied: usize,
    pub planned: usize,
    /// Attributes without any file name.
    pub empty: usize,
    /// Attributes whose source and destination resolve to the same engine.
    pub same_engine: usize,
    pub missing_source: usize,
    pub already_present: usize,
    pub failed: usize,
}

impl MigrationStats {
    fn record(&mut self, outcome: FileOutcome) {
        match outcome {
            FileOutcome::Copied => self.copied += 1,
            FileOutcome::Planned => self.planned += 1,
            FileOutcome::MissingSource => self.missing_source += 1,
            FileOutcome::AlreadyPresent => self.already_present += 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LabelStatus {
    Migrated,
    Skipped { reason: String },
}

/// Result of migrating one record-type label.
#[derive(Debug, Clone, Serialize)]
pub struct LabelReport {
    pub label: String,
    #[serde(flatten)]
    pub status: LabelStatus,
    pub stats: MigrationStats,
    /// Dry-run notices, one per would-be copy.
    pub notices: Vec<String>,
}

impl LabelReport {
    fn new(label: &str) -> Self {
        LabelReport {
            label: label.to_string(),
            status: LabelStatus::Migrated,
            stats: MigrationStats::default(),
            notices: Vec::new(),
        }
    }

    fn skipped(label: &str, reason: impl Into<String>) -> Self {
        LabelReport {
            status: LabelStatus::Skipped {
                reason: reason.into(),
            },
            ..Self::new(label)
        }
    }

    /// `Skipped <label>. <reason>` for skipped labels, `None` otherwise.
    pub fn message(&self) -> Option<String> {
        match &self.status {
            LabelStatus::Migrated => None,
            LabelStatus::Skipped { reason } => Some(format!("Skipped {}. {}", self.label, reason)),
        }
    }
}

/// Result of a whole run.
#[derive(Debug, Clone, Serialize)]
pub struct MigrationReport {
    pub run_id: Uuid,
    pub options: MigrationOptions,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub labels: Vec<LabelReport>,
}

impl MigrationReport {
    pub fn totals(&self) -> MigrationStats {
        self.labels.iter().fold(MigrationStats::default(), |mut acc, l| {
            acc.records += l.stats.records;
            acc.copied += l.stats.copied;
            acc.planned += l.stats.planned;
            acc.empty += l.stats.empty;
            acc.same_engine += l.stats.same_engine;
            acc.missing_source += l.stats.missing_source;
            acc.already_present += l.stats.already_present;
            acc.failed += l.stats.failed;
            acc
        })
    }

    /// Skip messages of every label that could not be processed.
    pub fn messages(&self) -> Vec<String> {
        self.labels.iter().filter_map(LabelReport::message).collect()
    }

    pub fn notices(&self) -> impl Iterator<Item = &str> {
        self.labels
            .iter()
            .flat_map(|l| l.notices.iter().map(String::as_str))
    }
}

/// A configured storage migration.
pub struct MigrationJob {
    schema: Schema,
    registry: StorageRegistry,
    records: Box<dyn RecordSource>,
    old: StorageMapping,
    new: StorageMapping,
    default_storage: String,
    options: MigrationOptions,
}

impl MigrationJob {
    pub fn new(schema: Schema, registry: StorageRegistry, records: Box<dyn RecordSource>) -> Self {
        MigrationJob {
            schema,
            registry,
            records,
            old: StorageMapping::default(),
            new: StorageMapping::default(),
            default_storage: "default".to_string(),
            options: MigrationOptions::default(),
        }
    }

    /// Build the engines and open the record database named by `config`.
    ///
    /// Dry run is on if either the configuration or `options` asks for it.
    pub async fn from_config(config: &MigrationConfig, options: MigrationOptions) -> Result<Self> {
        let registry = StorageRegistry::from_config(&config.engines).await?;
        let records = SqliteRecordSource::open(&config.database).await?;
        let options = MigrationOptions {
            dry_run: options.dry_run || config.dry_run,
            ..options
        };
        Ok(MigrationJob::new(config.schema(), registry, Box::new(records))
            .with_mappings(config.old.clone(), config.new.clone())
            .with_default_storage(&config.default_storage)
            .with_options(options))
    }

    pub fn with_mappings(mut self, old: StorageMapping, new: StorageMapping) -> Self {
        self.old = old;
        self.new = new;
        self
    }

    pub fn with_default_storage(mut self, name: &str) -> Self {
        self.default_storage = name.to_string();
        self
    }

    pub fn with_options(mut self, options: MigrationOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> MigrationOptions {
        self.options
    }

    /// Migrate every label in order. Problems with one label never stop the
    /// others; they show up in its [`LabelReport`].
    pub async fn run<S: AsRef<str>>(&self, labels: &[S]) -> MigrationReport {
        self.run_with_progress(labels, |_| {}).await
    }

    pub async fn run_with_progress<S, F>(&self, labels: &[S], on_progress: F) -> MigrationReport
    where
        S: AsRef<str>,
        F: FnMut(MigrationProgress),
    {
        self.run_with_callbacks(labels, on_progress, |_| {}).await
    }

    /// Like [`run`](Self::run), handing each [`LabelReport`] to `on_label`
    /// as soon as that label is done.
    pub async fn run_reporting<S, G>(&self, labels: &[S], on_label: G) -> MigrationReport
    where
        S: AsRef<str>,
        G: FnMut(&LabelReport),
    {
        self.run_with_callbacks(labels, |_| {}, on_label).await
    }

    async fn run_with_callbacks<S, F, G>(
        &self,
        labels: &[S],
        mut on_progress: F,
        mut on_label: G,
    ) -> MigrationReport
    where
        S: AsRef<str>,
        F: FnMut(MigrationProgress),
        G: FnMut(&LabelReport),
    {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        info!(
            %run_id,
            direction = %self.options.direction,
            overwrite = self.options.overwrite,
            dry_run = self.options.dry_run,
            "starting storage migration"
        );

        let mut reports = Vec::with_capacity(labels.len());
        for label in labels {
            let report = self.migrate_label(label.as_ref(), &mut on_progress).await;
            if let Some(message) = report.message() {
                info!("{}", message);
            }
            on_label(&report);
            reports.push(report);
        }

        MigrationReport {
            run_id,
            options: self.options,
            started_at,
            finished_at: Utc::now(),
            labels: reports,
        }
    }

    #[tracing::instrument(skip_all, fields(label = %label))]
    async fn migrate_label<F>(&self, label: &str, on_progress: &mut F) -> LabelReport
    where
        F: FnMut(MigrationProgress),
    {
        let parsed = match ModelLabel::parse(label) {
            Ok(parsed) => parsed,
            Err(_) => return LabelReport::skipped(label, "Invalid label."),
        };
        let Some(model) = self.schema.resolve(&parsed) else {
            return LabelReport::skipped(label, "Model not found.");
        };

        let records = match self.records.records(model).await {
            Ok(records) => records,
            Err(e) => {
                warn!(error = %e, "could not read records");
                return LabelReport::skipped(label, format!("Failed to read records: {e}"));
            }
        };

        let fields: Vec<&FieldDescriptor> = model.file_fields().collect();
        let mut report = LabelReport::new(label);
        let total = records.len();
        for (i, record) in records.iter().enumerate() {
            debug!(record = %record.id, "handling record");
            for field in &fields {
                self.migrate_attribute(model, field, record, &mut report).await;
            }
            report.stats.records += 1;
            on_progress(MigrationProgress {
                label,
                current: i + 1,
                total,
            });
        }
        report
    }

    async fn migrate_attribute(
        &self,
        model: &ModelSchema,
        field: &FieldDescriptor,
        record: &Record,
        report: &mut LabelReport,
    ) {
        if let Some(error) = record.error(&field.name) {
            warn!(record = %record.id, field = %field.name, error, "unreadable file field, ignoring record");
            report.stats.failed += 1;
            return;
        }

        let attribute = record.file(&field.name);
        if attribute.is_empty() {
            debug!(field = %field.name, "field is empty, ignoring file");
            report.stats.empty += 1;
            return;
        }

        let path = model.label().field_path(&field.name);
        let bound = attribute
            .engine
            .as_deref()
            .or(field.storage.as_deref())
            .unwrap_or(self.default_storage.as_str());
        let old = self.old.resolve(&path, bound);
        let new = self.new.resolve(&path, bound);
        let (source_name, dest_name) = match self.options.direction {
            Direction::Forward => (old, new),
            Direction::Reverse => (new, old),
            Direction::ToNew => (bound, new),
        };

        if source_name == dest_name {
            debug!(field = %path, engine = source_name, "same storage engine, ignoring file");
            report.stats.same_engine += 1;
            return;
        }

        let engines = self
            .registry
            .get(source_name)
            .and_then(|source| self.registry.get(dest_name).map(|dest| (source, dest)));
        let (source, dest) = match engines {
            Ok(engines) => engines,
            Err(e) => {
                warn!(field = %path, error = %e, "cannot resolve storage engines");
                report.stats.failed += attribute.file_names().count();
                return;
            }
        };

        for name in attribute.file_names() {
            match self.move_file(source.as_ref(), dest.as_ref(), name).await {
                Ok(outcome) => {
                    if outcome == FileOutcome::Planned {
                        report.notices.push(format!("Created file: {name}"));
                    }
                    report.stats.record(outcome);
                }
                Err(e) => {
                    warn!(
                        record = %record.id,
                        field = %path,
                        file = name,
                        from = source_name,
                        to = dest_name,
                        error = %e,
                        "failed to copy file"
                    );
                    report.stats.failed += 1;
                }
            }
        }
    }

    /// Copy one file unless it is missing at the source or already present
    /// at the destination.
    async fn move_file(
        &self,
        source: &dyn StorageEngine,
        dest: &dyn StorageEngine,
        name: &str,
    ) -> Result<FileOutcome> {
        if !source.exists(name).await? {
            info!(file = name, "file doesn't exist in source storage, ignoring file");
            return Ok(FileOutcome::MissingSource);
        }
        if !self.options.overwrite && dest.exists(name).await? {
            info!(file = name, "file already exists in destination storage, ignoring file");
            return Ok(FileOutcome::AlreadyPresent);
        }

        info!(file = name, "copying file to destination storage");
        if self.options.dry_run {
            return Ok(FileOutcome::Planned);
        }
        let data = source.open(name).await?;
        let stored = dest.save(name, data).await?;
        if stored != name {
            warn!(file = name, stored = %stored, "destination stored file under a different name");
        }
        Ok(FileOutcome::Copied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skip_message() {
        let report = LabelReport::skipped("app.Missing", "Model not found.");
        assert_eq!(
            report.message().as_deref(),
            Some("Skipped app.Missing. Model not found.")
        );
        assert!(LabelReport::new("app.Document").message().is_none());
    }

    #[test]
    fn test_stats_record_outcomes() {
        let mut stats = MigrationStats::default();
        stats.record(FileOutcome::Copied);
        stats.record(FileOutcome::Planned);
        stats.record(FileOutcome::MissingSource);
        stats.record(FileOutcome::AlreadyPresent);
        assert_eq!(
            (stats.copied, stats.planned, stats.missing_source, stats.already_present),
            (1, 1, 1, 1)
        );
    }

    #[test]
    fn test_report_serializes_status_inline() {
        let report = LabelReport::skipped("app.X", "Invalid label.");
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["status"], "skipped");
        assert_eq!(value["reason"], "Invalid label.");
        assert_eq!(value["stats"]["records"], 0);
    }
}
