// Batch import engine
//
// Records are normalized, checked against the store in bounded id chunks, then
// validated and written one row at a time in input order. Outcomes:
// - errors:   rejected by validation, never attempted
// - skipped:  valid but not written (known id, or the store refused the insert)
// - imported: written, or counted as written in a dry run

use battlelog_common::types::{NormalizedRecord, RecordKind};
use chrono::{Local, NaiveDate};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use super::id::IdGenerator;
use super::parse::{parse_payload, PayloadFormat, RecordOrigin};
use crate::db::RecordStore;
use crate::error::ImportError;
use crate::normalize::normalize;
use crate::progress::{NoProgress, ProgressEvent, ProgressObserver};
use crate::validation::validate;

/// Ids per existence lookup; well under Postgres' 65,535 bind-parameter limit
pub const DEFAULT_LOOKUP_CHUNK_SIZE: usize = 500;

#[derive(Debug, Clone, Default)]
pub struct ImportOptions {
    /// Validate and count without writing
    pub dry_run: bool,
    /// Owner applied to kinds that support one, replacing any value in the record
    pub user_id: Option<String>,
}

/// One diagnostic, addressed by input line
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowError {
    pub line: usize,
    pub field: String,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportResult {
    pub imported: usize,
    pub skipped: usize,
    pub errors: Vec<RowError>,
}

impl ImportResult {
    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    pub fn summary(&self) -> ImportSummary {
        ImportSummary {
            imported: self.imported,
            skipped: self.skipped,
            errors: self.error_count(),
            details: (!self.errors.is_empty()).then(|| ErrorDetails {
                error_details: self.errors.clone(),
            }),
        }
    }
}

/// Caller-facing shape of an [`ImportResult`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub imported: usize,
    pub skipped: usize,
    /// Number of diagnostics, not of failing records
    pub errors: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<ErrorDetails>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorDetails {
    pub error_details: Vec<RowError>,
}

#[derive(Clone)]
pub struct BatchImporter {
    store: Arc<dyn RecordStore>,
    ids: Arc<dyn IdGenerator>,
    lookup_chunk_size: usize,
    today: Option<NaiveDate>,
}

impl BatchImporter {
    pub fn new(store: Arc<dyn RecordStore>, ids: Arc<dyn IdGenerator>) -> Self {
        Self {
            store,
            ids,
            lookup_chunk_size: DEFAULT_LOOKUP_CHUNK_SIZE,
            today: None,
        }
    }

    pub fn with_lookup_chunk_size(mut self, size: usize) -> Self {
        self.lookup_chunk_size = size.max(1);
        self
    }

    /// Pin the date future-dated records are checked against.
    /// Defaults to the local date at call time.
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    /// Parse `text` and import the records it holds.
    pub async fn import_payload(
        &self,
        kind: RecordKind,
        text: &str,
        format: PayloadFormat,
        options: &ImportOptions,
    ) -> Result<ImportResult, ImportError> {
        let payload = parse_payload(kind, text, format)?;
        self.import(kind, payload.records, payload.origin, options).await
    }

    pub async fn import(
        &self,
        kind: RecordKind,
        records: Vec<Value>,
        origin: RecordOrigin,
        options: &ImportOptions,
    ) -> Result<ImportResult, ImportError> {
        self.run(kind, records, origin, options, None).await
    }

    /// Same as [`BatchImporter::import`], notifying `observer` after every
    /// `batch_size` records and after the final partial batch.
    pub async fn import_batched(
        &self,
        kind: RecordKind,
        records: Vec<Value>,
        origin: RecordOrigin,
        options: &ImportOptions,
        batch_size: usize,
        observer: &dyn ProgressObserver,
    ) -> Result<ImportResult, ImportError> {
        self.run(kind, records, origin, options, Some((batch_size.max(1), observer)))
            .await
    }

    #[instrument(skip_all, fields(table = kind.table_name(), records = records.len(), dry_run = options.dry_run))]
    async fn run(
        &self,
        kind: RecordKind,
        records: Vec<Value>,
        origin: RecordOrigin,
        options: &ImportOptions,
        progress: Option<(usize, &dyn ProgressObserver)>,
    ) -> Result<ImportResult, ImportError> {
        let total = records.len();
        let today = self.today.unwrap_or_else(|| Local::now().date_naive());
        let (batch_size, observer) = progress.unwrap_or((usize::MAX, &NoProgress));

        let records: Vec<Value> = records.into_iter().map(|r| normalize(kind, r)).collect();
        let explicit_ids = distinct_explicit_ids(&records);
        let mut known = self.lookup_existing(kind, &explicit_ids).await?;
        let stamp = self.ids.begin_run();

        let mut result = ImportResult::default();

        for (index, mut record) in records.into_iter().enumerate() {
            if kind.supports_owner() {
                if let (Some(user_id), Value::Object(fields)) = (&options.user_id, &mut record) {
                    fields.insert("userId".to_string(), Value::String(user_id.clone()));
                }
            }

            self.process_record(
                kind,
                index,
                stamp,
                record,
                origin,
                options,
                today,
                &mut known,
                &mut result,
            )
            .await;

            let processed = index + 1;
            if processed % batch_size == 0 || (progress.is_some() && processed == total) {
                observer.on_progress(&ProgressEvent::BatchProcessed {
                    kind,
                    processed,
                    total,
                });
            }
        }

        info!(
            imported = result.imported,
            skipped = result.skipped,
            errors = result.error_count(),
            "Imported {}",
            kind.label()
        );

        Ok(result)
    }

    #[allow(clippy::too_many_arguments)]
    async fn process_record(
        &self,
        kind: RecordKind,
        index: usize,
        stamp: i64,
        mut record: Value,
        origin: RecordOrigin,
        options: &ImportOptions,
        today: NaiveDate,
        known: &mut HashSet<String>,
        result: &mut ImportResult,
    ) {
        let line = origin.line_number(index);

        let diagnostics = validate(kind, &record, today);
        if !diagnostics.is_empty() {
            debug!(line, errors = diagnostics.len(), "Record failed validation");
            result
                .errors
                .extend(diagnostics.into_iter().map(|d| RowError {
                    line,
                    field: d.field,
                    message: d.message,
                }));
            return;
        }

        let Value::Object(fields) = &mut record else {
            return;
        };

        let id = match fields.get("id").and_then(Value::as_str) {
            Some(id) if known.contains(id) => {
                debug!(line, id, "Record already exists, skipping");
                result.skipped += 1;
                return;
            },
            Some(id) => id.to_string(),
            None => self.ids.generate(kind, stamp, index),
        };
        fields.insert("id".to_string(), Value::String(id.clone()));
        fields.retain(|_, v| !v.is_null());

        let row = match NormalizedRecord::from_value(kind, record) {
            Ok(row) => row,
            Err(e) => {
                result.errors.push(RowError {
                    line,
                    field: "record".to_string(),
                    message: e.to_string(),
                });
                return;
            },
        };

        if options.dry_run {
            result.imported += 1;
            known.insert(id);
            return;
        }

        match self.store.insert(&row).await {
            Ok(()) => {
                result.imported += 1;
                known.insert(id);
            },
            Err(e) => {
                warn!(line, id = %id, error = %e, "Insert failed, counting record as skipped");
                result.skipped += 1;
            },
        }
    }

    /// Union of existing ids across lookups of at most `lookup_chunk_size` ids.
    async fn lookup_existing(
        &self,
        kind: RecordKind,
        ids: &[String],
    ) -> Result<HashSet<String>, ImportError> {
        let mut existing = HashSet::new();
        if ids.is_empty() {
            return Ok(existing);
        }

        let total_chunks = ids.len().div_ceil(self.lookup_chunk_size);
        for (chunk_idx, chunk) in ids.chunks(self.lookup_chunk_size).enumerate() {
            debug!(chunk = chunk_idx + 1, total_chunks, size = chunk.len(), "Looking up existing ids");
            let found = self
                .store
                .existing_ids(kind, chunk)
                .await
                .map_err(|source| ImportError::Lookup { kind, source })?;
            existing.extend(found);
        }

        Ok(existing)
    }
}

/// Distinct string ids in first-seen order.
fn distinct_explicit_ids(records: &[Value]) -> Vec<String> {
    let mut seen = HashSet::new();
    records
        .iter()
        .filter_map(|r| r.get("id").and_then(Value::as_str))
        .filter(|id| seen.insert(*id))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::db::MemoryRecordStore;
    use crate::import::id::SequentialIdGenerator;
    use serde_json::json;

    fn importer(store: Arc<MemoryRecordStore>) -> BatchImporter {
        BatchImporter::new(store, Arc::new(SequentialIdGenerator::new()))
            .with_today(NaiveDate::from_ymd_opt(2025, 8, 10).unwrap())
    }

    fn deck(id: Option<&str>) -> Value {
        let mut record = json!({ "deckId": "dm-1", "deckName": "Aggro Sword" });
        if let Some(id) = id {
            record["id"] = json!(id);
        }
        record
    }

    #[test]
    fn test_distinct_explicit_ids_keeps_first_seen_order() {
        let records = vec![json!({ "id": "b" }), json!({}), json!({ "id": "a" }), json!({ "id": "b" })];
        assert_eq!(distinct_explicit_ids(&records), vec!["b".to_string(), "a".to_string()]);
    }

    #[tokio::test]
    async fn test_no_lookup_without_explicit_ids() {
        let store = Arc::new(MemoryRecordStore::new());
        let result = importer(store.clone())
            .import(
                RecordKind::MyDeck,
                vec![deck(None), deck(None)],
                RecordOrigin::Structured,
                &ImportOptions::default(),
            )
            .await
            .unwrap();

        assert_eq!(result.imported, 2);
        assert_eq!(store.lookup_calls(), 0);
        assert!(store.get(RecordKind::MyDeck, "md-1").await.is_some());
        assert!(store.get(RecordKind::MyDeck, "md-2").await.is_some());
    }

    #[tokio::test]
    async fn test_user_id_overrides_owner_kinds_only() {
        let store = Arc::new(MemoryRecordStore::new());
        let importer = importer(store.clone());
        let options = ImportOptions {
            dry_run: false,
            user_id: Some("user-9".to_string()),
        };

        let mut owned = deck(Some("md-a"));
        owned["userId"] = json!("someone-else");
        importer
            .import(RecordKind::MyDeck, vec![owned], RecordOrigin::Structured, &options)
            .await
            .unwrap();
        importer
            .import(
                RecordKind::DeckMaster,
                vec![json!({ "id": "dm-a", "className": "Elf", "deckName": "Fairy" })],
                RecordOrigin::Structured,
                &options,
            )
            .await
            .unwrap();

        match store.get(RecordKind::MyDeck, "md-a").await.unwrap() {
            NormalizedRecord::MyDeck(deck) => assert_eq!(deck.user_id.as_deref(), Some("user-9")),
            other => panic!("unexpected record: {:?}", other),
        }
        assert_eq!(store.count(RecordKind::DeckMaster).await, 1);
    }

    #[tokio::test]
    async fn test_summary_counts_diagnostics() {
        let store = Arc::new(MemoryRecordStore::new());
        let result = importer(store)
            .import(
                RecordKind::MyDeck,
                vec![json!({}), deck(None)],
                RecordOrigin::Tabular,
                &ImportOptions::default(),
            )
            .await
            .unwrap();

        assert_eq!(result.error_count(), 2);
        let summary = result.summary();
        assert_eq!(summary.imported, 1);
        assert_eq!(summary.errors, 2);
        let details = summary.details.unwrap();
        assert!(details.error_details.iter().all(|e| e.line == 2));

        let json = serde_json::to_value(ImportResult::default().summary()).unwrap();
        assert_eq!(json, json!({ "imported": 0, "skipped": 0, "errors": 0 }));
    }
}
