//! In-process record store
//!
//! Holds rows in ordered maps keyed by id and counts every call, so dry runs,
//! chunked lookups and rollbacks can be checked without a database. Failures
//! can be injected per id (insert) or per table (delete).

use async_trait::async_trait;
use battlelog_common::types::{NormalizedRecord, RecordKind};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Mutex;

use super::{DbError, DbResult, RecordStore};

#[derive(Default)]
struct Tables {
    rows: HashMap<RecordKind, BTreeMap<String, NormalizedRecord>>,
    rejected_ids: HashSet<String>,
    failing_deletes: HashSet<RecordKind>,
}

#[derive(Default)]
pub struct MemoryRecordStore {
    tables: Mutex<Tables>,
    lookup_calls: AtomicUsize,
    insert_calls: AtomicUsize,
    delete_calls: AtomicUsize,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with `records`.
    pub async fn with_records(records: impl IntoIterator<Item = NormalizedRecord>) -> Self {
        let store = Self::new();
        {
            let mut tables = store.tables.lock().await;
            for record in records {
                tables
                    .rows
                    .entry(record.kind())
                    .or_default()
                    .insert(record.id().to_string(), record);
            }
        }
        store
    }

    /// Make every future insert of `id` fail with a non-duplicate error.
    pub async fn reject_insert_of(&self, id: impl Into<String>) {
        self.tables.lock().await.rejected_ids.insert(id.into());
    }

    /// Make every future `delete_all` on `kind` fail.
    pub async fn fail_deletes_of(&self, kind: RecordKind) {
        self.tables.lock().await.failing_deletes.insert(kind);
    }

    pub async fn count(&self, kind: RecordKind) -> usize {
        self.tables
            .lock()
            .await
            .rows
            .get(&kind)
            .map(BTreeMap::len)
            .unwrap_or(0)
    }

    pub async fn get(&self, kind: RecordKind, id: &str) -> Option<NormalizedRecord> {
        self.tables
            .lock()
            .await
            .rows
            .get(&kind)
            .and_then(|table| table.get(id))
            .cloned()
    }

    pub fn lookup_calls(&self) -> usize {
        self.lookup_calls.load(Ordering::SeqCst)
    }

    pub fn insert_calls(&self) -> usize {
        self.insert_calls.load(Ordering::SeqCst)
    }

    pub fn delete_calls(&self) -> usize {
        self.delete_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn existing_ids(&self, kind: RecordKind, ids: &[String]) -> DbResult<HashSet<String>> {
        self.lookup_calls.fetch_add(1, Ordering::SeqCst);
        let tables = self.tables.lock().await;
        let Some(table) = tables.rows.get(&kind) else {
            return Ok(HashSet::new());
        };
        Ok(ids.iter().filter(|id| table.contains_key(*id)).cloned().collect())
    }

    async fn insert(&self, record: &NormalizedRecord) -> DbResult<()> {
        self.insert_calls.fetch_add(1, Ordering::SeqCst);
        let mut tables = self.tables.lock().await;

        if tables.rejected_ids.contains(record.id()) {
            return Err(DbError::Rejected(format!(
                "insert of '{}' into {} rejected",
                record.id(),
                record.kind().table_name()
            )));
        }

        let table = tables.rows.entry(record.kind()).or_default();
        if table.contains_key(record.id()) {
            return Err(DbError::duplicate(record.kind(), record.id()));
        }
        table.insert(record.id().to_string(), record.clone());
        Ok(())
    }

    async fn delete_all(&self, kind: RecordKind) -> DbResult<u64> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        let mut tables = self.tables.lock().await;

        if tables.failing_deletes.contains(&kind) {
            return Err(DbError::Rejected(format!(
                "delete from {} failed",
                kind.table_name()
            )));
        }

        let removed = tables.rows.remove(&kind).map(|t| t.len()).unwrap_or(0);
        Ok(removed as u64)
    }
}
