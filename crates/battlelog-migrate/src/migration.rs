//! Legacy data migration
//!
//! Drives the [`BatchImporter`] over deck masters, personal decks and battle
//! logs, in that order, from either in-memory records or the three legacy
//! JSON documents in the object store.

use battlelog_common::types::RecordKind;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use serde_json::Value;
use std::path::Path;
use std::time::Instant;
use tracing::{info, instrument};

use crate::error::{MigrationError, MigrationResult};
use crate::import::{BatchImporter, ImportOptions, ImportResult, RecordOrigin};
use crate::progress::{ProgressEvent, ProgressObserver};
use crate::storage::{DocumentClient, DocumentError};

/// Records per progress notification
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// Legacy records already in memory, one list per kind
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LocalRecords {
    pub deck_masters: Vec<Value>,
    pub my_decks: Vec<Value>,
    pub battle_logs: Vec<Value>,
}

impl LocalRecords {
    fn slot(&mut self, kind: RecordKind) -> &mut Vec<Value> {
        match kind {
            RecordKind::DeckMaster => &mut self.deck_masters,
            RecordKind::MyDeck => &mut self.my_decks,
            RecordKind::BattleLog => &mut self.battle_logs,
        }
    }

    fn take(&mut self, kind: RecordKind) -> Vec<Value> {
        std::mem::take(self.slot(kind))
    }

    /// Read the legacy documents from `dir` using their well-known names.
    pub async fn from_dir(dir: &Path, names: &DocumentNames) -> MigrationResult<Self> {
        let mut records = Self::default();
        for kind in RecordKind::MIGRATION_ORDER {
            let name = names.name(kind);
            let path = dir.join(name);
            let text = tokio::fs::read_to_string(&path).await.map_err(|source| {
                if source.kind() == std::io::ErrorKind::NotFound {
                    MigrationError::MissingDocument(name.to_string())
                } else {
                    MigrationError::Io { path, source }
                }
            })?;
            let document: Value =
                serde_json::from_str(&text).map_err(|e| MigrationError::InvalidDocument {
                    name: name.to_string(),
                    message: e.to_string(),
                })?;
            *records.slot(kind) = legacy_records(kind, name, document)?;
        }
        Ok(records)
    }
}

/// Object names of the three legacy documents
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentNames {
    pub deck_masters: String,
    pub my_decks: String,
    pub battle_logs: String,
}

impl Default for DocumentNames {
    fn default() -> Self {
        Self {
            deck_masters: RecordKind::DeckMaster.legacy_document().to_string(),
            my_decks: RecordKind::MyDeck.legacy_document().to_string(),
            battle_logs: RecordKind::BattleLog.legacy_document().to_string(),
        }
    }
}

impl DocumentNames {
    pub fn name(&self, kind: RecordKind) -> &str {
        match kind {
            RecordKind::DeckMaster => &self.deck_masters,
            RecordKind::MyDeck => &self.my_decks,
            RecordKind::BattleLog => &self.battle_logs,
        }
    }
}

/// Exactly one source is read per run.
pub enum DataSource {
    Local(LocalRecords),
    Remote {
        client: DocumentClient,
        names: DocumentNames,
    },
}

#[derive(Debug, Clone)]
pub struct MigrationOptions {
    pub dry_run: bool,
    /// Owner for personal decks and battle logs
    pub user_id: Option<String>,
    pub batch_size: usize,
}

impl Default for MigrationOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            user_id: None,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationReport {
    pub deck_masters: ImportResult,
    pub my_decks: ImportResult,
    pub battle_logs: ImportResult,
    pub total_time_ms: u64,
    pub completed_at: DateTime<Utc>,
}

impl MigrationReport {
    pub fn result(&self, kind: RecordKind) -> &ImportResult {
        match kind {
            RecordKind::DeckMaster => &self.deck_masters,
            RecordKind::MyDeck => &self.my_decks,
            RecordKind::BattleLog => &self.battle_logs,
        }
    }

    /// Object name the report is saved under
    pub fn document_name(&self) -> String {
        format!(
            "reports/migration-{}.json",
            self.completed_at.to_rfc3339_opts(SecondsFormat::Millis, true)
        )
    }
}

/// Extract the record array of a legacy document.
///
/// Accepts a bare array or an object holding the array under the kind's
/// camelCase key, e.g. `{"battleLogs": [...]}`.
pub fn legacy_records(kind: RecordKind, name: &str, document: Value) -> MigrationResult<Vec<Value>> {
    match document {
        Value::Array(records) => Ok(records),
        Value::Object(mut fields) => match fields.remove(kind.camel_name()) {
            Some(Value::Array(records)) => Ok(records),
            _ => Err(MigrationError::InvalidDocument {
                name: name.to_string(),
                message: format!("expected an array or an object with a '{}' array", kind.camel_name()),
            }),
        },
        _ => Err(MigrationError::InvalidDocument {
            name: name.to_string(),
            message: "expected a JSON array".to_string(),
        }),
    }
}

pub struct Migrator {
    importer: BatchImporter,
}

impl Migrator {
    pub fn new(importer: BatchImporter) -> Self {
        Self { importer }
    }

    #[instrument(skip_all, fields(dry_run = options.dry_run, batch_size = options.batch_size))]
    pub async fn run(
        &self,
        source: DataSource,
        options: &MigrationOptions,
        observer: &dyn ProgressObserver,
    ) -> MigrationResult<MigrationReport> {
        let started = Instant::now();

        let mut records = match source {
            DataSource::Local(records) => records,
            DataSource::Remote { client, names } => load_remote(&client, &names).await?,
        };

        let import_options = ImportOptions {
            dry_run: options.dry_run,
            user_id: options.user_id.clone(),
        };

        let mut results: [ImportResult; 3] = Default::default();
        for (slot, kind) in results.iter_mut().zip(RecordKind::MIGRATION_ORDER) {
            observer.on_progress(&ProgressEvent::KindStarted { kind });

            *slot = self
                .importer
                .import_batched(
                    kind,
                    records.take(kind),
                    RecordOrigin::Structured,
                    &import_options,
                    options.batch_size,
                    observer,
                )
                .await?;
        }

        let total_time_ms = started.elapsed().as_millis() as u64;
        let completed_at = Utc::now();
        observer.on_progress(&ProgressEvent::Completed {
            elapsed_ms: total_time_ms,
        });

        let [deck_masters, my_decks, battle_logs] = results;
        info!(total_time_ms, "Migration finished");

        Ok(MigrationReport {
            deck_masters,
            my_decks,
            battle_logs,
            total_time_ms,
            completed_at,
        })
    }

    /// Store `report` next to the legacy documents and return its name.
    pub async fn save_report(
        client: &DocumentClient,
        report: &MigrationReport,
    ) -> Result<String, DocumentError> {
        let name = report.document_name();
        client.write_json(&name, report).await?;
        info!(document = %name, "Migration report saved");
        Ok(name)
    }
}

/// Read all three documents before anything is imported.
async fn load_remote(client: &DocumentClient, names: &DocumentNames) -> MigrationResult<LocalRecords> {
    let mut records = LocalRecords::default();
    for kind in RecordKind::MIGRATION_ORDER {
        let name = names.name(kind);
        info!(document = name, "Loading legacy document");
        let document: Value = client.read_json(name).await?;
        *records.slot(kind) = legacy_records(kind, name, document)?;
    }
    Ok(records)
}
