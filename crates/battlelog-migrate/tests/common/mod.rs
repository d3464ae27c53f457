//! Shared fixtures for battlelog-migrate integration tests
//!
//! Most tests run against [`MemoryRecordStore`] and [`MemoryObjectStore`].
//! [`TestPostgres`] starts a throwaway PostgreSQL container and needs Docker.

#![allow(dead_code)]

use anyhow::{Context, Result};
use battlelog_migrate::db::{run_migrations, MemoryRecordStore};
use battlelog_migrate::import::{BatchImporter, SequentialIdGenerator};
use battlelog_migrate::storage::{DocumentClient, MemoryObjectStore, RetryPolicy};
use chrono::NaiveDate;
use serde_json::{json, Value};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use testcontainers::{core::IntoContainerPort, runners::AsyncRunner, ContainerAsync, ImageExt};
use testcontainers_modules::postgres::Postgres;

use battlelog_migrate::progress::ProgressEvent;

/// Date every importer in these tests treats as "today"
pub fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 8, 10).unwrap()
}

pub fn importer(store: Arc<MemoryRecordStore>) -> BatchImporter {
    BatchImporter::new(store, Arc::new(SequentialIdGenerator::new())).with_today(today())
}

pub fn document_client(store: Arc<MemoryObjectStore>) -> DocumentClient {
    DocumentClient::new(store, RetryPolicy::new(3, Duration::from_millis(1_000)))
}

/// Legacy-shaped battle log with the given date
pub fn legacy_battle_log(date: &str) -> Value {
    json!({
        "date": date,
        "battleType": "ランクマッチ",
        "rank": "サファイア",
        "group": "A",
        "myDeckId": "1",
        "turn": "後攻",
        "result": "WIN",
        "opponentDeckId": "3"
    })
}

pub fn battle_log_with_id(id: &str) -> Value {
    let mut record = legacy_battle_log("2025/08/07");
    record["id"] = json!(id);
    record
}

pub fn deck_master(id: &str) -> Value {
    json!({ "id": id, "className": "Elf", "deckName": "Fairy Elf", "season": "3" })
}

pub fn my_deck(id: &str) -> Value {
    json!({ "id": id, "deckId": "dm-1", "deckName": "Aggro Sword" })
}

/// Collects event messages in the order they were emitted.
#[derive(Default)]
pub struct RecordingObserver {
    messages: Mutex<Vec<String>>,
}

impl RecordingObserver {
    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }
}

impl battlelog_migrate::progress::ProgressObserver for RecordingObserver {
    fn on_progress(&self, event: &ProgressEvent) {
        self.messages.lock().unwrap().push(event.to_string());
    }
}

// ============================================================================
// PostgreSQL Test Container
// ============================================================================

pub struct TestPostgres {
    _container: ContainerAsync<Postgres>,
    pool: PgPool,
}

impl TestPostgres {
    /// Start PostgreSQL and apply the bundled migrations.
    pub async fn start() -> Result<Self> {
        let container = Postgres::default()
            .with_tag("16-alpine")
            .start()
            .await
            .context("Failed to start PostgreSQL container")?;

        let host = container
            .get_host()
            .await
            .context("Failed to get container host")?;
        let port = container
            .get_host_port_ipv4(5432.tcp())
            .await
            .context("Failed to get container port")?;

        let pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(30))
            .connect(&format!("postgresql://postgres:postgres@{}:{}/postgres", host, port))
            .await
            .context("Failed to connect to PostgreSQL")?;

        run_migrations(&pool).await.context("Failed to run migrations")?;

        Ok(Self {
            _container: container,
            pool,
        })
    }

    pub fn pool(&self) -> PgPool {
        self.pool.clone()
    }
}
