//! Configuration management

use serde::Serialize;
use std::time::Duration;

use crate::db::DbConfig;
use crate::import::DEFAULT_LOOKUP_CHUNK_SIZE;
use crate::migration::{DocumentNames, DEFAULT_BATCH_SIZE};
use crate::storage::client::{DEFAULT_BASE_DELAY_MS, DEFAULT_MAX_ATTEMPTS};
use crate::storage::{RetryPolicy, StorageConfig};

/// Migration tool configuration
#[derive(Debug, Clone)]
pub struct MigrateConfig {
    pub database: DbConfig,
    pub storage: StorageConfig,
    pub engine: EngineConfig,
    pub documents: DocumentNames,
}

/// Batching and retry knobs
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EngineConfig {
    pub lookup_chunk_size: usize,
    pub batch_size: usize,
    pub store_max_attempts: u32,
    pub store_retry_base_delay_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            lookup_chunk_size: DEFAULT_LOOKUP_CHUNK_SIZE,
            batch_size: DEFAULT_BATCH_SIZE,
            store_max_attempts: DEFAULT_MAX_ATTEMPTS,
            store_retry_base_delay_ms: DEFAULT_BASE_DELAY_MS,
        }
    }
}

impl EngineConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            lookup_chunk_size: env_or("IMPORT_LOOKUP_CHUNK_SIZE", defaults.lookup_chunk_size),
            batch_size: env_or("MIGRATION_BATCH_SIZE", defaults.batch_size),
            store_max_attempts: env_or("STORE_MAX_ATTEMPTS", defaults.store_max_attempts),
            store_retry_base_delay_ms: env_or(
                "STORE_RETRY_BASE_DELAY_MS",
                defaults.store_retry_base_delay_ms,
            ),
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.store_max_attempts,
            Duration::from_millis(self.store_retry_base_delay_ms),
        )
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

fn documents_from_env() -> DocumentNames {
    let defaults = DocumentNames::default();
    DocumentNames {
        deck_masters: std::env::var("LEGACY_DECK_MASTER_DOC").unwrap_or(defaults.deck_masters),
        my_decks: std::env::var("LEGACY_MY_DECKS_DOC").unwrap_or(defaults.my_decks),
        battle_logs: std::env::var("LEGACY_BATTLE_LOGS_DOC").unwrap_or(defaults.battle_logs),
    }
}

impl MigrateConfig {
    /// Load configuration from `.env`, the environment and defaults
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let database = match DbConfig::from_env() {
            Ok(database) => database,
            Err(e) => {
                tracing::warn!("{}; using the local default database", e);
                DbConfig::default()
            },
        };

        let config = Self {
            database,
            storage: StorageConfig::from_env(),
            engine: EngineConfig::from_env(),
            documents: documents_from_env(),
        };

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.database.url.is_empty() {
            anyhow::bail!("Database URL cannot be empty");
        }

        if self.database.max_connections == 0 {
            anyhow::bail!("Database max_connections must be greater than 0");
        }

        if self.storage.bucket.is_empty() {
            anyhow::bail!("S3 bucket cannot be empty");
        }

        if self.engine.lookup_chunk_size == 0 {
            anyhow::bail!("IMPORT_LOOKUP_CHUNK_SIZE must be greater than 0");
        }

        if self.engine.batch_size == 0 {
            anyhow::bail!("MIGRATION_BATCH_SIZE must be greater than 0");
        }

        if self.engine.store_max_attempts == 0 {
            anyhow::bail!("STORE_MAX_ATTEMPTS must be greater than 0");
        }

        for kind in battlelog_common::types::RecordKind::MIGRATION_ORDER {
            if self.documents.name(kind).trim().is_empty() {
                anyhow::bail!("Legacy document name for {} cannot be empty", kind.label());
            }
        }

        Ok(())
    }
}
