//! Battlelog Migrate Library
//!
//! Migration and bulk-import engine for the battle log tracker.
//!
//! # Overview
//!
//! - **Normalization**: legacy field shapes into target rows ([`normalize`])
//! - **Validation**: record-local, per-field diagnostics ([`validation`])
//! - **Import**: JSON/CSV payloads deduplicated against existing ids in
//!   bounded chunks and written row by row ([`import`])
//! - **Migration**: all three record kinds from memory or the object store,
//!   with progress notifications ([`migration`], [`progress`])
//! - **Rollback**: table deletes in dependency order ([`rollback`])
//! - **Storage**: Postgres rows ([`db`]) and retried JSON documents in an
//!   S3-compatible store ([`storage`])
//!
//! # Outcomes
//!
//! Every imported record ends up in exactly one bucket:
//!
//! - **imported**: written (or counted as written in a dry run)
//! - **skipped**: valid but not written, because its id already exists or
//!   the store refused the insert
//! - **errors**: rejected by validation, one diagnostic per invalid field
//!
//! Malformed payloads, missing legacy documents, failed id lookups and
//! exhausted retries abort the whole call instead.
//!
//! # Example
//!
//! ```no_run
//! use battlelog_migrate::db::MemoryRecordStore;
//! use battlelog_migrate::import::{BatchImporter, ImportOptions, PayloadFormat, TimestampIdGenerator};
//! use battlelog_common::types::RecordKind;
//! use std::sync::Arc;
//!
//! # async fn run() -> anyhow::Result<()> {
//! let importer = BatchImporter::new(
//!     Arc::new(MemoryRecordStore::new()),
//!     Arc::new(TimestampIdGenerator::new()),
//! );
//! let result = importer
//!     .import_payload(
//!         RecordKind::MyDeck,
//!         "deckId,deckName\n1,Aggro Sword\n",
//!         PayloadFormat::Csv,
//!         &ImportOptions::default(),
//!     )
//!     .await?;
//! println!("{}", serde_json::to_string(&result.summary())?);
//! # Ok(())
//! # }
//! ```

#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod config;
pub mod db;
pub mod error;
pub mod import;
pub mod migration;
pub mod normalize;
pub mod progress;
pub mod rollback;
pub mod storage;
pub mod validation;

pub use error::{FormatError, ImportError, MigrationError, MigrationResult};
