//! Object store access for legacy JSON documents
//!
//! - [`ObjectStore`]: whole-object get/put against a bucket-like store
//! - [`S3ObjectStore`]: S3-compatible implementation (AWS, MinIO)
//! - [`MemoryObjectStore`]: in-process implementation for tests and local runs
//! - [`DocumentClient`]: JSON read/write with bounded exponential-backoff retry

use anyhow::Result;
use async_trait::async_trait;

pub mod client;
pub mod config;
pub mod memory;
pub mod s3;

pub use client::{DocumentClient, DocumentError, RetryPolicy};
pub use config::StorageConfig;
pub use memory::MemoryObjectStore;
pub use s3::S3ObjectStore;

pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Whole-object storage. A put replaces the previous object entirely.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Fetch an object. `Ok(None)` means the key does not exist.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    async fn put(&self, key: &str, body: Vec<u8>, content_type: &str) -> Result<()>;
}
