//! Retrying JSON document client
//!
//! This is the only component that performs I/O against the object store.
//! Every read or write is attempted up to [`RetryPolicy::max_attempts`] times;
//! before retry `n` (zero-based attempt index of the failed try) the client
//! sleeps `base_delay * 2^n`.
//!
//! A document that does not exist is not a transport failure: the read fails
//! immediately with [`DocumentError::Missing`] and is never retried.

use anyhow::Context;
use serde::{de::DeserializeOwned, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, instrument, warn};

use super::{ObjectStore, JSON_CONTENT_TYPE};

/// Default number of attempts per document operation
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default delay before the first retry
pub const DEFAULT_BASE_DELAY_MS: u64 = 1_000;

#[derive(Error, Debug)]
pub enum DocumentError {
    #[error("Document '{0}' not found in object store")]
    Missing(String),

    #[error("Failed to {operation} document '{name}' after {attempts} attempts: {message}")]
    Exhausted {
        operation: &'static str,
        name: String,
        attempts: u32,
        message: String,
    },

    #[error("Failed to serialize document '{name}': {source}")]
    Serialize {
        name: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: Duration::from_millis(DEFAULT_BASE_DELAY_MS),
        }
    }
}

impl RetryPolicy {
    /// `max_attempts` is clamped to at least one.
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    /// Delay to wait after the attempt with zero-based index `attempt` failed.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(1u32 << attempt.min(20))
    }
}

#[derive(Clone)]
pub struct DocumentClient {
    store: Arc<dyn ObjectStore>,
    policy: RetryPolicy,
}

impl DocumentClient {
    pub fn new(store: Arc<dyn ObjectStore>, policy: RetryPolicy) -> Self {
        Self { store, policy }
    }

    /// Download `name`, decode it as UTF-8 and parse it as JSON.
    #[instrument(skip(self))]
    pub async fn read_json<T: DeserializeOwned>(&self, name: &str) -> Result<T, DocumentError> {
        self.with_retry("read", name, move || async move {
            let Some(bytes) = self.store.get(name).await? else {
                return Ok(None);
            };
            let text = String::from_utf8(bytes).context("Document is not valid UTF-8")?;
            let value: T = serde_json::from_str(&text).context("Document is not valid JSON")?;
            Ok::<_, anyhow::Error>(Some(value))
        })
        .await
    }

    /// Serialize `value` as pretty-printed JSON and upload it as `name`,
    /// replacing any existing document.
    #[instrument(skip(self, value))]
    pub async fn write_json<T: Serialize + ?Sized>(
        &self,
        name: &str,
        value: &T,
    ) -> Result<(), DocumentError> {
        let body = serde_json::to_vec_pretty(value).map_err(|source| DocumentError::Serialize {
            name: name.to_string(),
            source,
        })?;

        self.with_retry("write", name, move || {
            let body = body.clone();
            async move {
                self.store.put(name, body, JSON_CONTENT_TYPE).await?;
                Ok::<_, anyhow::Error>(Some(()))
            }
        })
        .await
    }

    async fn with_retry<T, F, Fut>(
        &self,
        operation: &'static str,
        name: &str,
        mut attempt_once: F,
    ) -> Result<T, DocumentError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = anyhow::Result<Option<T>>>,
    {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut last_error = String::new();

        for attempt in 0..max_attempts {
            debug!(document = name, attempt = attempt + 1, max_attempts, "{} attempt", operation);

            match attempt_once().await {
                Ok(Some(value)) => return Ok(value),
                Ok(None) => return Err(DocumentError::Missing(name.to_string())),
                Err(err) => {
                    last_error = format!("{:#}", err);
                    if attempt + 1 < max_attempts {
                        let delay = self.policy.backoff_delay(attempt);
                        warn!(
                            document = name,
                            attempt = attempt + 1,
                            max_attempts,
                            delay_ms = delay.as_millis() as u64,
                            error = %last_error,
                            "Document {} failed, retrying",
                            operation
                        );
                        tokio::time::sleep(delay).await;
                    }
                },
            }
        }

        Err(DocumentError::Exhausted {
            operation,
            name: name.to_string(),
            attempts: max_attempts,
            message: last_error,
        })
    }
}
