use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Mutex;

use super::ObjectStore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub body: Vec<u8>,
    pub content_type: String,
}

/// Object store kept in memory.
///
/// `fail_next(n)` makes the next `n` calls (get or put) fail with a transport
/// error before touching the map, which is how retry behavior is exercised.
#[derive(Default)]
pub struct MemoryObjectStore {
    objects: Mutex<HashMap<String, StoredObject>>,
    pending_failures: AtomicUsize,
    get_calls: AtomicUsize,
    put_calls: AtomicUsize,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, key: impl Into<String>, body: impl Into<Vec<u8>>) {
        self.objects.lock().await.insert(
            key.into(),
            StoredObject {
                body: body.into(),
                content_type: super::JSON_CONTENT_TYPE.to_string(),
            },
        );
    }

    pub async fn object(&self, key: &str) -> Option<StoredObject> {
        self.objects.lock().await.get(key).cloned()
    }

    pub fn fail_next(&self, calls: usize) {
        self.pending_failures.store(calls, Ordering::SeqCst);
    }

    pub fn get_calls(&self) -> usize {
        self.get_calls.load(Ordering::SeqCst)
    }

    pub fn put_calls(&self) -> usize {
        self.put_calls.load(Ordering::SeqCst)
    }

    fn take_failure(&self) -> bool {
        self.pending_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        if self.take_failure() {
            return Err(anyhow!("connection reset while reading {}", key));
        }
        Ok(self.objects.lock().await.get(key).map(|o| o.body.clone()))
    }

    async fn put(&self, key: &str, body: Vec<u8>, content_type: &str) -> Result<()> {
        self.put_calls.fetch_add(1, Ordering::SeqCst);
        if self.take_failure() {
            return Err(anyhow!("connection reset while writing {}", key));
        }
        self.objects.lock().await.insert(
            key.to_string(),
            StoredObject {
                body,
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }
}
