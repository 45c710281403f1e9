use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;

use crate::fingerprint::Fingerprint;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("fingerprint store unavailable: {0}")]
    Unavailable(String),
    #[error("malformed stored entry: {0}")]
    Malformed(String),
}

/// Last-known fingerprint per URL.
///
/// Lookups and writes for different URLs must not interfere with each other.
#[async_trait]
pub trait FingerprintStore: Send + Sync {
    async fn get(&self, url: &str) -> Result<Option<Fingerprint>, StoreError>;

    async fn put(&self, url: &str, fingerprint: &Fingerprint) -> Result<(), StoreError>;
}

/// Process-local store, used for dry runs and tests.
#[derive(Debug, Default)]
pub struct MemoryFingerprintStore {
    entries: Mutex<HashMap<String, Fingerprint>>,
}

impl MemoryFingerprintStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored fingerprints. A poisoned lock still reports the
    /// entries it guards.
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, Fingerprint>>, StoreError> {
        self.entries
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".into()))
    }
}

#[async_trait]
impl FingerprintStore for MemoryFingerprintStore {
    async fn get(&self, url: &str) -> Result<Option<Fingerprint>, StoreError> {
        Ok(self.lock()?.get(url).copied())
    }

    async fn put(&self, url: &str, fingerprint: &Fingerprint) -> Result<(), StoreError> {
        self.lock()?.insert(url.to_string(), *fingerprint);
        Ok(())
    }
}
