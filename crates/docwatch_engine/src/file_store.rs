use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use docwatch_core::{Fingerprint, FingerprintStore, StoreError};
use docwatch_logging::{watch_debug, watch_info};
use serde::{Deserialize, Serialize};

use crate::persist::AtomicFileWriter;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct StoredEntry {
    hash: String,
    updated_utc: String,
}

type Entries = BTreeMap<String, StoredEntry>;

/// Fingerprints kept in a RON file keyed by URL.
///
/// The file is read on first access and rewritten atomically on every `put`.
/// File access runs on tokio's blocking pool.
pub struct FileFingerprintStore {
    state: Arc<FileState>,
    clock: Arc<dyn Fn() -> String + Send + Sync>,
}

struct FileState {
    writer: AtomicFileWriter,
    entries: Mutex<Option<Entries>>,
}

impl FileFingerprintStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            state: Arc::new(FileState {
                writer: AtomicFileWriter::new(path.into()),
                entries: Mutex::new(None),
            }),
            clock: Arc::new(|| Utc::now().to_rfc3339()),
        }
    }

    /// Replaces the timestamp source written next to each fingerprint.
    pub fn with_clock(mut self, clock: Arc<dyn Fn() -> String + Send + Sync>) -> Self {
        self.clock = clock;
        self
    }

    pub fn path(&self) -> &Path {
        self.state.path()
    }

    async fn blocking<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&FileState) -> Result<T, StoreError> + Send + 'static,
    {
        let state = Arc::clone(&self.state);
        tokio::task::spawn_blocking(move || f(&state))
            .await
            .map_err(|err| StoreError::Unavailable(format!("fingerprint file task failed: {err}")))?
    }
}

impl FileState {
    fn path(&self) -> &Path {
        self.writer.target()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Option<Entries>>, StoreError> {
        self.entries
            .lock()
            .map_err(|_| StoreError::Unavailable("fingerprint file lock poisoned".into()))
    }

    fn load(&self) -> Result<Entries, StoreError> {
        let path = self.path();
        let content = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                watch_info!("No fingerprint file at {:?}; starting empty", path);
                return Ok(Entries::new());
            }
            Err(err) => {
                return Err(StoreError::Unavailable(format!(
                    "failed to read {}: {err}",
                    path.display()
                )))
            }
        };
        let entries: Entries = ron::from_str(&content).map_err(|err| {
            StoreError::Malformed(format!("failed to parse {}: {err}", path.display()))
        })?;
        watch_debug!("Loaded {} fingerprints from {:?}", entries.len(), path);
        Ok(entries)
    }

    fn with_entries<T>(
        &self,
        f: impl FnOnce(&mut Entries) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut guard = self.lock()?;
        if guard.is_none() {
            *guard = Some(self.load()?);
        }
        match guard.as_mut() {
            Some(entries) => f(entries),
            None => Err(StoreError::Unavailable("fingerprint file not loaded".into())),
        }
    }

    fn save(&self, entries: &Entries) -> Result<(), StoreError> {
        let pretty = ron::ser::PrettyConfig::new();
        let content = ron::ser::to_string_pretty(entries, pretty)
            .map_err(|err| StoreError::Unavailable(format!("failed to serialize: {err}")))?;
        self.writer.write(&content).map_err(|err| {
            StoreError::Unavailable(format!("failed to write {}: {err}", self.path().display()))
        })
    }
}

#[async_trait]
impl FingerprintStore for FileFingerprintStore {
    async fn get(&self, url: &str) -> Result<Option<Fingerprint>, StoreError> {
        let url = url.to_string();
        self.blocking(move |state| {
            state.with_entries(|entries| {
                entries
                    .get(&url)
                    .map(|entry| entry.hash.parse::<Fingerprint>())
                    .transpose()
            })
        })
        .await
    }

    async fn put(&self, url: &str, fingerprint: &Fingerprint) -> Result<(), StoreError> {
        let url = url.to_string();
        let entry = StoredEntry {
            hash: fingerprint.to_hex(),
            updated_utc: (self.clock)(),
        };
        self.blocking(move |state| {
            state.with_entries(|entries| {
                let previous = entries.insert(url.clone(), entry);
                if let Err(err) = state.save(entries) {
                    // Keep memory consistent with what is on disk.
                    match previous {
                        Some(entry) => entries.insert(url, entry),
                        None => entries.remove(&url),
                    };
                    return Err(err);
                }
                Ok(())
            })
        })
        .await
    }
}
