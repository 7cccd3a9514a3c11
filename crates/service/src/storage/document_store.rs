use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::Arc,
};

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;
use tokio::{
    fs,
    io::AsyncWriteExt,
    sync::{Mutex, OwnedMutexGuard},
};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{key::ValidKey, CollectionStore};
use crate::errors::StoreError;
use crate::metrics;

/// File-backed document store: one pretty-printed JSON file per key.
///
/// Writes go to a temporary sibling and are renamed over the target, so a
/// reader or a crash never observes a half-written document. Operations on
/// the same key are serialized by a per-key async mutex; different keys do
/// not contend.
pub struct DocumentStore {
    base_dir: PathBuf,
    locks: DashMap<ValidKey, Arc<Mutex<()>>>,
}

impl DocumentStore {
    /// Open the store rooted at `base_dir`, creating the directory if missing.
    pub async fn open<P: Into<PathBuf>>(base_dir: P) -> Result<Arc<Self>, StoreError> {
        let base_dir = base_dir.into();
        fs::create_dir_all(&base_dir)
            .await
            .map_err(|e| StoreError::io(&base_dir, e))?;
        info!(data_dir = %base_dir.display(), "document store opened");
        Ok(Arc::new(Self { base_dir, locks: DashMap::new() }))
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn path_for(&self, key: &ValidKey) -> PathBuf {
        self.base_dir.join(key.file_name())
    }

    pub async fn exists(&self, key: &ValidKey) -> bool {
        fs::try_exists(self.path_for(key)).await.unwrap_or(false)
    }

    async fn lock_key<'a>(&'a self, key: &'a ValidKey) -> KeyGuard<'a> {
        let lock = {
            let entry = self.locks.entry(key.clone()).or_default();
            Arc::clone(entry.value())
        };
        KeyGuard { locks: &self.locks, key, guard: Some(lock.lock_owned().await) }
    }

    /// Serialize `value` and replace whatever is stored under `key`.
    pub async fn save(&self, key: &ValidKey, value: &Value) -> Result<(), StoreError> {
        let _guard = self.lock_key(key).await;
        self.write_atomic(key, value).await?;
        metrics::SAVES_TOTAL.inc();
        Ok(())
    }

    /// Read the document under `key`. A missing file is created from
    /// `default_value`; a file that does not parse is reported as
    /// [`StoreError::Corrupt`] and left as is.
    pub async fn load(&self, key: &ValidKey, default_value: Value) -> Result<Value, StoreError> {
        let _guard = self.lock_key(key).await;
        metrics::LOADS_TOTAL.inc();

        let path = self.path_for(key);
        match fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|source| {
                metrics::CORRUPT_DOCUMENTS_TOTAL.inc();
                warn!(%key, path = %path.display(), error = %source, "stored document is not valid JSON");
                StoreError::Corrupt { path, source }
            }),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                self.write_atomic(key, &default_value).await?;
                metrics::DEFAULTS_WRITTEN_TOTAL.inc();
                debug!(%key, "collection created from default");
                Ok(default_value)
            }
            Err(e) => {
                metrics::STORE_ERRORS_TOTAL.inc();
                Err(StoreError::io(path, e))
            }
        }
    }

    // Callers hold the key's lock.
    async fn write_atomic(&self, key: &ValidKey, value: &Value) -> Result<(), StoreError> {
        let data = serde_json::to_vec_pretty(value)?;
        let target = self.path_for(key);
        let tmp = self
            .base_dir
            .join(format!(".{}.{}.tmp", key.file_name(), Uuid::new_v4()));

        let result = async {
            fs::create_dir_all(&self.base_dir)
                .await
                .map_err(|e| StoreError::io(&self.base_dir, e))?;
            write_and_sync(&tmp, &data)
                .await
                .map_err(|e| StoreError::io(&tmp, e))?;
            fs::rename(&tmp, &target)
                .await
                .map_err(|e| StoreError::io(&target, e))
        }
        .await;

        if let Err(e) = result {
            metrics::STORE_ERRORS_TOTAL.inc();
            let _ = fs::remove_file(&tmp).await;
            return Err(e);
        }
        debug!(%key, bytes = data.len(), "document written");
        Ok(())
    }
}

/// Holds a key's mutex; on drop, removes the mutex from the table when no
/// other task holds or waits on it.
struct KeyGuard<'a> {
    locks: &'a DashMap<ValidKey, Arc<Mutex<()>>>,
    key: &'a ValidKey,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for KeyGuard<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());
        self.locks.remove_if(self.key, |_, lock| Arc::strong_count(lock) == 1);
    }
}

async fn write_and_sync(path: &Path, data: &[u8]) -> std::io::Result<()> {
    let mut file = fs::File::create(path).await?;
    file.write_all(data).await?;
    file.sync_all().await?;
    Ok(())
}

#[async_trait]
impl CollectionStore for DocumentStore {
    async fn load(&self, key: &ValidKey, default_value: Value) -> Result<Value, StoreError> {
        DocumentStore::load(self, key, default_value).await
    }

    async fn save(&self, key: &ValidKey, value: &Value) -> Result<(), StoreError> {
        DocumentStore::save(self, key, value).await
    }
}
