use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::error::StorageError;
use crate::prompt::Prompt;

pub const COLLECTION_KEY: &str = "prompts";

/// Local key-value persistence, shaped like a browser's `storage.local`.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Value>, StorageError>;
    async fn set(&self, key: &str, value: Value) -> Result<(), StorageError>;
}

/// All keys live as members of one JSON object on disk.
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        JsonFileStore { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_document(&self) -> Result<Map<String, Value>, StorageError> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Map::new()),
            Err(source) => {
                return Err(StorageError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };
        if raw.trim().is_empty() {
            return Ok(Map::new());
        }
        serde_json::from_str(&raw).map_err(|source| StorageError::Corrupt {
            path: self.path.clone(),
            source,
        })
    }

    async fn write_document(
        &self,
        key: &str,
        document: &Map<String, Value>,
    ) -> Result<(), StorageError> {
        let io_err = |source: std::io::Error| StorageError::Io {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
        }
        let serialized = serde_json::to_vec(document).map_err(|source| StorageError::Encode {
            key: key.to_string(),
            source,
        })?;

        // Replace via rename so readers never see a half-written document.
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, serialized).await.map_err(io_err)?;
        tokio::fs::rename(&tmp, &self.path).await.map_err(io_err)?;
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for JsonFileStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, StorageError> {
        let mut document = self.read_document().await?;
        Ok(document.remove(key).filter(|v| !v.is_null()))
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), StorageError> {
        let mut document = self.read_document().await?;
        document.insert(key.to_string(), value);
        self.write_document(key, &document).await?;
        tracing::debug!(key, path = %self.path.display(), "Wrote storage document");
        Ok(())
    }
}

#[cfg(test)]
#[derive(Default)]
pub struct MemoryStore {
    values: tokio::sync::RwLock<std::collections::HashMap<String, Value>>,
}

#[cfg(test)]
#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, StorageError> {
        Ok(self.values.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), StorageError> {
        self.values.write().await.insert(key.to_string(), value);
        Ok(())
    }
}

/// Accepts reads, fails writes once `broken` is set.
#[cfg(test)]
#[derive(Default)]
pub struct FlakyStore {
    pub inner: MemoryStore,
    pub broken: std::sync::Arc<std::sync::atomic::AtomicBool>,
}

#[cfg(test)]
#[async_trait]
impl KeyValueStore for FlakyStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, StorageError> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), StorageError> {
        if self.broken.load(std::sync::atomic::Ordering::SeqCst) {
            return Err(StorageError::Io {
                path: "flaky".into(),
                source: std::io::Error::other("disk full"),
            });
        }
        self.inner.set(key, value).await
    }
}

/// The prompt collection, bound to a single key of the store.
pub struct PromptStorage {
    store: Box<dyn KeyValueStore>,
}

impl PromptStorage {
    pub fn new(store: impl KeyValueStore + 'static) -> Self {
        PromptStorage {
            store: Box::new(store),
        }
    }

    pub async fn load(&self) -> Result<Vec<Prompt>, StorageError> {
        match self.store.get(COLLECTION_KEY).await? {
            Some(Value::Null) | None => Ok(Vec::new()),
            Some(value) => serde_json::from_value(value).map_err(|source| StorageError::Decode {
                key: COLLECTION_KEY.to_string(),
                source,
            }),
        }
    }

    pub async fn save(&self, prompts: &[Prompt]) -> Result<(), StorageError> {
        let value = serde_json::to_value(prompts).map_err(|source| StorageError::Encode {
            key: COLLECTION_KEY.to_string(),
            source,
        })?;
        self.store.set(COLLECTION_KEY, value).await
    }
}
