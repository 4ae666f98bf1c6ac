//! Durable storage for persisted snapshots.

use super::PersistedSnapshot;
use crate::core::{PersistError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::NamedTempFile;
use tokio::sync::Mutex;

/// Loads and saves the persisted snapshot. The medium is up to the implementor.
#[async_trait]
pub trait SnapshotStorage: Send + Sync {
    /// Returns `None` when nothing has been persisted yet.
    async fn load(&self) -> Result<Option<PersistedSnapshot>>;

    async fn save(&self, snapshot: &PersistedSnapshot) -> Result<()>;

    async fn clear(&self) -> Result<()>;
}

// ============================================================================
// In-memory storage
// ============================================================================

/// Storage held in memory. Clones share the same slot, which models several
/// contexts reading and writing one store.
#[derive(Debug, Clone, Default)]
pub struct MemorySnapshotStorage {
    slot: Arc<Mutex<Option<PersistedSnapshot>>>,
}

impl MemorySnapshotStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates storage pre-seeded with a snapshot.
    pub fn with_snapshot(snapshot: PersistedSnapshot) -> Self {
        Self {
            slot: Arc::new(Mutex::new(Some(snapshot))),
        }
    }
}

#[async_trait]
impl SnapshotStorage for MemorySnapshotStorage {
    async fn load(&self) -> Result<Option<PersistedSnapshot>> {
        Ok(self.slot.lock().await.clone())
    }

    async fn save(&self, snapshot: &PersistedSnapshot) -> Result<()> {
        *self.slot.lock().await = Some(snapshot.clone());
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        *self.slot.lock().await = None;
        Ok(())
    }
}

// ============================================================================
// File storage
// ============================================================================

/// On-disk encoding of a snapshot file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SnapshotFormat {
    #[default]
    Json,
    /// Compact binary encoding via MessagePack.
    MessagePack,
}

impl SnapshotFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            SnapshotFormat::Json => "json",
            SnapshotFormat::MessagePack => "msgpack",
        }
    }

    pub fn encode(&self, snapshot: &PersistedSnapshot) -> Result<Vec<u8>> {
        match self {
            SnapshotFormat::Json => Ok(serde_json::to_vec_pretty(snapshot)?),
            SnapshotFormat::MessagePack => rmp_serde::to_vec_named(snapshot).map_err(|e| {
                PersistError::Serialization(format!("Failed to encode snapshot: {}", e))
            }),
        }
    }

    pub fn decode(&self, bytes: &[u8]) -> Result<PersistedSnapshot> {
        match self {
            SnapshotFormat::Json => {
                let value: serde_json::Value = serde_json::from_slice(bytes)?;
                PersistedSnapshot::from_value(value)
            }
            SnapshotFormat::MessagePack => rmp_serde::from_slice(bytes).map_err(|e| {
                PersistError::Serialization(format!("Failed to decode snapshot: {}", e))
            }),
        }
    }
}

/// Snapshot stored in a single file, replaced atomically on every save.
#[derive(Debug, Clone)]
pub struct FileSnapshotStorage {
    path: PathBuf,
    format: SnapshotFormat,
}

impl FileSnapshotStorage {
    pub fn new<P: AsRef<Path>>(path: P, format: SnapshotFormat) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            format,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn format(&self) -> SnapshotFormat {
        self.format
    }

    fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir).map_err(|e| {
            PersistError::IoError(format!("Failed to create snapshot directory: {}", e))
        })?;

        let mut temp = NamedTempFile::new_in(&dir)
            .map_err(|e| PersistError::IoError(format!("Failed to create temp file: {}", e)))?;
        temp.write_all(bytes)
            .map_err(|e| PersistError::IoError(format!("Failed to write snapshot: {}", e)))?;
        temp.as_file()
            .sync_all()
            .map_err(|e| PersistError::IoError(format!("Failed to sync snapshot: {}", e)))?;
        temp.persist(path)
            .map_err(|e| PersistError::IoError(format!("Failed to replace snapshot: {}", e)))?;
        Ok(())
    }
}

#[async_trait]
impl SnapshotStorage for FileSnapshotStorage {
    async fn load(&self) -> Result<Option<PersistedSnapshot>> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(PersistError::IoError(format!(
                    "Failed to read snapshot '{}': {}",
                    self.path.display(),
                    e
                )));
            }
        };
        self.format.decode(&bytes).map(Some)
    }

    async fn save(&self, snapshot: &PersistedSnapshot) -> Result<()> {
        let bytes = self.format.encode(snapshot)?;
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || Self::write_atomic(&path, &bytes))
            .await
            .map_err(|e| PersistError::IoError(format!("Snapshot writer task failed: {}", e)))?
    }

    async fn clear(&self) -> Result<()> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(PersistError::IoError(format!(
                "Failed to delete snapshot: {}",
                e
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn sample() -> PersistedSnapshot {
        PersistedSnapshot::from_value(json!({
            "wallet": {"activeAccountAddress": "0xTest0"},
            "_persist": {"version": 3, "rehydrated": true}
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn file_storage_missing_file_loads_none() {
        let temp_dir = TempDir::new().unwrap();
        let storage =
            FileSnapshotStorage::new(temp_dir.path().join("absent.json"), SnapshotFormat::Json);
        assert!(storage.load().await.unwrap().is_none());
        storage.clear().await.unwrap();
    }

    #[tokio::test]
    async fn file_storage_saves_both_formats() {
        let temp_dir = TempDir::new().unwrap();
        for format in [SnapshotFormat::Json, SnapshotFormat::MessagePack] {
            let path = temp_dir
                .path()
                .join("nested")
                .join(format!("state.{}", format.extension()));
            let storage = FileSnapshotStorage::new(&path, format);
            storage.save(&sample()).await.unwrap();

            let loaded = storage.load().await.unwrap().unwrap();
            assert_eq!(loaded, sample());

            storage.clear().await.unwrap();
            assert!(!path.exists());
        }
    }

    #[tokio::test]
    async fn memory_storage_clones_share_slot() {
        let storage = MemorySnapshotStorage::new();
        let other_tab = storage.clone();
        storage.save(&sample()).await.unwrap();
        assert_eq!(other_tab.load().await.unwrap(), Some(sample()));
    }
}
