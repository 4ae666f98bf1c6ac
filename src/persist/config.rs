use super::storage::SnapshotFormat;
use crate::core::{PersistError, Result};
use std::path::PathBuf;

/// What the store does when startup migration fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MigrationFailurePolicy {
    /// Return the migration error to the caller.
    #[default]
    Propagate,
    /// Log the failure and start from the default state.
    ResetToDefault,
}

/// Persisted store configuration
///
/// Mirrors the knobs of a client-side persistence config: storage key,
/// current schema version, where and how to store, and which slices to keep.
#[derive(Debug, Clone)]
pub struct PersistConfig {
    /// Storage key; also the snapshot file stem
    pub key: String,

    /// Current schema version of this build
    pub version: u32,

    /// Directory holding snapshot files
    pub storage_dir: PathBuf,

    /// On-disk encoding
    pub format: SnapshotFormat,

    /// Top-level slices to persist (`None` persists everything)
    pub whitelist: Option<Vec<String>>,

    /// Behavior when startup migration fails
    pub failure_policy: MigrationFailurePolicy,
}

impl PersistConfig {
    /// Create a new configuration for `key` at schema `version`
    pub fn new(key: &str, version: u32) -> Self {
        Self {
            key: key.to_string(),
            version,
            storage_dir: PathBuf::from("."),
            format: SnapshotFormat::Json,
            whitelist: None,
            failure_policy: MigrationFailurePolicy::Propagate,
        }
    }

    /// Set the storage directory
    pub fn storage_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.storage_dir = dir.into();
        self
    }

    /// Set the snapshot encoding
    pub fn format(mut self, format: SnapshotFormat) -> Self {
        self.format = format;
        self
    }

    /// Only persist the listed slices
    pub fn whitelist<I, S>(mut self, slices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.whitelist = Some(slices.into_iter().map(Into::into).collect());
        self
    }

    /// Set the migration failure policy
    pub fn failure_policy(mut self, policy: MigrationFailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    /// Path of the snapshot file for this key
    pub fn snapshot_path(&self) -> PathBuf {
        self.storage_dir
            .join(format!("{}.{}", self.key, self.format.extension()))
    }

    pub fn validate(&self) -> Result<()> {
        if self.key.trim().is_empty() {
            return Err(PersistError::Config(
                "Persist key must not be empty".to_string(),
            ));
        }
        if self.key.contains(['/', '\\']) {
            return Err(PersistError::Config(format!(
                "Persist key '{}' must not contain path separators",
                self.key
            )));
        }
        Ok(())
    }
}
