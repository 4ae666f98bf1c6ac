use crate::core::{PersistError, Result};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// The reserved key holding persistence metadata inside a serialized snapshot.
pub const PERSIST_METADATA_KEY: &str = "_persist";

/// Version assumed for snapshots written before versioning existed.
pub const DEFAULT_SNAPSHOT_VERSION: u32 = 0;

/// Persistence metadata stored alongside the application state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PersistMetadata {
    /// The schema version the snapshot was last written at.
    #[serde(
        default,
        deserialize_with = "deserialize_version",
        skip_serializing_if = "Option::is_none"
    )]
    pub version: Option<u32>,
    /// Whether storage-to-memory load has completed for the current lifecycle.
    #[serde(default)]
    pub rehydrated: bool,
}

impl PersistMetadata {
    pub fn new(version: u32) -> Self {
        Self {
            version: Some(version),
            rehydrated: false,
        }
    }

    /// Returns the recorded version, or the pre-versioning sentinel when unset.
    pub fn version_or_default(&self) -> u32 {
        self.version.unwrap_or(DEFAULT_SNAPSHOT_VERSION)
    }
}

// Older stores wrote `-1` as "never versioned". Anything that is not a
// non-negative integer fitting in u32 (including integral floats) is unset.
fn version_from_value(value: &Value) -> Option<u32> {
    if let Some(v) = value.as_u64() {
        return u32::try_from(v).ok();
    }
    match value.as_f64() {
        Some(v) if v >= 0.0 && v.fract() == 0.0 && v <= f64::from(u32::MAX) => Some(v as u32),
        _ => None,
    }
}

fn deserialize_version<'de, D>(deserializer: D) -> std::result::Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Value::deserialize(deserializer)?;
    Ok(version_from_value(&raw))
}

// A missing, null or malformed `_persist` block yields default metadata so the
// snapshot still loads at the pre-versioning version.
fn deserialize_metadata<'de, D>(deserializer: D) -> std::result::Result<PersistMetadata, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Value::deserialize(deserializer)?;
    let Value::Object(fields) = raw else {
        return Ok(PersistMetadata::default());
    };
    Ok(PersistMetadata {
        version: fields.get("version").and_then(version_from_value),
        rehydrated: fields
            .get("rehydrated")
            .and_then(Value::as_bool)
            .unwrap_or(false),
    })
}

/// The entire serializable application state plus its persistence metadata.
///
/// Serialized as a single JSON object: state slices at the top level and the
/// metadata under [`PERSIST_METADATA_KEY`].
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PersistedSnapshot {
    #[serde(rename = "_persist", default, deserialize_with = "deserialize_metadata")]
    pub metadata: PersistMetadata,
    #[serde(flatten)]
    pub state: Map<String, Value>,
}

impl PersistedSnapshot {
    /// Creates a snapshot from a state object with unset metadata.
    pub fn new(state: Map<String, Value>) -> Self {
        Self {
            metadata: PersistMetadata::default(),
            state,
        }
    }

    /// Builds a snapshot from a JSON value. The value must be an object.
    pub fn from_value(value: Value) -> Result<Self> {
        if !value.is_object() {
            return Err(PersistError::InvalidSnapshot(
                "Persisted snapshot must be a JSON object".to_string(),
            ));
        }
        Ok(serde_json::from_value(value)?)
    }

    pub fn to_value(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }

    pub fn into_value(self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }

    /// Returns the recorded version, or `0` when the snapshot was never versioned.
    pub fn version(&self) -> u32 {
        self.metadata.version_or_default()
    }

    pub fn set_version(&mut self, version: u32) {
        self.metadata.version = Some(version);
    }

    /// Fluent variant of [`set_version`](Self::set_version).
    pub fn with_version(mut self, version: u32) -> Self {
        self.set_version(version);
        self
    }

    pub fn is_rehydrated(&self) -> bool {
        self.metadata.rehydrated
    }

    pub fn slice(&self, name: &str) -> Option<&Value> {
        self.state.get(name)
    }

    pub fn slice_mut(&mut self, name: &str) -> Option<&mut Value> {
        self.state.get_mut(name)
    }

    pub fn set_slice(&mut self, name: impl Into<String>, value: Value) {
        self.state.insert(name.into(), value);
    }

    pub fn remove_slice(&mut self, name: &str) -> Option<Value> {
        self.state.remove(name)
    }

    /// Looks up a nested value by JSON pointer, e.g. `/wallet/settings/hideSpam`.
    pub fn pointer(&self, pointer: &str) -> Option<&Value> {
        let rest = pointer.strip_prefix('/')?;
        let (head, tail) = match rest.split_once('/') {
            Some((head, tail)) => (head, Some(tail)),
            None => (rest, None),
        };
        let slice = self.state.get(head)?;
        match tail {
            Some(tail) => slice.pointer(&format!("/{}", tail)),
            None => Some(slice),
        }
    }

    /// Returns a copy containing only the listed top-level slices.
    pub fn retain_slices(&self, names: &[String]) -> Self {
        let state = self
            .state
            .iter()
            .filter(|(key, _)| names.iter().any(|name| name == *key))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        Self {
            metadata: self.metadata,
            state,
        }
    }
}
