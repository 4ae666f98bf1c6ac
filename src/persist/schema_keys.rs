//! Nested key-path comparison between a migrated snapshot and the expected schema.

use super::PERSIST_METADATA_KEY;
use serde_json::Value;
use std::collections::BTreeSet;

/// Collects dotted leaf key paths of a JSON object.
///
/// Arrays count as opaque leaves and are skipped. An empty nested object
/// yields its own path so that "slice exists but is empty" is still visible.
pub fn nested_key_paths(value: &Value) -> BTreeSet<String> {
    let mut paths = BTreeSet::new();
    if let Value::Object(map) = value {
        for (key, child) in map {
            if key == PERSIST_METADATA_KEY {
                continue;
            }
            collect(child, key, &mut paths);
        }
    }
    paths
}

fn collect(value: &Value, path: &str, out: &mut BTreeSet<String>) {
    match value {
        Value::Array(_) => {}
        Value::Object(map) if map.is_empty() => {
            out.insert(path.to_string());
        }
        Value::Object(map) => {
            for (key, child) in map {
                collect(child, &format!("{}.{}", path, key), out);
            }
        }
        _ => {
            out.insert(path.to_string());
        }
    }
}

/// Key paths that differ between a migrated snapshot and the expected schema.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaKeyDiff {
    /// Present in the expected schema but not produced by migration.
    pub missing: BTreeSet<String>,
    /// Produced by migration but absent from the expected schema.
    pub unexpected: BTreeSet<String>,
}

impl SchemaKeyDiff {
    pub fn between(migrated: &Value, expected: &Value) -> Self {
        let migrated = nested_key_paths(migrated);
        let expected = nested_key_paths(expected);
        Self {
            missing: expected.difference(&migrated).cloned().collect(),
            unexpected: migrated.difference(&expected).cloned().collect(),
        }
    }

    pub fn is_clean(&self) -> bool {
        self.missing.is_empty() && self.unexpected.is_empty()
    }
}
