// ============================================================================
// walletpersist Library
// ============================================================================

pub mod core;
pub mod persist;
pub mod prelude;
pub mod wallet;

// Re-export main types for convenience
pub use crate::core::{PersistError, Result};
pub use persist::{
    DEFAULT_SNAPSHOT_VERSION, MigrationDecision, MigrationRegistry, MigrationRunner,
    MigrationStep, PERSIST_METADATA_KEY, PersistMetadata, PersistedSnapshot,
};

// Re-export the gate and store surface
pub use persist::{
    config::{MigrationFailurePolicy, PersistConfig},
    context::{AppContext, EventTimestampTracker},
    gate::{
        Action, PERSIST_ACTION, PersistenceGate, REHYDRATE_ACTION, RehydrationState, StateReducer,
    },
    schema_keys::{SchemaKeyDiff, nested_key_paths},
    storage::{FileSnapshotStorage, MemorySnapshotStorage, SnapshotFormat, SnapshotStorage},
    store::PersistedStore,
};
