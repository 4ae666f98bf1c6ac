//! Recommended API entrypoints grouped by abstraction level.
//!
//! `app` covers what application startup code needs.
//! `advanced` is an explicit escape hatch for authoring migrations and custom storage.

pub mod app {
    //! Store bootstrap and dispatch.
    pub use crate::{
        Action, FileSnapshotStorage, MigrationFailurePolicy, PersistConfig, PersistedSnapshot,
        PersistedStore, SnapshotFormat,
    };
    pub use crate::wallet::{
        CURRENT_SCHEMA_VERSION, WALLET_PERSIST_KEY, default_wallet_state,
        wallet_migration_registry,
    };
}

pub mod advanced {
    //! Migration authoring, the gate decorator and storage internals.
    pub use crate::persist;
    pub use crate::{
        MigrationRegistry, MigrationRunner, MigrationStep, PersistenceGate, RehydrationState,
        SnapshotStorage, StateReducer,
    };
}
