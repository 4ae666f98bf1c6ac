//! Versioned persistence of client state: snapshot model, migration registry
//! and runner, the persistence gate, storage backends and the store lifecycle.

mod migration_impl;
mod snapshot;

pub mod config;
pub mod context;
pub mod gate;
pub mod schema_keys;
pub mod storage;
pub mod store;

pub use migration_impl::{
    MigrationDecision, MigrationRegistry, MigrationRunner, MigrationStep, StateMigrationFn,
    StateMigrationFuture,
};
pub use snapshot::{
    DEFAULT_SNAPSHOT_VERSION, PERSIST_METADATA_KEY, PersistMetadata, PersistedSnapshot,
};
