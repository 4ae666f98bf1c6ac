use super::PersistedSnapshot;
use crate::core::{PersistError, Result};
use futures::FutureExt;
use futures::future::{self, BoxFuture};
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use tracing::{Instrument, Level, event, info_span};

/// Future returned by a state migration.
pub type StateMigrationFuture = BoxFuture<'static, Result<PersistedSnapshot>>;

/// A function advancing a snapshot to the version it is registered under.
pub type StateMigrationFn = Arc<dyn Fn(PersistedSnapshot) -> StateMigrationFuture + Send + Sync>;

/// A single named migration associated with exactly one target version.
#[derive(Clone)]
pub struct MigrationStep {
    pub version: u32,
    pub name: String,
    pub(crate) migrator: StateMigrationFn,
}

/// Ordered `version -> migration` mapping. Immutable once handed to a runner.
#[derive(Debug, Clone, Default)]
pub struct MigrationRegistry {
    steps: BTreeMap<u32, MigrationStep>,
}

/// What the runner will do for a given inbound snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MigrationDecision {
    /// No persisted snapshot exists.
    FreshInstall,
    /// Snapshot already at the current version.
    UpToDate { version: u32 },
    /// Snapshot written by newer code; left untouched.
    Downgrade { inbound: u32, current: u32 },
    /// Registered migrations in `versions` will be applied in order.
    Upgrade {
        from: u32,
        to: u32,
        versions: Vec<u32>,
    },
}

/// Applies registered migrations to bring a snapshot up to the current version.
#[derive(Debug, Clone)]
pub struct MigrationRunner {
    registry: Arc<MigrationRegistry>,
}

// Keep migration implementation split by concern, mirroring the rest of persist.
include!("migration_impl/step_builder_and_debug.rs");
include!("migration_impl/registry_basics_and_ranges.rs");
include!("migration_impl/runner_execution.rs");
