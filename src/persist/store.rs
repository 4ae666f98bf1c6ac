//! Store lifecycle around the migration runner and persistence gate.
//!
//! Startup: load from storage, migrate to the configured version, merge over
//! the default state and mark the store rehydrated. Afterwards every dispatched
//! action runs through the gated reducer and the primary instance writes the
//! result back to storage.

use super::config::{MigrationFailurePolicy, PersistConfig};
use super::context::AppContext;
use super::gate::{Action, PERSIST_ACTION, PersistenceGate, REHYDRATE_ACTION, StateReducer};
use super::storage::SnapshotStorage;
use super::{MigrationRegistry, MigrationRunner, PersistedSnapshot};
use crate::core::Result;
use log::warn;
use std::sync::Arc;
use tracing::{Instrument, Level, event, info_span};
use uuid::Uuid;

/// Timestamp event recorded after each completed hydration.
pub const HYDRATED_EVENT: &str = "persist.hydrated";
/// Timestamp event recorded when the instance takes over writing.
pub const PRIMARY_EVENT: &str = "persist.primary";

/// Produces the default application state for fresh installs.
pub type DefaultStateFn = Arc<dyn Fn() -> PersistedSnapshot + Send + Sync>;

/// Live application state backed by durable storage.
pub struct PersistedStore<R> {
    config: PersistConfig,
    storage: Arc<dyn SnapshotStorage>,
    runner: MigrationRunner,
    reducer: PersistenceGate<R>,
    default_state: DefaultStateFn,
    state: PersistedSnapshot,
    context: AppContext,
    instance_id: Uuid,
    primary: bool,
}

impl<R> PersistedStore<R>
where
    R: StateReducer<PersistedSnapshot>,
{
    /// Creates a store that has not yet read from storage.
    pub fn new<F>(
        config: PersistConfig,
        storage: Arc<dyn SnapshotStorage>,
        registry: Arc<MigrationRegistry>,
        reducer: R,
        default_state: F,
    ) -> Result<Self>
    where
        F: Fn() -> PersistedSnapshot + Send + Sync + 'static,
    {
        config.validate()?;
        let default_state: DefaultStateFn = Arc::new(default_state);
        let state = default_state().with_version(config.version);
        Ok(Self {
            config,
            storage,
            runner: MigrationRunner::new(registry),
            reducer: PersistenceGate::new(reducer),
            default_state,
            state,
            context: AppContext::new(),
            instance_id: Uuid::new_v4(),
            primary: false,
        })
    }

    /// Replaces the application context (shared timestamp tracker etc).
    pub fn with_context(mut self, context: AppContext) -> Self {
        self.context = context;
        self
    }

    pub fn state(&self) -> &PersistedSnapshot {
        &self.state
    }

    pub fn config(&self) -> &PersistConfig {
        &self.config
    }

    pub fn context(&self) -> &AppContext {
        &self.context
    }

    pub fn instance_id(&self) -> Uuid {
        self.instance_id
    }

    pub fn is_primary(&self) -> bool {
        self.primary
    }

    pub fn is_rehydrated(&self) -> bool {
        self.state.is_rehydrated()
    }

    /// Reads storage, migrates the snapshot and adopts it as the live state.
    pub async fn hydrate(&mut self) -> Result<()> {
        let span = info_span!(
            "persist.hydrate",
            key = %self.config.key,
            instance = %self.instance_id
        );
        self.hydrate_inner().instrument(span).await
    }

    async fn hydrate_inner(&mut self) -> Result<()> {
        let loaded = self.storage.load().await?;
        event!(Level::DEBUG, found = loaded.is_some(), "loaded persisted snapshot");

        let migrated = match self.runner.migrate(loaded, self.config.version).await {
            Ok(migrated) => migrated,
            Err(err) => match self.config.failure_policy {
                MigrationFailurePolicy::Propagate => return Err(err),
                MigrationFailurePolicy::ResetToDefault => {
                    warn!(
                        "Persisted state '{}' could not be migrated, starting from defaults: {}",
                        self.config.key, err
                    );
                    None
                }
            },
        };

        let next = self.reconcile(migrated);
        let mut next = self.reducer.reduce(&next, &Action::new(REHYDRATE_ACTION));
        next.metadata.rehydrated = true;
        self.state = next;
        self.context.timestamps().record(HYDRATED_EVENT)?;
        event!(Level::INFO, version = self.state.version(), "store rehydrated");

        if self.primary {
            self.persist().await?;
        }
        Ok(())
    }

    // Inbound slices replace default slices one level deep; slices the
    // snapshot lacks keep their defaults.
    fn reconcile(&self, inbound: Option<PersistedSnapshot>) -> PersistedSnapshot {
        let mut base = (self.default_state)().with_version(self.config.version);
        if let Some(inbound) = inbound {
            base.metadata = inbound.metadata;
            for (key, value) in inbound.state {
                base.state.insert(key, value);
            }
        }
        base
    }

    /// Hydrates only when the live state is not marked rehydrated.
    ///
    /// Returns whether storage was read.
    pub async fn ensure_hydrated(&mut self) -> Result<bool> {
        if self.state.is_rehydrated() {
            return Ok(false);
        }
        self.hydrate().await?;
        Ok(true)
    }

    /// Runs `action` through the gated reducer and persists the result when
    /// this instance is the writer.
    pub async fn dispatch(&mut self, action: Action) -> Result<()> {
        self.state = self.reducer.reduce(&self.state, &action);
        if self.primary && self.state.is_rehydrated() {
            self.persist().await?;
        }
        Ok(())
    }

    /// Takes over as the writing instance.
    ///
    /// Dispatches the persist action, which clears the rehydration flag, and
    /// then re-reads storage instead of trusting the in-memory copy.
    pub async fn become_primary(&mut self) -> Result<()> {
        self.primary = true;
        self.dispatch(Action::new(PERSIST_ACTION)).await?;
        self.ensure_hydrated().await?;
        self.context.timestamps().record(PRIMARY_EVENT)?;
        event!(Level::INFO, instance = %self.instance_id, "instance became primary writer");
        Ok(())
    }

    /// Stops writing to storage. The in-memory state is kept.
    pub fn release_primary(&mut self) {
        self.primary = false;
    }

    /// Writes the live state (whitelisted slices only) to storage.
    pub async fn persist(&self) -> Result<()> {
        let snapshot = match &self.config.whitelist {
            Some(slices) => self.state.retain_slices(slices),
            None => self.state.clone(),
        };
        self.storage.save(&snapshot).await
    }
}
