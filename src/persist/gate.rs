//! Persistence gate: a reducer decorator that forces rehydration when an
//! instance (re)starts persisting.
//!
//! Several execution contexts can share one persisted store while only one of
//! them writes at a time. When an instance regains the writer role its
//! in-memory copy may be stale, so the gate clears the `rehydrated` flag on the
//! designated action before the wrapped reducer sees it.

use super::PersistedSnapshot;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Action dispatched when an instance begins persisting.
pub const PERSIST_ACTION: &str = "persist/PERSIST";
/// Action dispatched once storage has been loaded into memory.
pub const REHYDRATE_ACTION: &str = "persist/REHYDRATE";

/// A tagged state transition request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    #[serde(rename = "type")]
    pub action_type: String,
    #[serde(default)]
    pub payload: Value,
}

impl Action {
    pub fn new(action_type: impl Into<String>) -> Self {
        Self {
            action_type: action_type.into(),
            payload: Value::Null,
        }
    }

    pub fn with_payload(action_type: impl Into<String>, payload: Value) -> Self {
        Self {
            action_type: action_type.into(),
            payload,
        }
    }

    pub fn is(&self, action_type: &str) -> bool {
        self.action_type == action_type
    }
}

/// A pure `(state, action) -> state'` transition.
pub trait StateReducer<S>: Send + Sync {
    fn reduce(&self, state: &S, action: &Action) -> S;
}

impl<S, F> StateReducer<S> for F
where
    F: Fn(&S, &Action) -> S + Send + Sync,
{
    fn reduce(&self, state: &S, action: &Action) -> S {
        self(state, action)
    }
}

/// State carrying a "has rehydrated" flag the persistence layer inspects.
pub trait RehydrationState: Clone {
    fn is_rehydrated(&self) -> bool;

    /// Returns a copy with the flag back at its initial value. `self` is untouched.
    fn with_rehydration_reset(&self) -> Self;
}

impl RehydrationState for PersistedSnapshot {
    fn is_rehydrated(&self) -> bool {
        self.metadata.rehydrated
    }

    fn with_rehydration_reset(&self) -> Self {
        let mut next = self.clone();
        next.metadata.rehydrated = false;
        next
    }
}

/// Wraps a reducer and resets the rehydration flag on the trigger action.
#[derive(Debug, Clone)]
pub struct PersistenceGate<R> {
    inner: R,
    trigger: String,
}

impl<R> PersistenceGate<R> {
    /// Gates `inner` on [`PERSIST_ACTION`].
    pub fn new(inner: R) -> Self {
        Self::with_trigger(inner, PERSIST_ACTION)
    }

    pub fn with_trigger(inner: R, trigger: impl Into<String>) -> Self {
        Self {
            inner,
            trigger: trigger.into(),
        }
    }

    pub fn inner(&self) -> &R {
        &self.inner
    }

    pub fn trigger(&self) -> &str {
        &self.trigger
    }
}

impl<S, R> StateReducer<S> for PersistenceGate<R>
where
    S: RehydrationState,
    R: StateReducer<S>,
{
    fn reduce(&self, state: &S, action: &Action) -> S {
        if action.is(&self.trigger) {
            let reset = state.with_rehydration_reset();
            return self.inner.reduce(&reset, action);
        }
        self.inner.reduce(state, action)
    }
}

/// Reducer that leaves state as it is. Useful when only the gate matters.
pub fn identity_reducer<S: Clone>(state: &S, _action: &Action) -> S {
    state.clone()
}
