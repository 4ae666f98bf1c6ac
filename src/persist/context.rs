//! Explicitly owned application context.
//!
//! Shared services such as the event timestamp tracker live here instead of
//! behind a process-wide singleton, so each store (and each test) owns its own.

use crate::core::Result;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Remembers when named events last happened.
#[derive(Debug, Default)]
pub struct EventTimestampTracker {
    timestamps: Mutex<HashMap<String, DateTime<Utc>>>,
}

impl EventTimestampTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `event` as happening now and returns the recorded time.
    pub fn record(&self, event: &str) -> Result<DateTime<Utc>> {
        self.record_at(event, Utc::now())
    }

    pub fn record_at(&self, event: &str, at: DateTime<Utc>) -> Result<DateTime<Utc>> {
        let mut timestamps = self.timestamps.lock()?;
        timestamps.insert(event.to_string(), at);
        Ok(at)
    }

    pub fn last(&self, event: &str) -> Result<Option<DateTime<Utc>>> {
        let timestamps = self.timestamps.lock()?;
        Ok(timestamps.get(event).copied())
    }

    /// Time elapsed since `event` was last recorded, relative to `now`.
    pub fn elapsed_since(&self, event: &str, now: DateTime<Utc>) -> Result<Option<Duration>> {
        Ok(self.last(event)?.map(|at| now - at))
    }
}

/// Services shared by everything running on behalf of one application instance.
#[derive(Debug, Clone, Default)]
pub struct AppContext {
    timestamps: Arc<EventTimestampTracker>,
}

impl AppContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timestamps(timestamps: Arc<EventTimestampTracker>) -> Self {
        Self { timestamps }
    }

    pub fn timestamps(&self) -> &EventTimestampTracker {
        &self.timestamps
    }
}
