//! Wallet client state: the registered migration history and reference schemas.

pub mod migrations;
pub mod schema;

use crate::core::Result;
use crate::persist::{MigrationRegistry, MigrationStep, PersistedSnapshot};

pub use schema::{initial_schema, latest_schema};

/// Schema version written by this build. Bump once per breaking state change.
pub const CURRENT_SCHEMA_VERSION: u32 = 8;

/// Storage key of the wallet's persisted root state.
pub const WALLET_PERSIST_KEY: &str = "root";

/// Builds the registry of every wallet migration.
pub fn wallet_migration_registry() -> Result<MigrationRegistry> {
    MigrationRegistry::from_steps([
        MigrationStep::new(1, "rename_followed_addresses", migrations::rename_followed_addresses),
        MigrationStep::new(2, "add_search_history", migrations::add_search_history),
        MigrationStep::new(
            3,
            "drop_wallet_connect_modal_state",
            migrations::drop_wallet_connect_modal_state,
        ),
        MigrationStep::new(4, "move_biometric_settings", migrations::move_biometric_settings),
        MigrationStep::new(
            5,
            "notification_count_to_status",
            migrations::notification_count_to_status,
        ),
        MigrationStep::new(6, "add_recent_connection_meta", migrations::add_recent_connection_meta),
        MigrationStep::new(8, "add_password_lockout", migrations::add_password_lockout),
    ])
}

/// Default state for a fresh install, stamped at the current version.
pub fn default_wallet_state() -> PersistedSnapshot {
    match latest_schema() {
        serde_json::Value::Object(state) => {
            PersistedSnapshot::new(state).with_version(CURRENT_SCHEMA_VERSION)
        }
        _ => PersistedSnapshot::default().with_version(CURRENT_SCHEMA_VERSION),
    }
}
