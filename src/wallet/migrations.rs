//! Individual wallet state migrations, one function per schema version.
//!
//! Every migration tolerates missing slices and fields, and stamps its own
//! version before returning.

use crate::core::{PersistError, Result};
use crate::persist::PersistedSnapshot;
use serde_json::{Map, Value, json};

fn object_mut<'a>(
    snapshot: &'a mut PersistedSnapshot,
    slice: &str,
) -> Option<&'a mut Map<String, Value>> {
    snapshot.slice_mut(slice).and_then(Value::as_object_mut)
}

// Loose truthiness of persisted values: null, false, zero and "" are empty.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// v1: `favorites.followedAddresses` becomes `favorites.watchedAddresses`.
///
/// The legacy key is always dropped; an empty legacy value is not carried over.
pub fn rename_followed_addresses(mut snapshot: PersistedSnapshot) -> Result<PersistedSnapshot> {
    if let Some(favorites) = object_mut(&mut snapshot, "favorites") {
        match favorites.remove("followedAddresses") {
            Some(followed) if is_truthy(&followed) => {
                favorites.insert("watchedAddresses".to_string(), followed);
            }
            _ => {}
        }
    }
    Ok(snapshot.with_version(1))
}

/// v2: adds an empty search history.
pub fn add_search_history(mut snapshot: PersistedSnapshot) -> Result<PersistedSnapshot> {
    snapshot.set_slice("searchHistory", json!({ "results": [] }));
    Ok(snapshot.with_version(2))
}

/// v3: the WalletConnect modal state is no longer persisted.
pub fn drop_wallet_connect_modal_state(
    mut snapshot: PersistedSnapshot,
) -> Result<PersistedSnapshot> {
    if let Some(wallet_connect) = object_mut(&mut snapshot, "walletConnect") {
        wallet_connect.remove("modalState");
    }
    Ok(snapshot.with_version(3))
}

/// v4: the single biometric toggle splits into app-access and transaction settings.
pub fn move_biometric_settings(mut snapshot: PersistedSnapshot) -> Result<PersistedSnapshot> {
    let enabled = object_mut(&mut snapshot, "wallet")
        .and_then(|wallet| wallet.remove("isBiometricAuthEnabled"))
        .and_then(|flag| flag.as_bool())
        .unwrap_or(false);

    snapshot.set_slice(
        "biometricSettings",
        json!({
            "requiredForAppAccess": enabled,
            "requiredForTransactions": enabled,
        }),
    );
    Ok(snapshot.with_version(4))
}

/// v5: per-address notification counts collapse into a boolean status.
pub fn notification_count_to_status(mut snapshot: PersistedSnapshot) -> Result<PersistedSnapshot> {
    let mut notifications = match snapshot.remove_slice("notifications") {
        Some(Value::Object(map)) => map,
        Some(Value::Null) | None => Map::new(),
        Some(other) => {
            return Err(PersistError::Migration(format!(
                "notifications slice must be an object, found {}",
                other
            )));
        }
    };

    let status: Map<String, Value> = notifications
        .remove("notificationCount")
        .and_then(|counts| counts.as_object().cloned())
        .unwrap_or_default()
        .into_iter()
        .map(|(address, count)| {
            (address, Value::Bool(is_truthy(&count)))
        })
        .collect();

    notifications.insert("notificationStatus".to_string(), Value::Object(status));
    snapshot.set_slice("notifications", Value::Object(notifications));
    Ok(snapshot.with_version(5))
}

/// v6: `user.selectedWallet` moves into `user.recentConnectionMeta.type`.
pub fn add_recent_connection_meta(mut snapshot: PersistedSnapshot) -> Result<PersistedSnapshot> {
    if let Some(user) = object_mut(&mut snapshot, "user") {
        let selected = user.remove("selectedWallet");
        if let Some(Value::String(wallet_type)) = selected {
            user.insert(
                "recentConnectionMeta".to_string(),
                json!({ "type": wallet_type }),
            );
        }
    }
    Ok(snapshot.with_version(6))
}

// Version 7 shipped an experiments slice that was later removed; it is retired.

/// v8: adds the password lockout counter.
pub fn add_password_lockout(mut snapshot: PersistedSnapshot) -> Result<PersistedSnapshot> {
    snapshot.set_slice("passwordLockout", json!({ "passwordAttempts": 0 }));
    Ok(snapshot.with_version(8))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(value: Value) -> PersistedSnapshot {
        PersistedSnapshot::from_value(value).unwrap()
    }

    #[test]
    fn rename_followed_addresses_moves_list() {
        let migrated = rename_followed_addresses(snapshot(json!({
            "favorites": {"tokens": [], "followedAddresses": ["0xTest"]}
        })))
        .unwrap();
        assert_eq!(migrated.pointer("/favorites/watchedAddresses"), Some(&json!(["0xTest"])));
        assert_eq!(migrated.pointer("/favorites/followedAddresses"), None);
        assert_eq!(migrated.version(), 1);
    }

    #[test]
    fn rename_followed_addresses_drops_null_list() {
        let migrated = rename_followed_addresses(snapshot(json!({
            "favorites": {"tokens": ["eth"], "followedAddresses": null}
        })))
        .unwrap();
        assert_eq!(migrated.slice("favorites"), Some(&json!({"tokens": ["eth"]})));
    }

    #[test]
    fn move_biometric_settings_copies_flag() {
        let migrated = move_biometric_settings(snapshot(json!({
            "wallet": {"isBiometricAuthEnabled": true, "accounts": {}}
        })))
        .unwrap();
        assert_eq!(
            migrated.pointer("/biometricSettings/requiredForAppAccess"),
            Some(&json!(true))
        );
        assert_eq!(
            migrated.pointer("/biometricSettings/requiredForTransactions"),
            Some(&json!(true))
        );
        assert_eq!(migrated.pointer("/wallet/isBiometricAuthEnabled"), None);
    }

    #[test]
    fn notification_count_becomes_status() {
        let migrated = notification_count_to_status(snapshot(json!({
            "notifications": {
                "notificationQueue": [],
                "notificationCount": {"0xTest0": 3, "0xTest1": 0}
            }
        })))
        .unwrap();
        assert_eq!(
            migrated.slice("notifications"),
            Some(&json!({
                "notificationQueue": [],
                "notificationStatus": {"0xTest0": true, "0xTest1": false}
            }))
        );
    }

    #[test]
    fn notification_migration_rejects_malformed_slice() {
        let err = notification_count_to_status(snapshot(json!({"notifications": 42}))).unwrap_err();
        assert!(matches!(err, PersistError::Migration(_)));
    }

    #[test]
    fn recent_connection_meta_without_selected_wallet() {
        let migrated = add_recent_connection_meta(snapshot(json!({
            "user": {"selectedWallet": null, "userLocale": "en-US"}
        })))
        .unwrap();
        assert_eq!(migrated.slice("user"), Some(&json!({"userLocale": "en-US"})));
    }
}
