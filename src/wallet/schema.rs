//! Reference shapes of the persisted wallet state.
//!
//! Only persisted fields belong here.

use serde_json::{Value, json};

/// State as written before versioning existed.
pub fn initial_schema() -> Value {
    json!({
        "favorites": {
            "tokens": [],
            "followedAddresses": [],
        },
        "notifications": {
            "notificationQueue": [],
            "notificationCount": {},
        },
        "wallet": {
            "accounts": {},
            "activeAccountAddress": null,
            "isBiometricAuthEnabled": false,
            "settings": {},
        },
        "walletConnect": {
            "byAccount": {},
            "pendingSession": null,
            "modalState": "ScanQr",
        },
        "user": {
            "selectedWallet": null,
            "userLocale": null,
        },
    })
}

/// State at the current schema version.
pub fn latest_schema() -> Value {
    json!({
        "favorites": {
            "tokens": [],
            "watchedAddresses": [],
        },
        "notifications": {
            "notificationQueue": [],
            "notificationStatus": {},
        },
        "wallet": {
            "accounts": {},
            "activeAccountAddress": null,
            "settings": {},
        },
        "walletConnect": {
            "byAccount": {},
            "pendingSession": null,
        },
        "user": {
            "userLocale": null,
        },
        "searchHistory": {
            "results": [],
        },
        "biometricSettings": {
            "requiredForAppAccess": false,
            "requiredForTransactions": false,
        },
        "passwordLockout": {
            "passwordAttempts": 0,
        },
    })
}
