use serde_json::{Value, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use walletpersist::{
    MigrationDecision, MigrationRegistry, MigrationRunner, MigrationStep, PersistError,
    PersistedSnapshot,
};

fn snapshot_at(version: u32) -> PersistedSnapshot {
    PersistedSnapshot::from_value(json!({
        "applied": [],
        "_persist": {"version": version, "rehydrated": true}
    }))
    .unwrap()
}

fn applied(snapshot: &PersistedSnapshot) -> Vec<u64> {
    snapshot
        .slice("applied")
        .and_then(|v| v.as_array())
        .map(|items| items.iter().filter_map(Value::as_u64).collect())
        .unwrap_or_default()
}

/// A migration that appends its own version to `applied` and stamps it.
fn recording_step(version: u32, calls: Arc<AtomicUsize>) -> MigrationStep {
    MigrationStep::new(version, format!("record_v{}", version), move |mut snapshot| {
        calls.fetch_add(1, Ordering::SeqCst);
        if let Some(Value::Array(items)) = snapshot.slice_mut("applied") {
            items.push(json!(version));
        }
        Ok(snapshot.with_version(version))
    })
}

fn runner_with(versions: &[u32]) -> (MigrationRunner, Vec<Arc<AtomicUsize>>) {
    let mut registry = MigrationRegistry::new();
    let mut counters = Vec::new();
    for version in versions {
        let calls = Arc::new(AtomicUsize::new(0));
        registry
            .add_step(recording_step(*version, calls.clone()))
            .unwrap();
        counters.push(calls);
    }
    (MigrationRunner::new(Arc::new(registry)), counters)
}

fn total_calls(counters: &[Arc<AtomicUsize>]) -> usize {
    counters.iter().map(|c| c.load(Ordering::SeqCst)).sum()
}

#[test]
fn registry_versions_in_range_is_ascending_and_half_open() {
    let (runner, _) = runner_with(&[7, 2, 5]);
    let registry = runner.registry();

    assert_eq!(registry.versions(), vec![2, 5, 7]);
    assert_eq!(registry.versions_in_range(1, 7), vec![2, 5, 7]);
    assert_eq!(registry.versions_in_range(2, 7), vec![5, 7]);
    assert_eq!(registry.versions_in_range(0, 5), vec![2, 5]);
    assert_eq!(registry.versions_in_range(7, 7), Vec::<u32>::new());
    assert_eq!(registry.versions_in_range(9, 3), Vec::<u32>::new());
    assert_eq!(registry.versions_in_range(7, 100), Vec::<u32>::new());
    assert_eq!(registry.latest_version(), Some(7));
    assert_eq!(registry.len(), 3);
}

#[test]
fn registry_rejects_duplicate_and_reserved_versions() {
    let calls = Arc::new(AtomicUsize::new(0));
    let mut registry = MigrationRegistry::new();
    registry.add_step(recording_step(3, calls.clone())).unwrap();

    let err = registry.add_step(recording_step(3, calls.clone())).unwrap_err();
    assert!(matches!(err, PersistError::DuplicateMigration(3)));

    let err = registry.add_step(recording_step(0, calls)).unwrap_err();
    assert!(matches!(err, PersistError::InvalidMigration(_)));
    assert_eq!(registry.len(), 1);
}

#[tokio::test]
async fn steady_state_returns_snapshot_without_running_migrations() {
    let (runner, counters) = runner_with(&[2, 5, 7]);
    let snapshot = snapshot_at(7);

    let migrated = runner.migrate(Some(snapshot.clone()), 7).await.unwrap();

    assert_eq!(migrated, Some(snapshot));
    assert_eq!(total_calls(&counters), 0);
}

#[tokio::test]
async fn missing_snapshot_returns_none() {
    let (runner, counters) = runner_with(&[2, 5, 7]);
    for current in [0, 1, 7, 42] {
        assert!(runner.migrate(None, current).await.unwrap().is_none());
    }
    assert_eq!(total_calls(&counters), 0);
    assert_eq!(runner.plan(None, 7), MigrationDecision::FreshInstall);
}

#[tokio::test]
async fn downgrade_leaves_snapshot_untouched() {
    let (runner, counters) = runner_with(&[2, 5, 7]);
    let snapshot = snapshot_at(10);

    let migrated = runner.migrate(Some(snapshot.clone()), 5).await.unwrap();

    assert_eq!(migrated, Some(snapshot));
    assert_eq!(total_calls(&counters), 0);
}

#[tokio::test]
async fn migrations_apply_in_ascending_order() {
    let (runner, counters) = runner_with(&[2, 5, 7]);

    let migrated = runner
        .migrate(Some(snapshot_at(1)), 7)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(applied(&migrated), vec![2, 5, 7]);
    assert_eq!(migrated.version(), 7);
    assert!(counters.iter().all(|c| c.load(Ordering::SeqCst) == 1));
}

#[tokio::test]
async fn partial_range_skips_older_migrations() {
    let (runner, counters) = runner_with(&[2, 5, 7]);

    let migrated = runner
        .migrate(Some(snapshot_at(3)), 7)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(applied(&migrated), vec![5, 7]);
    assert_eq!(counters[0].load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn failing_migration_stops_the_fold() {
    let f2 = Arc::new(AtomicUsize::new(0));
    let f7 = Arc::new(AtomicUsize::new(0));
    let registry = MigrationRegistry::new()
        .with_step(recording_step(2, f2.clone()))
        .unwrap()
        .with_step(MigrationStep::new(5, "corrupt_v5", |_snapshot| {
            Err(PersistError::Migration("unreadable transactions slice".to_string()))
        }))
        .unwrap()
        .with_step(recording_step(7, f7.clone()))
        .unwrap();
    let runner = MigrationRunner::new(Arc::new(registry));

    let err = runner.migrate(Some(snapshot_at(1)), 7).await.unwrap_err();

    match err {
        PersistError::MigrationStep {
            version,
            name,
            source,
        } => {
            assert_eq!(version, 5);
            assert_eq!(name, "corrupt_v5");
            assert!(matches!(*source, PersistError::Migration(_)));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(f2.load(Ordering::SeqCst), 1);
    assert_eq!(f7.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn sparse_versions_are_skipped_silently() {
    let (runner, _) = runner_with(&[1, 4]);

    let migrated = runner
        .migrate(Some(snapshot_at(0)), 4)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(applied(&migrated), vec![1, 4]);
    assert_eq!(
        runner.plan(Some(&snapshot_at(0)), 4),
        MigrationDecision::Upgrade {
            from: 0,
            to: 4,
            versions: vec![1, 4],
        }
    );
}

#[tokio::test]
async fn unset_version_is_treated_as_pre_versioning() {
    let (runner, _) = runner_with(&[1, 4]);
    let legacy = PersistedSnapshot::from_value(json!({
        "applied": [],
        "_persist": {"version": -1, "rehydrated": false}
    }))
    .unwrap();

    let migrated = runner.migrate(Some(legacy), 4).await.unwrap().unwrap();
    assert_eq!(applied(&migrated), vec![1, 4]);
}

#[tokio::test]
async fn runner_does_not_stamp_version_itself() {
    let registry = MigrationRegistry::new()
        .with_step(MigrationStep::new(2, "forgets_marker", |mut snapshot| {
            snapshot.set_slice("touched", json!(true));
            Ok(snapshot)
        }))
        .unwrap();
    let runner = MigrationRunner::new(Arc::new(registry));

    let migrated = runner
        .migrate(Some(snapshot_at(1)), 2)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(migrated.slice("touched"), Some(&json!(true)));
    assert_eq!(migrated.version(), 1);
}

#[tokio::test]
async fn async_migrations_run_strictly_sequentially() {
    let in_flight = Arc::new(AtomicUsize::new(0));
    let mut registry = MigrationRegistry::new();
    for version in 1..=3u32 {
        let in_flight = in_flight.clone();
        registry
            .add_step(MigrationStep::new_async(
                version,
                format!("slow_v{}", version),
                move |mut snapshot: PersistedSnapshot| {
                    let in_flight = in_flight.clone();
                    async move {
                        let running = in_flight.fetch_add(1, Ordering::SeqCst);
                        assert_eq!(running, 0, "migrations overlapped");
                        tokio::time::sleep(Duration::from_millis(5)).await;
                        if let Some(Value::Array(items)) = snapshot.slice_mut("applied") {
                            items.push(json!(version));
                        }
                        in_flight.fetch_sub(1, Ordering::SeqCst);
                        Ok(snapshot.with_version(version))
                    }
                },
            ))
            .unwrap();
    }
    let runner = MigrationRunner::new(Arc::new(registry));

    let migrated = runner
        .migrate(Some(snapshot_at(0)), 3)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(applied(&migrated), vec![1, 2, 3]);
    assert_eq!(migrated.version(), 3);
}

#[tokio::test]
async fn recent_connection_meta_end_to_end() {
    let registry = MigrationRegistry::new()
        .with_step(MigrationStep::new(
            6,
            "add_recent_connection_meta",
            walletpersist::wallet::migrations::add_recent_connection_meta,
        ))
        .unwrap();
    let runner = MigrationRunner::new(Arc::new(registry));
    let input = PersistedSnapshot::from_value(json!({
        "user": {"selectedWallet": "Injected", "userLocale": "en-US"},
        "_persist": {"version": 5}
    }))
    .unwrap();

    let migrated = runner.migrate(Some(input), 6).await.unwrap().unwrap();

    let user = migrated.slice("user").and_then(Value::as_object).unwrap();
    assert!(!user.contains_key("selectedWallet"));
    assert_eq!(user.get("recentConnectionMeta"), Some(&json!({"type": "Injected"})));
    assert_eq!(user.get("userLocale"), Some(&json!("en-US")));
    assert_eq!(migrated.version(), 6);
}
