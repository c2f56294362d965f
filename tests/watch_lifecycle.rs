//! Watch lifecycle tests: dedup, race suppression, failure, clear.

use list_sync::{
    ListErrorKind, ListProvider, MemorySnapshots, MemoryStore, SnapshotStore, SyncConfig,
};
use serde_json::json;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn setup() -> (MemoryStore, ListProvider, Arc<MemorySnapshots>) {
    init_tracing();
    let remote = MemoryStore::new();
    let snapshots = Arc::new(MemorySnapshots::new());
    let provider = ListProvider::new(
        Arc::new(remote.clone()),
        Arc::clone(&snapshots) as Arc<dyn SnapshotStore>,
        SyncConfig::default(),
    );
    (remote, provider, snapshots)
}

fn wait_for_listeners(remote: &MemoryStore, path: &str, count: usize) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while remote.listener_count(path) != count {
        assert!(Instant::now() < deadline, "listeners never reached {count}");
        thread::sleep(Duration::from_millis(1));
    }
}

#[test]
fn test_fetch_then_live_add() {
    let (remote, provider, _) = setup();
    remote.put("/rooms", "r1", json!({"name": "A"}));

    provider.watch("/rooms");
    remote.put("/rooms", "r2", json!({"name": "B"}));

    let items = provider.get_list("/rooms");
    let keys: Vec<_> = items.iter().map(|i| i.key.as_str()).collect();
    assert_eq!(keys, vec!["r1", "r2"]);
    assert_eq!(items[0].val, json!({"name": "A"}));
    assert_eq!(items[1].val, json!({"name": "B"}));
}

#[test]
fn test_prefetch_replay_is_suppressed() {
    let (remote, provider, snapshots) = setup();
    remote.put("/rooms", "r1", json!(1));
    remote.put("/rooms", "r2", json!(2));

    // Subscribing replays both existing children before the fetch resolves;
    // only LoadingChanged and ValueReplaced may reach the reducer.
    provider.watch("/rooms");
    assert_eq!(snapshots.save_count(), 2);

    let keys: Vec<_> = provider
        .get_list("/rooms")
        .iter()
        .map(|i| i.key.clone())
        .collect();
    assert_eq!(keys, vec!["r1", "r2"]);

    // A genuinely new child after the fetch is dispatched.
    remote.put("/rooms", "r3", json!(3));
    assert_eq!(snapshots.save_count(), 3);
    assert_eq!(provider.get_list("/rooms").len(), 3);
}

#[test]
fn test_live_change_and_remove() {
    let (remote, provider, _) = setup();
    provider.watch("/rooms");

    remote.put("/rooms", "r1", json!(1));
    assert_eq!(provider.get_list("/rooms"), vec![list_sync::ListItem::new("r1", json!(1))]);

    remote.put("/rooms", "r1", json!(2));
    assert_eq!(provider.get_list("/rooms")[0].val, json!(2));

    remote.delete("/rooms", "r1");
    assert!(provider.get_list("/rooms").is_empty());
}

#[test]
fn test_watch_dedup_while_fetch_in_flight() {
    let (remote, provider, snapshots) = setup();
    remote.put("/rooms", "r1", json!(1));
    let release = remote.hold_fetch("/rooms");

    let background = {
        let provider = provider.clone();
        thread::spawn(move || provider.watch("/rooms"))
    };
    wait_for_listeners(&remote, "/rooms", 3);

    // Second watch while the first fetch is held open: silently dropped,
    // no second listener set, no second LoadingChanged.
    provider.watch("/rooms");
    assert_eq!(remote.listener_count("/rooms"), 3);
    assert_eq!(snapshots.save_count(), 1);

    release.send(()).unwrap();
    background.join().unwrap();

    assert_eq!(snapshots.save_count(), 2);
    assert_eq!(provider.get_list("/rooms").len(), 1);
}

#[test]
fn test_unwatch_during_fetch_drops_snapshot() {
    let (remote, provider, snapshots) = setup();
    remote.put("/rooms", "r1", json!(1));
    let release = remote.hold_fetch("/rooms");

    let background = {
        let provider = provider.clone();
        thread::spawn(move || provider.watch("/rooms"))
    };
    wait_for_listeners(&remote, "/rooms", 3);

    provider.unwatch("/rooms");
    assert_eq!(remote.listener_count("/rooms"), 0);

    // Let the held fetch complete; its snapshot must not be dispatched.
    drop(release);
    background.join().unwrap();

    assert!(provider.get_list("/rooms").is_empty());
    assert_eq!(snapshots.save_count(), 1);
}

#[test]
fn test_unwatch_is_idempotent() {
    let (_, provider, _) = setup();
    provider.unwatch("/rooms");
    provider.unwatch("/rooms");
    provider.unwatch("");
}

#[test]
fn test_fetch_failure_records_error_and_frees_path() {
    let (remote, provider, _) = setup();
    remote.put("/rooms", "r1", json!(1));
    remote.fail_next_fetch("/rooms", "permission denied");

    provider.watch("/rooms");

    assert!(provider.has_list_error("/rooms"));
    assert!(!provider.is_list_loading("/rooms"));
    assert!(provider.get_list("/rooms").is_empty());
    let error = provider.get_list_error("/rooms").unwrap();
    assert_eq!(error.kind, ListErrorKind::Fetch);
    assert_eq!(error.message, "permission denied");
    assert_eq!(remote.listener_count("/rooms"), 0);

    // The path is deregistered, so a retry is accepted and succeeds.
    provider.watch("/rooms");
    assert_eq!(provider.get_list("/rooms").len(), 1);
    assert!(!provider.has_list_error("/rooms"));
}

#[test]
fn test_listener_error_aborts_watch() {
    let (remote, provider, _) = setup();
    remote.put("/rooms", "r1", json!(1));
    provider.watch("/rooms");

    remote.emit_listen_error("/rooms", "connection lost");

    assert!(provider.has_list_error("/rooms"));
    assert_eq!(
        provider.get_list_error("/rooms").unwrap().kind,
        ListErrorKind::Listen
    );
    // Contents accumulated before the failure stay readable.
    assert_eq!(provider.get_list("/rooms").len(), 1);
    assert_eq!(remote.listener_count("/rooms"), 0);
}

#[test]
fn test_stale_listener_error_after_unwatch_is_ignored() {
    let (remote, provider, snapshots) = setup();
    remote.put("/rooms", "r1", json!(1));
    provider.watch("/rooms");
    provider.unwatch("/rooms");

    let saves = snapshots.save_count();
    remote.emit_listen_error("/rooms", "too late");

    assert!(!provider.has_list_error("/rooms"));
    assert_eq!(snapshots.save_count(), saves);
}

#[test]
fn test_clear_list() {
    let (remote, provider, _) = setup();
    remote.put("/rooms", "r1", json!(1));
    provider.watch("/rooms");

    provider.clear_list("/rooms");

    assert!(provider.get_list("/rooms").is_empty());
    assert!(!provider.is_list_loading("/rooms"));
    assert_eq!(remote.listener_count("/rooms"), 0);

    // Not deduplicated after a clear.
    provider.watch("/rooms");
    assert_eq!(provider.get_list("/rooms").len(), 1);
}

#[test]
fn test_clear_all_lists() {
    let (remote, provider, _) = setup();
    remote.put("/rooms", "r1", json!(1));
    remote.put("/users", "u1", json!(1));
    provider.watch("/rooms");
    provider.watch("/users");

    provider.clear_all_lists();

    assert!(provider.get_list("/rooms").is_empty());
    assert!(provider.get_list("/users").is_empty());
    assert_eq!(remote.listener_count("/rooms"), 0);
    assert_eq!(remote.listener_count("/users"), 0);

    // Fresh watches are accepted after the reset.
    provider.watch("/rooms");
    assert_eq!(provider.get_list("/rooms").len(), 1);
}
