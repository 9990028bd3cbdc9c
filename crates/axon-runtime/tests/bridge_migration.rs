//! Bridge migration and connection teardown, across two live loops.

use axon_msg::{Data, Msg};
use axon_runtime::{BridgeConfig, Connection, MigrationState, ProtocolBridge, TaskLoop};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

async fn wait_until(mut cond: impl FnMut() -> bool) {
    for _ in 0..400 {
        if cond() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not reached in time");
}

fn named(name: &str) -> Msg {
    Data::new(name).into()
}

/// A connection whose sink records delivered message names.
fn connection_with_recorder(
    cfg: BridgeConfig,
) -> (Connection, Arc<Mutex<Vec<String>>>) {
    let core = TaskLoop::spawn();
    let impl_loop = TaskLoop::spawn();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let seen2 = seen.clone();
    let conn = Connection::new(
        core,
        impl_loop,
        cfg,
        Box::new(move |msg: Msg| {
            seen2.lock().push(msg.header().name().to_string());
        }),
    );
    (conn, seen)
}

#[tokio::test]
async fn input_before_migration_is_deferred() {
    let (conn, seen) = connection_with_recorder(BridgeConfig::default());

    assert_eq!(conn.migration_state(), MigrationState::Init);
    conn.bridge().on_input(named("early")).unwrap();

    tokio::time::sleep(Duration::from_millis(30)).await;
    assert!(seen.lock().is_empty());
    assert_eq!(conn.bridge().pending_len(), 1);
}

#[tokio::test]
async fn migration_replays_deferred_input_in_arrival_order() {
    let (conn, seen) = connection_with_recorder(BridgeConfig::default());

    conn.bridge().on_input(named("m1")).unwrap();

    conn.migrate().unwrap();
    wait_until(|| conn.migration_state() == MigrationState::Migrating).await;

    conn.bridge().on_input(named("m2")).unwrap();
    assert!(seen.lock().is_empty());

    conn.migration_done().unwrap();
    conn.bridge().on_input(named("m3")).unwrap();

    wait_until(|| seen.lock().len() == 3).await;
    // Deferred messages first, in receipt order, ahead of newer input.
    assert_eq!(*seen.lock(), vec!["m1", "m2", "m3"]);
    assert_eq!(conn.migration_state(), MigrationState::Done);
    assert_eq!(conn.bridge().pending_len(), 0);
}

#[tokio::test]
async fn input_after_migration_relays_directly() {
    let (conn, seen) = connection_with_recorder(BridgeConfig::default());

    conn.migrate().unwrap();
    conn.migration_done().unwrap();
    wait_until(|| conn.migration_state() == MigrationState::Done).await;

    conn.bridge().on_input(named("direct")).unwrap();
    wait_until(|| seen.lock().len() == 1).await;
    assert_eq!(*seen.lock(), vec!["direct"]);
}

#[tokio::test]
async fn pending_queue_overflow_is_reported_and_drops() {
    let (conn, seen) = connection_with_recorder(BridgeConfig {
        pending_capacity: 2,
    });

    conn.bridge().on_input(named("a")).unwrap();
    conn.bridge().on_input(named("b")).unwrap();
    let err = conn.bridge().on_input(named("c")).unwrap_err();
    assert_eq!(err, axon_runtime::BridgeError::PendingFull);

    conn.migrate().unwrap();
    conn.migration_done().unwrap();
    wait_until(|| seen.lock().len() == 2).await;
    assert_eq!(*seen.lock(), vec!["a", "b"]);
}

#[tokio::test]
async fn connect_transitions_reach_the_core_side() {
    let core = TaskLoop::spawn();
    let impl_loop = TaskLoop::spawn();
    let transitions = Arc::new(Mutex::new(Vec::new()));
    let transitions2 = transitions.clone();

    let bridge = ProtocolBridge::new(
        core,
        impl_loop,
        BridgeConfig::default(),
        Box::new(|_msg| {}),
    );
    bridge.set_connected_sink(Box::new(move |connected| {
        transitions2.lock().push(connected);
    }));

    bridge.on_connected(true).unwrap();
    bridge.on_connected(false).unwrap();

    wait_until(|| transitions.lock().len() == 2).await;
    assert_eq!(*transitions.lock(), vec![true, false]);
}

#[tokio::test]
async fn closing_runs_impl_teardown_before_reporting_closed() {
    let (conn, _seen) = connection_with_recorder(BridgeConfig::default());

    let torn_down = Arc::new(AtomicBool::new(false));
    let torn_down2 = torn_down.clone();
    conn.bridge().set_impl_closer(Box::new(move |done| {
        torn_down2.store(true, Ordering::SeqCst);
        done.complete();
    }));

    let notified = Arc::new(AtomicBool::new(false));
    let notified2 = notified.clone();
    conn.on_closed(move || notified2.store(true, Ordering::SeqCst));

    assert!(!conn.is_closed());
    conn.close();

    wait_until(|| conn.is_closed()).await;
    assert!(torn_down.load(Ordering::SeqCst));
    assert!(notified.load(Ordering::SeqCst));
}

#[tokio::test]
async fn impl_side_intent_closes_the_connection() {
    let (conn, _seen) = connection_with_recorder(BridgeConfig::default());

    let torn_down = Arc::new(AtomicBool::new(false));
    let torn_down2 = torn_down.clone();
    conn.bridge().set_impl_closer(Box::new(move |done| {
        torn_down2.store(true, Ordering::SeqCst);
        done.complete();
    }));

    // The peer hung up: the implementation side signals intent, the
    // connection (a close root) drives the actual close.
    conn.intend_to_close();

    wait_until(|| conn.is_closed()).await;
    assert!(torn_down.load(Ordering::SeqCst));
}

#[tokio::test]
async fn close_without_registered_closer_completes() {
    let (conn, _seen) = connection_with_recorder(BridgeConfig::default());
    conn.close();
    wait_until(|| conn.is_closed()).await;
}

#[tokio::test]
async fn teardown_that_never_reports_done_stalls_the_close() {
    let (conn, _seen) = connection_with_recorder(BridgeConfig::default());

    conn.bridge().set_impl_closer(Box::new(move |done| {
        // Swallow the token: teardown never finishes.
        std::mem::forget(done);
    }));

    conn.close();
    tokio::time::sleep(Duration::from_millis(100)).await;

    // Stalled, not falsely closed.
    assert!(!conn.is_closed());
}
