//! Integration tests for the brontosaurus modules with Store
//!
//! These tests drive the full surface end to end: plain actions, thunks,
//! request lifecycles observed through store snapshots, and combined modules.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use brontosaurus::{BrontosaurusState, HERD, MEADOW, brontosaurus, ecosystem};
use rexmodule_core::{Module, RequestSlots};
use rexmodule_runtime::{Snapshot, Store};
use rexmodule_testing::{Gate, assertions};
use serde_json::json;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio_test::{assert_pending, assert_ready, task};

fn gated(gate: &Gate, calls: &Arc<AtomicUsize>) -> Module<BrontosaurusState> {
    let gate = gate.clone();
    let calls = Arc::clone(calls);
    brontosaurus(move |a, b| {
        calls.fetch_add(1, Ordering::SeqCst);
        let gate = gate.clone();
        async move {
            gate.wait().await;
            anyhow::Ok(a + b)
        }
    })
    .unwrap()
}

fn drain(rx: &mut tokio::sync::broadcast::Receiver<Snapshot<BrontosaurusState>>) -> Vec<BrontosaurusState> {
    let mut states = Vec::new();
    while let Ok(snapshot) = rx.try_recv() {
        states.push(snapshot.state);
    }
    states
}

#[test]
fn test_brontosaurus_with_store() {
    let module = gated(&Gate::new(), &Arc::new(AtomicUsize::new(0)));
    let eat = module.action("eatFood", "palm tree").unwrap();
    let grow = module.action("incrementNeck", 1).unwrap();
    let store = Store::new(module);

    // Initial state
    assert_eq!(store.state(|s| s.neck_length), 30);
    assert!(store.state(|s| s.stomach_contents.is_empty()));

    store.dispatch(eat);
    store.dispatch(grow);

    assert_eq!(store.state(|s| s.stomach_contents.clone()), vec!["palm tree"]);
    assert_eq!(store.state(|s| s.neck_length), 31);
}

#[tokio::test]
async fn test_delayed_food() {
    let module = gated(&Gate::new(), &Arc::new(AtomicUsize::new(0)));
    let delayed = module.thunk("delayedFood", vec![json!("cycad"), json!(5)]).unwrap();
    let store = Store::new(module);

    let pending = store.run(delayed);
    assert!(store.state(|s| s.stomach_contents.is_empty()));

    assert_eq!(pending.await.unwrap(), None);
    assert_eq!(store.state(|s| s.stomach_contents.clone()), vec!["cycad"]);
}

#[tokio::test]
async fn test_destiny_snapshots_in_order() {
    let gate = Gate::new();
    let module = gated(&gate, &Arc::new(AtomicUsize::new(0)));
    let destiny = module.request("destiny", vec![json!(2), json!(3)]).unwrap();
    let dreams = module.action("eatFood", "destiny dreams").unwrap();
    let store = Store::new(module);
    let mut rx = store.subscribe();

    let pending = store.run(destiny);
    store.dispatch(dreams);

    let early = drain(&mut rx);
    assert_eq!(early.len(), 2);
    assertions::assert_loading(&early[0].destiny);
    assert!(early[0].stomach_contents.is_empty());
    assertions::assert_loading(&early[1].destiny);
    assert_eq!(early[1].stomach_contents, vec!["destiny dreams"]);

    gate.open();
    assert_eq!(pending.await.unwrap(), Some(json!(5)));

    let late = drain(&mut rx);
    assert_eq!(late.len(), 1);
    assertions::assert_loaded(&late[0].destiny, &json!(5));
    assert_eq!(late[0].stomach_contents, vec!["destiny dreams"]);
}

#[tokio::test]
async fn test_failure_request() {
    let module = gated(&Gate::new(), &Arc::new(AtomicUsize::new(0)));
    let failure = module.request("failure", vec![json!(2)]).unwrap();
    let store = Store::new(module);

    let error = store.run(failure).await.unwrap_err();

    assert_eq!(error.to_string(), "2");
    assertions::assert_failed(&store.state(|s| s.failure.clone()), "2");
    assertions::assert_idle(&store.state(|s| s.destiny.clone()));
}

#[test]
fn test_duplicate_trigger_resolves_immediately() {
    let gate = Gate::new();
    let calls = Arc::new(AtomicUsize::new(0));
    let module = gated(&gate, &calls);
    let first = module.request("destiny", vec![json!(2), json!(3)]).unwrap();
    let second = module.request("destiny", vec![json!(4), json!(4)]).unwrap();
    let store = Store::new(module);

    let mut first = task::spawn(store.run(first));
    assert_pending!(first.poll());

    let mut second = task::spawn(store.run(second));
    let duplicate = assert_ready!(second.poll());
    assert_eq!(duplicate.unwrap(), None);
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    gate.open();
    assert!(first.is_woken());
    let settled = assert_ready!(first.poll());
    assert_eq!(settled.unwrap(), Some(json!(5)));
    assert_eq!(store.state(|s| s.destiny.data.clone()), json!(5));
    assert_eq!(store.dispatch_count(), 2);
}

#[tokio::test]
async fn test_stretch_and_eat() {
    let module = gated(&Gate::new(), &Arc::new(AtomicUsize::new(0)));
    let stretch = module.thunk("stretchAndEat", vec![json!("fern")]).unwrap();
    let store = Store::new(module);

    assert_eq!(store.run(stretch).await.unwrap(), Some(json!(31)));
    assert_eq!(store.state(|s| s.stomach_contents.clone()), vec!["fern"]);
    assert_eq!(store.dispatch_count(), 2);
}

#[test]
fn test_ecosystem_nests_modules_by_namespace() {
    let root = ecosystem().unwrap();
    let store = Store::new(root);

    let state = store.get_state();
    assert_eq!(state[MEADOW], json!({"plants": ["fern", "cycad"]}));
    assert_eq!(state[HERD]["members"], 3);
}

#[test]
fn test_graze_updates_herd_and_meadow() {
    let root = Arc::new(ecosystem().unwrap());
    let herd = root.module(HERD).unwrap();
    let graze_fern = herd.action("graze", "fern").unwrap();
    let graze_oak = herd.action("graze", "oak").unwrap();
    let store = Store::new(Arc::clone(&root));

    store.dispatch(graze_fern);
    store.dispatch(graze_oak);

    assert_eq!(store.state(|s| s[MEADOW]["plants"].clone()), json!(["cycad"]));
    assert_eq!(store.state(|s| s[HERD]["grazed"].clone()), json!(["fern"]));
}

#[tokio::test]
async fn test_census_through_root_store() {
    let root = Arc::new(ecosystem().unwrap());
    let first = root.request(HERD, "census", vec![json!(5)]).unwrap();
    let second = root.request(HERD, "census", vec![]).unwrap();
    let store = Store::new(Arc::clone(&root));

    let pending = store.run(first);
    assertions::assert_loading(&store.state(|s| s[HERD].request("census")).unwrap());

    assert_eq!(store.run(second).await.unwrap(), None);
    assert_eq!(pending.await.unwrap(), Some(json!({"counted": true})));

    let census = store.state(|s| s[HERD].request("census")).unwrap();
    assertions::assert_loaded(&census, &json!({"counted": true}));
    assert_eq!(store.state(|s| s[MEADOW]["plants"].clone()), json!(["fern", "cycad"]));
    assert_eq!(store.dispatch_count(), 2);
}

#[tokio::test]
async fn test_migrate_joins_then_counts() {
    let root = Arc::new(ecosystem().unwrap());
    let migrate = root.thunk(HERD, "migrate", vec![]).unwrap();
    let store = Store::new(Arc::clone(&root));
    let mut rx = store.subscribe();

    assert_eq!(store.run(migrate).await.unwrap(), Some(json!({"counted": true})));

    let mut types = Vec::new();
    while let Ok(snapshot) = rx.try_recv() {
        types.push(snapshot.action.action_type);
    }
    assert_eq!(types, vec!["herd//join", "herd//_censusLoading", "herd//_censusSuccess"]);
    assert_eq!(store.state(|s| s[HERD]["members"].clone()), json!(4));
}

#[test]
fn test_unknown_herd_lookups() {
    let root = ecosystem().unwrap();
    assert!(root.thunk("flock", "migrate", vec![]).is_err());
    assert!(root.request(MEADOW, "census", vec![]).is_err());
}
