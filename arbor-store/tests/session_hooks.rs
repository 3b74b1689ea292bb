mod common;
use arbor_model::{server_timestamp, DisconnectOp, Map, TreeError, Value};
use arbor_store::StoreConfig;
use common::{TestStore, T0};
use serde_json::json;
use std::time::Duration;
use tokio::time::timeout;

#[tokio::test]
async fn test_graceful_disconnect_runs_hooks_in_order() {
    let t = TestStore::new();
    let session = t.store.connect().await.unwrap();
    assert_eq!(session.server_time_ms(), T0);

    for status in ["first", "second"] {
        let op = DisconnectOp::Set(json!(status));
        t.store.on_disconnect(session.id(), "status", op).await.unwrap();
    }
    t.store.disconnect(session).await.unwrap();

    assert_eq!(t.store.get("status").await.unwrap(), json!("second"));
}

#[tokio::test]
async fn test_dropped_session_runs_hooks_without_client_action() {
    let t = TestStore::new();
    t.store.set("users/u1/online", json!(true)).await.unwrap();
    let mut watch = t.store.listen("users/u1").await.unwrap();

    let session = t.store.connect().await.unwrap();
    let mut update = Map::new();
    update.insert("online".into(), json!(false));
    update.insert("lastSeen".into(), server_timestamp());
    t.store.on_disconnect(session.id(), "users/u1", DisconnectOp::Update(update)).await.unwrap();

    t.clock.advance(1_000);
    // Abrupt: the client just disappears
    drop(session);

    let after = timeout(Duration::from_secs(1), watch.updates.recv()).await.unwrap().unwrap();
    assert_eq!(after, json!({"online": false, "lastSeen": T0 + 1_000}));
}

#[tokio::test]
async fn test_cancelled_hooks_do_not_run() {
    let t = TestStore::new();
    let session = t.store.connect().await.unwrap();
    t.store.on_disconnect(session.id(), "a/b", DisconnectOp::Set(json!(1))).await.unwrap();
    t.store.on_disconnect(session.id(), "c", DisconnectOp::Set(json!(2))).await.unwrap();
    t.store.cancel_on_disconnect(session.id(), "a").await.unwrap();
    t.store.disconnect(session).await.unwrap();

    assert_eq!(t.store.export().await.unwrap(), json!({"c": 2}));
}

#[tokio::test]
async fn test_hooks_run_once_and_die_with_session() {
    let t = TestStore::new();
    let session = t.store.connect().await.unwrap();
    let id = session.id();
    t.store.on_disconnect(id, "counter", DisconnectOp::Remove).await.unwrap();
    t.store.disconnect(session).await.unwrap();

    t.store.set("counter", json!(5)).await.unwrap();
    // A second session does not inherit the first one's hooks
    let next = t.store.connect().await.unwrap();
    t.store.disconnect(next).await.unwrap();
    assert_eq!(t.store.get("counter").await.unwrap(), json!(5));

    let err = t.store.on_disconnect(id, "x", DisconnectOp::Remove).await.unwrap_err();
    assert!(matches!(err, TreeError::Unavailable(_)));
}

#[tokio::test]
async fn test_hook_on_locked_path_rejected_at_registration() {
    let config = StoreConfig {
        locked_paths: vec!["locked".into(), "area/admin".into()],
        ..Default::default()
    };
    let t = TestStore::with_config(config);
    let session = t.store.connect().await.unwrap();
    let err = t
        .store
        .on_disconnect(session.id(), "locked/x", DisconnectOp::Set(Value::Bool(true)))
        .await
        .unwrap_err();
    assert_eq!(err.code(), "permission-denied");

    // Update hooks are checked per touched child
    let mut children = Map::new();
    children.insert("admin/flag".into(), json!(true));
    let err = t
        .store
        .on_disconnect(session.id(), "area", DisconnectOp::Update(children))
        .await
        .unwrap_err();
    assert_eq!(err.code(), "permission-denied");

    let mut children = Map::new();
    children.insert("public".into(), json!(1));
    t.store.on_disconnect(session.id(), "area", DisconnectOp::Update(children)).await.unwrap();
}

#[tokio::test]
async fn test_oversized_hooks_rejected_at_registration() {
    let config = StoreConfig { max_write_bytes: Some(16), ..Default::default() };
    let t = TestStore::with_config(config);
    let session = t.store.connect().await.unwrap();
    let big = json!("a value well past the sixteen byte limit");

    let err = t
        .store
        .on_disconnect(session.id(), "status", DisconnectOp::Set(big.clone()))
        .await
        .unwrap_err();
    assert_eq!(err.code(), "resource-exhausted");

    let mut children = Map::new();
    children.insert("note".into(), big);
    let err = t
        .store
        .on_disconnect(session.id(), "users/u1", DisconnectOp::Update(children))
        .await
        .unwrap_err();
    assert_eq!(err.code(), "resource-exhausted");

    // Nothing was registered, so disconnecting writes nothing
    t.store.disconnect(session).await.unwrap();
    assert_eq!(t.store.export().await.unwrap(), Value::Null);
}

#[tokio::test]
async fn test_unrelated_listener_silent_when_no_hooks() {
    let t = TestStore::new();
    let mut watch = t.store.listen("a").await.unwrap();
    let session = t.store.connect().await.unwrap();
    drop(session);
    assert!(timeout(Duration::from_millis(30), watch.updates.recv()).await.is_err());
}
