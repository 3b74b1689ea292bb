mod common;
use arbor_model::{push_id_timestamp, server_timestamp, Map, Query, TreeError, Value};
use arbor_store::StoreConfig;
use common::{TestStore, T0};
use serde_json::json;

#[tokio::test]
async fn test_write_then_read() {
    let t = TestStore::new();
    t.store.set("friends/f1", json!({"name": "Ann", "family": "Lee"})).await.unwrap();
    assert_eq!(t.store.get("friends/f1").await.unwrap(), json!({"name": "Ann", "family": "Lee"}));
    assert_eq!(t.store.get("friends/missing").await.unwrap(), Value::Null);
}

#[tokio::test]
async fn test_update_merges_multi_path_children() {
    let t = TestStore::new();
    let user = json!({"name": "Ann", "profile": {"age": 30, "city": "Oslo"}});
    t.store.set("users/u1", user).await.unwrap();

    let mut children = Map::new();
    children.insert("profile/age".into(), json!(31));
    children.insert("name".into(), Value::Null);
    t.store.update("users/u1", children).await.unwrap();

    assert_eq!(
        t.store.get("users/u1").await.unwrap(),
        json!({"profile": {"age": 31, "city": "Oslo"}})
    );
}

#[tokio::test]
async fn test_push_keys_increase_and_carry_server_time() {
    let t = TestStore::new();
    let k1 = t.store.push("friends", json!({"name": "Ann"})).await.unwrap();
    let k2 = t.store.push("friends", json!({"name": "Bob"})).await.unwrap();
    assert!(k1 < k2);
    assert_eq!(push_id_timestamp(&k1), Some(T0));

    let items = t.store.query("friends", Query::order_by_key()).await.unwrap();
    let keys: Vec<_> = items.iter().map(|i| i.key.clone()).collect();
    assert_eq!(keys, vec![k1, k2]);
}

#[tokio::test]
async fn test_server_timestamp_resolved_on_write() {
    let t = TestStore::new();
    t.clock.advance(500);
    t.store.set("users/u1/lastSeen", server_timestamp()).await.unwrap();
    assert_eq!(t.store.get("users/u1/lastSeen").await.unwrap(), json!(T0 + 500));
}

#[tokio::test]
async fn test_malformed_input_rejected() {
    let t = TestStore::new();
    assert!(matches!(t.store.get("").await, Err(TreeError::InvalidPath(_))));
    assert!(matches!(t.store.set("a/b.c", json!(1)).await, Err(TreeError::InvalidPath(_))));
    let err = t.store.set(".info/connected", json!(true)).await;
    assert!(matches!(err, Err(TreeError::InvalidPath(_))));
    let bad = Query::order_by_key().start_at(5);
    assert!(matches!(t.store.query("friends", bad).await, Err(TreeError::InvalidQuery(_))));
}

#[tokio::test]
async fn test_access_rules() {
    let config = StoreConfig {
        locked_paths: vec!["config".into()],
        max_write_bytes: Some(32),
        ..Default::default()
    };
    let t = TestStore::with_config(config);

    let err = t.store.set("config/theme", json!("dark")).await.unwrap_err();
    assert_eq!(err.code(), "permission-denied");

    let err = t.store.set("notes/n1", json!("x".repeat(64))).await.unwrap_err();
    assert_eq!(err.code(), "resource-exhausted");

    // Rejected writes leave nothing behind
    assert_eq!(t.store.export().await.unwrap(), Value::Null);
}

#[tokio::test]
async fn test_shutdown_makes_store_unavailable() {
    let t = TestStore::new();
    t.store.shutdown().await;
    tokio::task::yield_now().await;
    let err = loop {
        match t.store.get("a").await {
            Err(e) => break e,
            Ok(_) => tokio::task::yield_now().await,
        }
    };
    assert!(err.is_transport());
}
