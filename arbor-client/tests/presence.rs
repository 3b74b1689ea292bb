mod common;
use arbor_model::Value;
use common::{assert_silent, wait_for, TestEnv, T0};
use serde_json::json;

fn online(v: &Value) -> bool {
    v.get("online") == Some(&json!(true))
}

fn offline(v: &Value) -> bool {
    v.get("online") == Some(&json!(false))
}

#[tokio::test]
async fn test_presence_online_while_connected() {
    let env = TestEnv::new();
    let client = env.client().await;
    let observer = env.client().await;

    let mut watch = observer.adapter().subscribe_object("users/u1").await.unwrap();
    let _presence = client.adapter().monitor_presence("u1");

    wait_for(&mut watch, online).await;
}

#[tokio::test]
async fn test_presence_marked_offline_when_client_vanishes() {
    let env = TestEnv::new();
    let client = env.client().await;
    let observer = env.client().await;

    let mut watch = observer.adapter().subscribe_object("users/u1").await.unwrap();
    let presence = client.adapter().monitor_presence("u1");
    wait_for(&mut watch, online).await;

    // No disconnect call: the client and everything it owns just go away
    env.server_clock.advance(5_000);
    drop(presence);
    drop(client);

    let last = wait_for(&mut watch, offline).await;
    assert_eq!(last, json!({"online": false, "lastSeen": T0 + 5_000}));
}

#[tokio::test]
async fn test_presence_reregisters_on_reconnect() {
    let env = TestEnv::new();
    let client = env.client().await;
    let observer = env.client().await;

    let mut watch = observer.adapter().subscribe_object("users/u1").await.unwrap();
    let _presence = client.adapter().monitor_presence("u1");
    wait_for(&mut watch, online).await;

    client.go_offline().await.unwrap();
    wait_for(&mut watch, offline).await;

    client.go_online().await.unwrap();
    wait_for(&mut watch, online).await;

    // The hook for the second session was registered again
    env.server_clock.advance(60_000);
    client.go_offline().await.unwrap();
    let last = wait_for(&mut watch, offline).await;
    assert_eq!(last["lastSeen"], json!(T0 + 60_000));
}

#[tokio::test]
async fn test_stopped_monitor_no_longer_announces() {
    let env = TestEnv::new();
    let client = env.client().await;
    let observer = env.client().await;

    let mut watch = observer.adapter().subscribe_object("users/u1").await.unwrap();
    let presence = client.adapter().monitor_presence("u1");
    assert_eq!(presence.path(), "users/u1");
    wait_for(&mut watch, online).await;
    presence.stop().await;

    // The hook registered before stopping still fires
    client.go_offline().await.unwrap();
    wait_for(&mut watch, offline).await;

    client.go_online().await.unwrap();
    assert_silent(&mut watch).await;
}

#[tokio::test]
async fn test_disconnect_racing_announce_never_leaves_user_online() {
    let env = TestEnv::new();
    let client = env.client().await;
    let observer = env.client().await;

    let _presence = client.adapter().monitor_presence("u1");
    for _ in 0..25 {
        client.go_offline().await.unwrap();
        client.go_online().await.unwrap();
        tokio::task::yield_now().await;
    }
    client.go_offline().await.unwrap();

    // Let any in-flight announce finish (or fail)
    tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    let online = observer.adapter().read_once("users/u1/online").await.unwrap();
    assert_ne!(online, json!(true));
}
