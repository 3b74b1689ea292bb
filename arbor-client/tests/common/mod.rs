#![allow(dead_code)]

use arbor_client::{Subscription, TreeClient};
use arbor_model::{MockClock, Value};
use arbor_store::{StoreConfig, StoreHandle};
use futures_util::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

pub const T0: u64 = 1_700_000_000_000;

/// Client clocks run this far behind the store clock.
pub const CLIENT_LAG_MS: u64 = 250;

const WAIT: Duration = Duration::from_secs(2);
const QUIET: Duration = Duration::from_millis(150);

/// One store plus a factory for clients connected to it.
pub struct TestEnv {
    pub store: StoreHandle,
    pub server_clock: Arc<MockClock>,
    pub client_clock: Arc<MockClock>,
}

impl TestEnv {
    pub fn new() -> Self {
        Self::with_config(StoreConfig::default())
    }

    pub fn with_config(config: StoreConfig) -> Self {
        let server_clock = Arc::new(MockClock::new(T0));
        let client_clock = Arc::new(MockClock::new(T0 - CLIENT_LAG_MS));
        let store = StoreHandle::spawn_with_clock(config, server_clock.clone())
            .expect("failed to spawn store");
        Self { store, server_clock, client_clock }
    }

    /// A connected client.
    pub async fn client(&self) -> TreeClient {
        TreeClient::builder()
            .with_clock(self.client_clock.clone())
            .build(self.store.clone())
            .await
            .expect("failed to build client")
    }
}

/// Next item of a subscription, failing the test on timeout, end of stream
/// or an error item.
pub async fn next_item<T>(sub: &mut Subscription<T>) -> T {
    timeout(WAIT, sub.next())
        .await
        .expect("timed out waiting for emission")
        .expect("subscription ended")
        .expect("subscription yielded an error")
}

/// Assert nothing is emitted for a short while.
pub async fn assert_silent<T: std::fmt::Debug>(sub: &mut Subscription<T>) {
    if let Ok(item) = timeout(QUIET, sub.next()).await {
        panic!("unexpected emission: {:?}", item);
    }
}

/// Consume emissions until one satisfies `pred`.
pub async fn wait_for(sub: &mut Subscription<Value>, pred: impl Fn(&Value) -> bool) -> Value {
    timeout(WAIT, async {
        loop {
            let value = sub.next().await.expect("subscription ended").expect("error item");
            if pred(&value) {
                return value;
            }
        }
    })
    .await
    .expect("timed out waiting for matching value")
}

/// Every item emitted until the subscription goes quiet.
pub async fn drain<T>(sub: &mut Subscription<T>) -> Vec<T> {
    let mut items = Vec::new();
    while let Ok(Some(item)) = timeout(QUIET, sub.next()).await {
        items.push(item.expect("subscription yielded an error"));
    }
    items
}
