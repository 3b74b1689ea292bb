use arbor_model::MockClock;
use arbor_store::{StoreConfig, StoreHandle};
use std::sync::Arc;

pub const T0: u64 = 1_700_000_000_000;

/// A store running on a mock clock starting at `T0`.
pub struct TestStore {
    pub store: StoreHandle,
    pub clock: Arc<MockClock>,
}

impl TestStore {
    pub fn new() -> Self {
        Self::with_config(StoreConfig::default())
    }

    pub fn with_config(config: StoreConfig) -> Self {
        let clock = Arc::new(MockClock::new(T0));
        let store =
            StoreHandle::spawn_with_clock(config, clock.clone()).expect("failed to spawn store");
        Self { store, clock }
    }
}
