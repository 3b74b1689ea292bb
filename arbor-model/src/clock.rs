//! Clock abstraction for testable time
//!
//! Server timestamps, push keys and the server time offset all read a
//! `Clock`. Production code uses `SystemClock`; tests pin time with
//! `MockClock`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Trait for getting the current wall clock time in milliseconds
pub trait Clock: Send + Sync {
    /// Get the current time in milliseconds since Unix epoch
    fn now_ms(&self) -> u64;
}

/// Real system clock implementation
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }
}

/// Mock clock for testing. Time only moves when told to.
#[derive(Debug, Default)]
pub struct MockClock {
    time_ms: AtomicU64,
}

impl MockClock {
    pub fn new(time_ms: u64) -> Self {
        Self { time_ms: AtomicU64::new(time_ms) }
    }

    pub fn set(&self, time_ms: u64) {
        self.time_ms.store(time_ms, Ordering::SeqCst);
    }

    pub fn advance(&self, delta_ms: u64) {
        self.time_ms.fetch_add(delta_ms, Ordering::SeqCst);
    }
}

impl Clock for MockClock {
    fn now_ms(&self) -> u64 {
        self.time_ms.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_clock_returns_reasonable_time() {
        let clock = SystemClock;
        // Should be after 2025-01-01
        assert!(clock.now_ms() > 1_735_689_600_000);
    }

    #[test]
    fn test_mock_clock_moves_only_when_told() {
        let clock = MockClock::new(12345);
        assert_eq!(clock.now_ms(), 12345);
        clock.advance(5);
        assert_eq!(clock.now_ms(), 12350);
        clock.set(1);
        assert_eq!(clock.now_ms(), 1);
    }
}
