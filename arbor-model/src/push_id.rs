//! Push keys: unique, time-ordered list keys
//!
//! A key is 20 characters: 8 encode the millisecond timestamp, 12 are
//! random. Keys from one generator are strictly increasing: within the
//! same millisecond the random tail is incremented instead of redrawn,
//! and a clock that steps backwards keeps the last timestamp.

use crate::clock::{Clock, SystemClock};
use rand::Rng;
use std::sync::{Arc, Mutex};

/// Alphabet in ASCII order so lexicographic order matches generation order.
pub const PUSH_CHARS: &[u8; 64] =
    b"-0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ_abcdefghijklmnopqrstuvwxyz";

pub const PUSH_ID_LEN: usize = 20;
const TIME_LEN: usize = 8;
const RAND_LEN: usize = PUSH_ID_LEN - TIME_LEN;

#[derive(Debug, Default)]
struct PushState {
    last_ms: Option<u64>,
    last_rand: [u8; RAND_LEN],
}

/// Generates push keys from a clock.
pub struct PushIdGenerator {
    clock: Arc<dyn Clock>,
    state: Mutex<PushState>,
}

impl std::fmt::Debug for PushIdGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PushIdGenerator").finish_non_exhaustive()
    }
}

impl Default for PushIdGenerator {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

impl PushIdGenerator {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock, state: Mutex::new(PushState::default()) }
    }

    /// Produce the next key.
    pub fn next_id(&self) -> String {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        let mut now = self.clock.now_ms();

        match state.last_ms {
            Some(last) if now <= last => {
                now = last;
                if !increment(&mut state.last_rand) {
                    // Tail exhausted within one millisecond: borrow the next one
                    now = last + 1;
                    randomize(&mut state.last_rand);
                }
            }
            _ => randomize(&mut state.last_rand),
        }
        state.last_ms = Some(now);

        let mut out = [0u8; PUSH_ID_LEN];
        let mut ts = now;
        for slot in out[..TIME_LEN].iter_mut().rev() {
            *slot = PUSH_CHARS[(ts % 64) as usize];
            ts /= 64;
        }
        for (slot, idx) in out[TIME_LEN..].iter_mut().zip(state.last_rand.iter()) {
            *slot = PUSH_CHARS[*idx as usize];
        }

        out.iter().map(|&b| b as char).collect()
    }
}

fn randomize(tail: &mut [u8; RAND_LEN]) {
    let mut rng = rand::thread_rng();
    for slot in tail.iter_mut() {
        *slot = rng.gen_range(0..64);
    }
}

/// Increment the tail as a base-64 number. Returns false on overflow.
fn increment(tail: &mut [u8; RAND_LEN]) -> bool {
    for slot in tail.iter_mut().rev() {
        if *slot == 63 {
            *slot = 0;
        } else {
            *slot += 1;
            return true;
        }
    }
    false
}

/// Recover the millisecond timestamp encoded in a push key.
pub fn push_id_timestamp(key: &str) -> Option<u64> {
    if key.len() != PUSH_ID_LEN {
        return None;
    }
    key.bytes().take(TIME_LEN).try_fold(0u64, |acc, b| {
        let digit = PUSH_CHARS.iter().position(|&c| c == b)? as u64;
        Some(acc * 64 + digit)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::MockClock;

    #[test]
    fn test_keys_strictly_increase_within_one_millisecond() {
        let clock = Arc::new(MockClock::new(1_700_000_000_000));
        let gen = PushIdGenerator::new(clock);
        let keys: Vec<String> = (0..500).map(|_| gen.next_id()).collect();
        for pair in keys.windows(2) {
            assert!(pair[0] < pair[1], "{} !< {}", pair[0], pair[1]);
        }
        assert!(keys.iter().all(|k| k.len() == PUSH_ID_LEN));
    }

    #[test]
    fn test_keys_increase_across_time_and_backwards_clock() {
        let clock = Arc::new(MockClock::new(5_000));
        let gen = PushIdGenerator::new(clock.clone());
        let a = gen.next_id();
        clock.advance(10);
        let b = gen.next_id();
        clock.set(1_000);
        let c = gen.next_id();
        assert!(a < b);
        assert!(b < c);
        assert_eq!(push_id_timestamp(&a), Some(5_000));
        assert_eq!(push_id_timestamp(&b), Some(5_010));
        assert_eq!(push_id_timestamp(&c), Some(5_010));
    }

    #[test]
    fn test_increment_carries() {
        let mut tail = [0u8; RAND_LEN];
        tail[RAND_LEN - 1] = 63;
        assert!(increment(&mut tail));
        assert_eq!(tail[RAND_LEN - 1], 0);
        assert_eq!(tail[RAND_LEN - 2], 1);

        let mut full = [63u8; RAND_LEN];
        assert!(!increment(&mut full));
    }

    #[test]
    fn test_timestamp_rejects_foreign_keys() {
        assert_eq!(push_id_timestamp("f1"), None);
        assert_eq!(push_id_timestamp("!!!!!!!!!!!!!!!!!!!!"), None);
    }
}
