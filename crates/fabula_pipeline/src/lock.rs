//! Per-user generation lock.

use fabula_interface::GenerationLock;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Default lock lifetime. Long enough to outlast any single generation,
/// short enough that a crashed worker frees the user within the hour.
pub const DEFAULT_LOCK_TTL: Duration = Duration::from_secs(2000);

/// In-process set-if-absent lock with TTL expiry.
///
/// One slot per user. Acquisition fails while an unexpired slot exists;
/// an expired slot is reclaimed by the next acquire.
pub struct TtlLock {
    ttl: Duration,
    slots: Mutex<HashMap<i32, Instant>>,
}

impl TtlLock {
    /// Create a lock with the given TTL.
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            slots: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for TtlLock {
    fn default() -> Self {
        Self::new(DEFAULT_LOCK_TTL)
    }
}

impl GenerationLock for TtlLock {
    fn acquire(&self, user_id: i32) -> bool {
        let mut slots = match self.slots.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        match slots.get(&user_id) {
            Some(taken_at) if taken_at.elapsed() < self.ttl => false,
            _ => {
                slots.insert(user_id, Instant::now());
                tracing::debug!(user_id, "generation lock acquired");
                true
            }
        }
    }

    fn release(&self, user_id: i32) {
        let mut slots = match self.slots.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if slots.remove(&user_id).is_some() {
            tracing::debug!(user_id, "generation lock released");
        }
    }
}
