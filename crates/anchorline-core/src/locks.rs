use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::error::{AnchorlineError, Result};

// Idle entries are swept once the registry reaches this size; anything
// with an outstanding guard handle survives the sweep.
const COMPACT_THRESHOLD: usize = 1024;

/// Per-key mutual exclusion for store mutations.
///
/// The keyed TTL store offers no compare-and-swap, so two concurrent
/// writers of one key could both read the same base value and silently
/// drop the other's update on write-back. Holding the key's guard
/// across read, transform, and write closes that window for every
/// caller in this process. Both the composite session key and the
/// per-user history key are serialized through the same registry.
#[derive(Default)]
pub(crate) struct KeyLocks {
    inner: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl KeyLocks {
    pub(crate) fn handle(&self, key: &str) -> Result<Arc<Mutex<()>>> {
        let mut registry = self
            .inner
            .lock()
            .map_err(|_| AnchorlineError::mutex_poisoned("key lock registry"))?;
        if registry.len() >= COMPACT_THRESHOLD {
            registry.retain(|_, lock| Arc::strong_count(lock) > 1);
        }
        Ok(registry.entry(key.to_string()).or_default().clone())
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.inner.lock().expect("registry lock").len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_key_shares_one_lock() {
        let locks = KeyLocks::default();
        let a = locks.handle("session:u1:gym-main").expect("handle");
        let b = locks.handle("session:u1:gym-main").expect("handle");
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn distinct_keys_do_not_contend() {
        let locks = KeyLocks::default();
        let a = locks.handle("session:u1:gym-main").expect("handle");
        let b = locks.handle("session:u1:office-hq").expect("handle");
        assert!(!Arc::ptr_eq(&a, &b));

        let _guard_a = a.lock().expect("lock a");
        // Holding a's guard must not block b.
        assert!(b.try_lock().is_ok());
    }

    #[test]
    fn registry_sweeps_idle_entries_past_threshold() {
        let locks = KeyLocks::default();
        for i in 0..5 * COMPACT_THRESHOLD {
            // Guard handle dropped immediately: entry is idle.
            let _ = locks.handle(&format!("session:u{i}:gym-main")).expect("handle");
        }
        assert!(locks.len() <= COMPACT_THRESHOLD);
    }

    #[test]
    fn sweep_keeps_entries_with_live_handles() {
        let locks = KeyLocks::default();
        let held = locks.handle("history:u-held").expect("handle");
        let _guard = held.lock().expect("lock held");
        for i in 0..2 * COMPACT_THRESHOLD {
            let _ = locks.handle(&format!("session:u{i}:gym-main")).expect("handle");
        }
        let again = locks.handle("history:u-held").expect("handle");
        assert!(Arc::ptr_eq(&held, &again), "held entry must survive the sweep");
    }
}
