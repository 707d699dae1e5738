use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::error::{AnchorlineError, Result};

/// Boundary to the networked cache backing the tracker.
///
/// Values are opaque serialized records; every write carries an
/// expiration. No compare-and-swap or transaction is assumed, which is
/// why same-key callers go through [`crate::client::Anchorline`]'s
/// per-key serialization instead of relying on the store.
pub trait KeyedTtlStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()>;
}

struct StoredValue {
    value: String,
    expires_at: Instant,
}

/// In-process store for single-instance deployments and tests.
///
/// This replaces the historical silent fallback cache: choosing it is
/// an explicit deployment decision, and it is not correct across
/// multiple processes.
#[derive(Default)]
pub struct MemoryTtlStore {
    entries: Mutex<HashMap<String, StoredValue>>,
}

impl MemoryTtlStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }
}

impl KeyedTtlStore for MemoryTtlStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| AnchorlineError::StoreUnavailable("memory store lock poisoned".into()))?;
        match entries.get(key) {
            Some(stored) if Instant::now() < stored.expires_at => Ok(Some(stored.value.clone())),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| AnchorlineError::StoreUnavailable("memory store lock poisoned".into()))?;
        entries.insert(
            key.to_string(),
            StoredValue {
                value: value.to_string(),
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }
}

/// Bounded retry with exponential backoff around store I/O. Only
/// `StoreUnavailable` is retried; domain and decode errors pass
/// through on the first attempt.
#[derive(Debug, Clone, Copy)]
pub(crate) struct RetryPolicy {
    attempts: u32,
    base_delay: Duration,
}

impl RetryPolicy {
    pub(crate) fn new(attempts: u32, base_delay: Duration) -> Self {
        Self {
            attempts: attempts.max(1),
            base_delay,
        }
    }

    pub(crate) fn run<T>(&self, mut op: impl FnMut() -> Result<T>) -> Result<T> {
        let mut delay = self.base_delay;
        let mut last_err = None;
        for attempt in 0..self.attempts {
            match op() {
                Ok(value) => return Ok(value),
                Err(err @ AnchorlineError::StoreUnavailable(_)) => {
                    tracing::warn!(attempt, error = %err, "store call failed");
                    last_err = Some(err);
                    if attempt + 1 < self.attempts {
                        std::thread::sleep(delay);
                        delay = delay.saturating_mul(2);
                    }
                }
                Err(err) => return Err(err),
            }
        }
        Err(last_err
            .unwrap_or_else(|| AnchorlineError::StoreUnavailable("retry budget exhausted".into())))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    #[test]
    fn memory_store_round_trips_within_ttl() {
        let store = MemoryTtlStore::new();
        store
            .set("session:u1:gym-main", "{\"v\":1}", Duration::from_secs(60))
            .expect("set");
        assert_eq!(
            store.get("session:u1:gym-main").expect("get"),
            Some("{\"v\":1}".to_string())
        );
        assert_eq!(store.get("session:u2:gym-main").expect("get"), None);
    }

    #[test]
    fn memory_store_expires_entries() {
        let store = MemoryTtlStore::new();
        store
            .set("history:u1", "[]", Duration::from_millis(0))
            .expect("set");
        assert_eq!(store.get("history:u1").expect("get"), None);
    }

    #[test]
    fn retry_recovers_from_transient_failure() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::new(3, Duration::from_millis(1));
        let value = policy
            .run(|| {
                if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(AnchorlineError::StoreUnavailable("timeout".into()))
                } else {
                    Ok(7)
                }
            })
            .expect("recovered");
        assert_eq!(value, 7);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn retry_gives_up_after_budget() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::new(3, Duration::from_millis(1));
        let err = policy
            .run(|| -> Result<()> {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(AnchorlineError::StoreUnavailable("timeout".into()))
            })
            .expect_err("must fail");
        assert!(matches!(err, AnchorlineError::StoreUnavailable(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn retry_does_not_mask_domain_errors() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::new(3, Duration::from_millis(1));
        let err = policy
            .run(|| -> Result<()> {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(AnchorlineError::NoOpenSession("u1@gym-main".into()))
            })
            .expect_err("must fail");
        assert!(matches!(err, AnchorlineError::NoOpenSession(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 1, "no retry on domain errors");
    }
}
