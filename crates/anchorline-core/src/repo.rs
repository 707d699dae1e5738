use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::error::{AnchorlineError, Result};
use crate::locks::KeyLocks;
use crate::models::{SessionCandidate, SessionStatus};
use crate::store::{KeyedTtlStore, RetryPolicy};

// Pending writes whose window already elapsed still get a floor TTL so
// the record stays observable for the lazy-expiry read path.
const MIN_PENDING_TTL: Duration = Duration::from_secs(1);

#[must_use]
pub fn session_key(user_id: &str, location_id: &str) -> String {
    format!("session:{user_id}:{location_id}")
}

#[must_use]
pub(crate) fn history_key(user_id: &str) -> String {
    format!("history:{user_id}")
}

/// Thin adapter over the keyed TTL store for the primary session record.
/// No business logic lives here; TTL derivation is the whole contract.
#[derive(Clone)]
pub struct SessionRepository {
    store: Arc<dyn KeyedTtlStore>,
    retry: RetryPolicy,
    finalized_retention: Duration,
}

impl SessionRepository {
    pub(crate) fn new(
        store: Arc<dyn KeyedTtlStore>,
        retry: RetryPolicy,
        finalized_retention: Duration,
    ) -> Self {
        Self {
            store,
            retry,
            finalized_retention,
        }
    }

    pub fn get(&self, user_id: &str, location_id: &str) -> Result<Option<SessionCandidate>> {
        let key = session_key(user_id, location_id);
        let raw = self.retry.run(|| self.store.get(&key))?;
        raw.map(|value| serde_json::from_str(&value))
            .transpose()
            .map_err(AnchorlineError::from)
    }

    pub fn put(&self, record: &SessionCandidate, now: DateTime<Utc>) -> Result<()> {
        let key = session_key(&record.user_id, &record.location_id);
        let ttl = match record.status {
            SessionStatus::Finalized => self.finalized_retention,
            SessionStatus::Pending | SessionStatus::Active => (record.expires_at - now)
                .to_std()
                .unwrap_or(MIN_PENDING_TTL)
                .max(MIN_PENDING_TTL),
        };
        let raw = serde_json::to_string(record)?;
        self.retry.run(|| self.store.set(&key, &raw, ttl))
    }
}

/// Append-only, length-capped record of finalized visits per user.
#[derive(Clone)]
pub struct HistoryRepository {
    store: Arc<dyn KeyedTtlStore>,
    retry: RetryPolicy,
    limit: usize,
    retention: Duration,
    locks: Arc<KeyLocks>,
}

impl HistoryRepository {
    pub(crate) fn new(
        store: Arc<dyn KeyedTtlStore>,
        retry: RetryPolicy,
        limit: usize,
        retention: Duration,
        locks: Arc<KeyLocks>,
    ) -> Self {
        Self {
            store,
            retry,
            limit,
            retention,
            locks,
        }
    }

    pub fn append(&self, user_id: &str, snapshot: &SessionCandidate) -> Result<()> {
        let key = history_key(user_id);
        // The history key is shared by every location the user visits,
        // so its read-modify-write needs its own guard: session-key
        // guards do not cover finalizes racing at two locations.
        let handle = self.locks.handle(&key)?;
        let _guard = handle
            .lock()
            .map_err(|_| AnchorlineError::mutex_poisoned("history key lock"))?;
        let mut entries = self.read_all(&key)?;
        entries.push(snapshot.clone());
        if entries.len() > self.limit {
            let overflow = entries.len() - self.limit;
            entries.drain(..overflow);
        }
        let raw = serde_json::to_string(&entries)?;
        self.retry.run(|| self.store.set(&key, &raw, self.retention))
    }

    /// Finalized snapshots, most recent first.
    pub fn list(&self, user_id: &str, limit: usize) -> Result<Vec<SessionCandidate>> {
        let mut entries = self.read_all(&history_key(user_id))?;
        entries.reverse();
        entries.truncate(limit);
        Ok(entries)
    }

    fn read_all(&self, key: &str) -> Result<Vec<SessionCandidate>> {
        let raw = self.retry.run(|| self.store.get(key))?;
        match raw {
            Some(value) => serde_json::from_str(&value).map_err(AnchorlineError::from),
            None => Ok(Vec::new()),
        }
    }
}
