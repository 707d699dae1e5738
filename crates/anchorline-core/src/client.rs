use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::catalog::LocationCatalog;
use crate::config::AppConfig;
use crate::confidence::ConfidenceTable;
use crate::engine::{AggregationEngine, AnchorEvent, SessionScope, Transition};
use crate::error::{AnchorlineError, Result};
use crate::locks::KeyLocks;
use crate::models::{AnchorKind, SessionCandidate};
use crate::repo::{HistoryRepository, SessionRepository, session_key};
use crate::store::{KeyedTtlStore, MemoryTtlStore, RetryPolicy};

/// Facade wiring the aggregation engine to its repositories.
///
/// Every mutation for a given (user, location) key runs under that
/// key's guard, so get -> transition -> put is serialized per key even
/// though the underlying store has no transactions.
#[derive(Clone)]
pub struct Anchorline {
    sessions: SessionRepository,
    history: HistoryRepository,
    engine: AggregationEngine,
    catalog: LocationCatalog,
    locks: Arc<KeyLocks>,
}

impl std::fmt::Debug for Anchorline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Anchorline").finish_non_exhaustive()
    }
}

impl Anchorline {
    #[must_use]
    pub fn new(
        store: Arc<dyn KeyedTtlStore>,
        config: &AppConfig,
        catalog: LocationCatalog,
    ) -> Self {
        let retry = RetryPolicy::new(
            config.store_retry_attempts,
            config.store_retry_base_delay(),
        );
        let locks = Arc::new(KeyLocks::default());
        Self {
            sessions: SessionRepository::new(
                store.clone(),
                retry,
                config.finalized_retention(),
            ),
            history: HistoryRepository::new(
                store,
                retry,
                config.history_limit,
                config.history_retention(),
                locks.clone(),
            ),
            engine: AggregationEngine::new(
                ConfidenceTable::new(config.confidence_cap),
                config.session_window(),
            ),
            catalog,
            locks,
        }
    }

    /// Single-instance deployment backed by the in-process store.
    #[must_use]
    pub fn in_memory(config: &AppConfig, catalog: LocationCatalog) -> Self {
        Self::new(MemoryTtlStore::shared(), config, catalog)
    }

    /// Explicit check-in with a corroborating anchor signal.
    pub fn check_in(
        &self,
        user_id: &str,
        location_id: &str,
        kind: AnchorKind,
        at: Option<DateTime<Utc>>,
    ) -> Result<Transition> {
        let user_id = require_identifier("userId", user_id)?;
        if !kind.is_entry_signal() {
            return Err(AnchorlineError::Validation(format!(
                "anchorType must be one of geofence, nfc, wifi_bssid (got {kind})"
            )));
        }
        let location_name = self.catalog.resolve(location_id)?;
        let now = at.unwrap_or_else(Utc::now);
        self.apply(
            user_id,
            location_id,
            location_name,
            AnchorEvent::Corroborate(kind),
            now,
        )
    }

    /// Explicit check-out: finalizes the open session and folds it into
    /// the user's history.
    pub fn check_out(
        &self,
        user_id: &str,
        location_id: &str,
        at: Option<DateTime<Utc>>,
    ) -> Result<Transition> {
        let user_id = require_identifier("userId", user_id)?;
        let location_name = self.catalog.resolve(location_id)?;
        let now = at.unwrap_or_else(Utc::now);
        self.apply(user_id, location_id, location_name, AnchorEvent::Finalize, now)
    }

    /// Single-tag protocol: check-in, upgrade, or check-out inferred
    /// from the current session state.
    pub fn smart_tap(&self, user_id: &str, location_id: &str) -> Result<Transition> {
        let user_id = require_identifier("userId", user_id)?;
        let location_name = self.catalog.resolve(location_id)?;
        self.apply(
            user_id,
            location_id,
            location_name,
            AnchorEvent::SmartTap,
            Utc::now(),
        )
    }

    /// Finalized visit snapshots for a user, most recent first.
    pub fn history(&self, user_id: &str, limit: usize) -> Result<Vec<SessionCandidate>> {
        let user_id = require_identifier("userId", user_id)?;
        self.history.list(user_id, limit)
    }

    fn apply(
        &self,
        user_id: &str,
        location_id: &str,
        location_name: &str,
        event: AnchorEvent,
        now: DateTime<Utc>,
    ) -> Result<Transition> {
        let key = session_key(user_id, location_id);
        let handle = self.locks.handle(&key)?;
        let _guard = handle
            .lock()
            .map_err(|_| AnchorlineError::mutex_poisoned("session key lock"))?;

        let current = self.sessions.get(user_id, location_id)?;
        let scope = SessionScope {
            user_id,
            location_id,
            location_name,
        };
        let transition = self.engine.transition(scope, current, event, now)?;
        // History first on finalize: if the append fails after retries,
        // the session record is still pending in the store and the
        // caller's next checkout attempt can complete the fold-in,
        // instead of dead-ending on AlreadyFinalized.
        if transition.is_terminal() {
            self.history.append(user_id, &transition.record)?;
        }
        if transition.mutated() {
            self.sessions.put(&transition.record, now)?;
        }
        tracing::debug!(
            user_id,
            location_id,
            action = transition.action.as_str(),
            session_id = %transition.record.id,
            confidence = transition.record.confidence_score,
            "session transition"
        );
        Ok(transition)
    }
}

fn require_identifier<'a>(field: &str, value: &'a str) -> Result<&'a str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AnchorlineError::Validation(format!(
            "missing required field: {field}"
        )));
    }
    Ok(trimmed)
}
