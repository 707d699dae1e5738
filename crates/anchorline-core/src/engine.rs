use chrono::{DateTime, Utc};

use crate::confidence::ConfidenceTable;
use crate::error::{AnchorlineError, Result};
use crate::models::{AnchorKind, SessionCandidate, SessionStatus};

/// Event classes an entry point can hand to the engine. Validation of
/// anchor types and locations happens before an event is built; the
/// engine's only error outcomes are `NoOpenSession` and `AlreadyFinalized`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnchorEvent {
    Corroborate(AnchorKind),
    Finalize,
    SmartTap,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionAction {
    Created,
    Upgraded,
    Duplicate,
    Finalized,
    NfcCheckin,
    NfcUpgrade,
    NfcCheckout,
}

impl SessionAction {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Upgraded => "upgraded",
            Self::Duplicate => "duplicate",
            Self::Finalized => "finalized",
            Self::NfcCheckin => "nfc_checkin",
            Self::NfcUpgrade => "nfc_upgrade",
            Self::NfcCheckout => "nfc_checkout",
        }
    }
}

/// Identity of the (user, location) pair a transition runs under, used
/// only when the engine has to open a fresh record.
#[derive(Debug, Clone, Copy)]
pub struct SessionScope<'a> {
    pub user_id: &'a str,
    pub location_id: &'a str,
    pub location_name: &'a str,
}

#[derive(Debug, Clone)]
pub struct Transition {
    pub record: SessionCandidate,
    pub action: SessionAction,
}

impl Transition {
    /// Terminal transitions fold the record into history.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self.action,
            SessionAction::Finalized | SessionAction::NfcCheckout
        )
    }

    /// Duplicate events are idempotent no-ops and must not be re-persisted.
    #[must_use]
    pub fn mutated(&self) -> bool {
        self.action != SessionAction::Duplicate
    }
}

/// Pure decision function over the session state machine.
///
/// States are Absent, Pending, and Finalized. Liveness is evaluated
/// lazily: a record whose expiry has passed, or that is already
/// finalized, counts as Absent for corroborating events even though it
/// may still physically exist in the store.
#[derive(Debug, Clone, Copy)]
pub struct AggregationEngine {
    table: ConfidenceTable,
    window: chrono::Duration,
}

impl AggregationEngine {
    #[must_use]
    pub fn new(table: ConfidenceTable, window: chrono::Duration) -> Self {
        Self { table, window }
    }

    pub fn transition(
        &self,
        scope: SessionScope<'_>,
        current: Option<SessionCandidate>,
        event: AnchorEvent,
        now: DateTime<Utc>,
    ) -> Result<Transition> {
        match event {
            AnchorEvent::Corroborate(kind) => Ok(self.corroborate(scope, current, kind, now)),
            AnchorEvent::Finalize => self.finalize_event(scope, current, now),
            AnchorEvent::SmartTap => Ok(self.smart_tap(scope, current, now)),
        }
    }

    fn corroborate(
        &self,
        scope: SessionScope<'_>,
        current: Option<SessionCandidate>,
        kind: AnchorKind,
        now: DateTime<Utc>,
    ) -> Transition {
        match current.filter(|record| record.is_open(now)) {
            None => Transition {
                record: self.open_session(scope, kind, now),
                action: SessionAction::Created,
            },
            Some(record) if record.has_anchor(kind) => Transition {
                record,
                action: SessionAction::Duplicate,
            },
            Some(mut record) => {
                self.append_anchor(&mut record, kind, now);
                Transition {
                    record,
                    action: SessionAction::Upgraded,
                }
            }
        }
    }

    fn finalize_event(
        &self,
        scope: SessionScope<'_>,
        current: Option<SessionCandidate>,
        now: DateTime<Utc>,
    ) -> Result<Transition> {
        match current {
            Some(record) if record.status == SessionStatus::Finalized => {
                Err(AnchorlineError::AlreadyFinalized {
                    session_id: record.id,
                })
            }
            Some(mut record) if !record.is_expired(now) => {
                self.finalize(&mut record, now);
                Ok(Transition {
                    record,
                    action: SessionAction::Finalized,
                })
            }
            // Absent, or pending past its window: nothing left to close.
            _ => Err(AnchorlineError::NoOpenSession(format!(
                "{}@{}",
                scope.user_id, scope.location_id
            ))),
        }
    }

    fn smart_tap(
        &self,
        scope: SessionScope<'_>,
        current: Option<SessionCandidate>,
        now: DateTime<Utc>,
    ) -> Transition {
        match current.filter(|record| record.is_open(now)) {
            None => Transition {
                record: self.open_session(scope, AnchorKind::Nfc, now),
                action: SessionAction::NfcCheckin,
            },
            Some(mut record) if !record.has_anchor(AnchorKind::Nfc) => {
                self.append_anchor(&mut record, AnchorKind::Nfc, now);
                Transition {
                    record,
                    action: SessionAction::NfcUpgrade,
                }
            }
            Some(mut record) => {
                // Second tap on a session that already carries the nfc
                // anchor: record the exit signal, re-derive the capped
                // confidence, and close out.
                self.append_anchor(&mut record, AnchorKind::NfcExit, now);
                self.finalize(&mut record, now);
                Transition {
                    record,
                    action: SessionAction::NfcCheckout,
                }
            }
        }
    }

    fn open_session(
        &self,
        scope: SessionScope<'_>,
        kind: AnchorKind,
        now: DateTime<Utc>,
    ) -> SessionCandidate {
        let mut record = SessionCandidate::open(
            scope.user_id,
            scope.location_id,
            scope.location_name,
            self.table.anchor(kind, now),
            now,
            self.window,
        );
        record.confidence_score = self.table.aggregate(&record.anchors);
        record
    }

    fn append_anchor(&self, record: &mut SessionCandidate, kind: AnchorKind, now: DateTime<Utc>) {
        record.anchors.push(self.table.anchor(kind, now));
        record.confidence_score = self.table.aggregate(&record.anchors);
        record.updated_at = now;
    }

    fn finalize(&self, record: &mut SessionCandidate, now: DateTime<Utc>) {
        // Client clocks drift; a checkout stamped before the check-in
        // still closes the visit, just with zero duration.
        let elapsed_ms = (now - record.created_at).num_milliseconds().max(0);
        record.duration_minutes = Some((elapsed_ms as f64 / 60_000.0).round() as i64);
        record.ended_at = Some(now);
        record.updated_at = now;
        record.status = SessionStatus::Finalized;
    }
}
