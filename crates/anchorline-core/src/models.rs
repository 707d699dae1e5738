use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AnchorlineError;

/// Proximity signal classes reported by the automation client.
///
/// The anchor type is trusted as given; no geofence math or tag
/// verification happens on this side of the boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnchorKind {
    Geofence,
    GeofenceExit,
    Nfc,
    NfcExit,
    WifiBssid,
}

impl AnchorKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Geofence => "geofence",
            Self::GeofenceExit => "geofence_exit",
            Self::Nfc => "nfc",
            Self::NfcExit => "nfc_exit",
            Self::WifiBssid => "wifi_bssid",
        }
    }

    /// Kinds accepted on the explicit check-in path. Exit signals only
    /// appear as engine-appended anchors during finalization.
    #[must_use]
    pub fn is_entry_signal(self) -> bool {
        matches!(self, Self::Geofence | Self::Nfc | Self::WifiBssid)
    }
}

impl std::fmt::Display for AnchorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AnchorKind {
    type Err = AnchorlineError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim() {
            "geofence" => Ok(Self::Geofence),
            "geofence_exit" => Ok(Self::GeofenceExit),
            "nfc" => Ok(Self::Nfc),
            "nfc_exit" => Ok(Self::NfcExit),
            "wifi_bssid" => Ok(Self::WifiBssid),
            other => Err(AnchorlineError::Validation(format!(
                "unknown anchor type: {other}"
            ))),
        }
    }
}

/// One corroborating signal. Immutable once recorded.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Anchor {
    #[serde(rename = "type")]
    pub kind: AnchorKind,
    pub confidence_increment: f64,
    pub observed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Pending,
    /// Reserved for a future mid-session promotion; no transition
    /// currently assigns it.
    Active,
    Finalized,
}

/// The aggregate unit of a visit: one record per (user, location) key.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionCandidate {
    pub id: String,
    pub user_id: String,
    pub location_id: String,
    pub location_name: String,
    pub anchors: Vec<Anchor>,
    pub confidence_score: f64,
    pub status: SessionStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_minutes: Option<i64>,
}

impl SessionCandidate {
    #[must_use]
    pub fn open(
        user_id: impl Into<String>,
        location_id: impl Into<String>,
        location_name: impl Into<String>,
        first: Anchor,
        now: DateTime<Utc>,
        window: chrono::Duration,
    ) -> Self {
        let confidence_score = first.confidence_increment;
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            location_id: location_id.into(),
            location_name: location_name.into(),
            anchors: vec![first],
            confidence_score,
            status: SessionStatus::Pending,
            created_at: now,
            updated_at: now,
            expires_at: now + window,
            ended_at: None,
            duration_minutes: None,
        }
    }

    #[must_use]
    pub fn has_anchor(&self, kind: AnchorKind) -> bool {
        self.anchors.iter().any(|anchor| anchor.kind == kind)
    }

    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    /// Live pending record: the only state corroborating events may mutate.
    #[must_use]
    pub fn is_open(&self, now: DateTime<Utc>) -> bool {
        self.status == SessionStatus::Pending && !self.is_expired(now)
    }
}
