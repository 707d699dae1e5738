use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use anchorline_core::engine::Transition;
use anchorline_core::models::{Anchor, SessionCandidate, SessionStatus};

// Required fields are Options so an omitted field gets a 400 naming it
// instead of a bare deserialization rejection.

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckinRequest {
    pub user_id: Option<String>,
    pub location_id: Option<String>,
    pub anchor_type: Option<String>,
    pub timestamp: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    pub user_id: Option<String>,
    pub location_id: Option<String>,
    pub timestamp: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TapRequest {
    pub user_id: Option<String>,
    pub location_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionsQuery {
    pub user_id: Option<String>,
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckinResponse {
    pub success: bool,
    pub action: &'static str,
    pub session_id: String,
    pub status: SessionStatus,
    pub anchors: Vec<Anchor>,
    pub confidence_score: f64,
    pub expires_at: DateTime<Utc>,
}

impl CheckinResponse {
    pub fn from_transition(transition: &Transition) -> Self {
        Self {
            success: true,
            action: transition.action.as_str(),
            session_id: transition.record.id.clone(),
            status: transition.record.status,
            anchors: transition.record.anchors.clone(),
            confidence_score: transition.record.confidence_score,
            expires_at: transition.record.expires_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutResponse {
    pub success: bool,
    pub session_id: String,
    pub duration_minutes: i64,
    pub confidence_score: f64,
    pub anchors: Vec<Anchor>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl CheckoutResponse {
    pub fn from_transition(transition: &Transition) -> Self {
        Self {
            success: true,
            session_id: transition.record.id.clone(),
            duration_minutes: transition.record.duration_minutes.unwrap_or_default(),
            confidence_score: transition.record.confidence_score,
            anchors: transition.record.anchors.clone(),
            ended_at: transition.record.ended_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TapResponse {
    pub success: bool,
    pub action: &'static str,
    pub session_id: String,
    pub status: SessionStatus,
    pub anchors: Vec<Anchor>,
    pub confidence_score: f64,
    pub expires_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_minutes: Option<i64>,
}

impl TapResponse {
    pub fn from_transition(transition: &Transition) -> Self {
        Self {
            success: true,
            action: transition.action.as_str(),
            session_id: transition.record.id.clone(),
            status: transition.record.status,
            anchors: transition.record.anchors.clone(),
            confidence_score: transition.record.confidence_score,
            expires_at: transition.record.expires_at,
            duration_minutes: transition.record.duration_minutes,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionsResponse {
    pub success: bool,
    pub user_id: String,
    pub count: usize,
    pub sessions: Vec<SessionCandidate>,
}
