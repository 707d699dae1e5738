use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

pub type Result<T> = std::result::Result<T, AnchorlineError>;

#[derive(Debug, Error)]
pub enum AnchorlineError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("unknown location: {given}")]
    UnknownLocation { given: String, known: Vec<String> },

    #[error("no open session for {0}")]
    NoOpenSession(String),

    #[error("session {session_id} is already finalized")]
    AlreadyFinalized { session_id: String },

    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorPayload {
    pub code: String,
    pub message: String,
    pub operation: String,
    pub trace_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl AnchorlineError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_FAILED",
            Self::UnknownLocation { .. } => "UNKNOWN_LOCATION",
            Self::NoOpenSession(_) => "NO_OPEN_SESSION",
            Self::AlreadyFinalized { .. } => "ALREADY_FINALIZED",
            Self::StoreUnavailable(_) => "STORE_UNAVAILABLE",
            Self::Json(_) => "JSON_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    pub(crate) fn mutex_poisoned(what: &str) -> Self {
        Self::Internal(format!("{what} mutex poisoned"))
    }

    pub fn to_payload(&self, operation: impl Into<String>) -> ErrorPayload {
        ErrorPayload {
            code: self.code().to_string(),
            message: self.to_string(),
            operation: operation.into(),
            trace_id: Uuid::new_v4().to_string(),
            details: None,
        }
    }
}
