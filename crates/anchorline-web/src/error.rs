use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use anchorline_core::AnchorlineError;

pub fn error_response(err: AnchorlineError, operation: &str) -> Response {
    let status = status_for_error(&err);
    let mut payload = err.to_payload(operation);
    match &err {
        AnchorlineError::UnknownLocation { known, .. } => {
            payload.details = Some(json!({ "validLocations": known }));
        }
        AnchorlineError::AlreadyFinalized { session_id } => {
            payload.details = Some(json!({ "sessionId": session_id }));
        }
        _ => {}
    }
    (
        status,
        Json(json!({ "success": false, "error": payload })),
    )
        .into_response()
}

pub fn missing_field(field: &str, operation: &str) -> Response {
    error_response(
        AnchorlineError::Validation(format!("missing required field: {field}")),
        operation,
    )
}

fn status_for_error(err: &AnchorlineError) -> StatusCode {
    match err {
        AnchorlineError::Validation(_)
        | AnchorlineError::UnknownLocation { .. }
        | AnchorlineError::AlreadyFinalized { .. } => StatusCode::BAD_REQUEST,
        AnchorlineError::NoOpenSession(_) => StatusCode::NOT_FOUND,
        AnchorlineError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        AnchorlineError::Json(_) | AnchorlineError::Internal(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}
