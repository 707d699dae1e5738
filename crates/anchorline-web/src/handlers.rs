use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, TimeZone, Utc};

use anchorline_core::AnchorlineError;
use anchorline_core::models::AnchorKind;

use crate::WebState;
use crate::dto::{
    CheckinRequest, CheckinResponse, CheckoutRequest, CheckoutResponse, SessionsQuery,
    SessionsResponse, TapRequest, TapResponse,
};
use crate::error::{error_response, missing_field};

const DEFAULT_HISTORY_PAGE: usize = 20;

pub async fn check_in(
    State(state): State<WebState>,
    Json(request): Json<CheckinRequest>,
) -> Response {
    let Some(user_id) = present(request.user_id.as_deref()) else {
        return missing_field("userId", "checkin");
    };
    let Some(location_id) = present(request.location_id.as_deref()) else {
        return missing_field("locationId", "checkin");
    };
    let Some(anchor_type) = present(request.anchor_type.as_deref()) else {
        return missing_field("anchorType", "checkin");
    };
    let kind = match anchor_type.parse::<AnchorKind>() {
        Ok(kind) => kind,
        Err(err) => return error_response(err, "checkin"),
    };
    let at = match parse_timestamp(request.timestamp) {
        Ok(at) => at,
        Err(err) => return error_response(err, "checkin"),
    };

    match state.app.check_in(user_id, location_id, kind, at) {
        Ok(transition) => {
            tracing::info!(
                user_id,
                location_id,
                action = transition.action.as_str(),
                confidence = transition.record.confidence_score,
                "checkin"
            );
            (
                StatusCode::OK,
                Json(CheckinResponse::from_transition(&transition)),
            )
                .into_response()
        }
        Err(err) => error_response(err, "checkin"),
    }
}

pub async fn check_out(
    State(state): State<WebState>,
    Json(request): Json<CheckoutRequest>,
) -> Response {
    let Some(user_id) = present(request.user_id.as_deref()) else {
        return missing_field("userId", "checkout");
    };
    let Some(location_id) = present(request.location_id.as_deref()) else {
        return missing_field("locationId", "checkout");
    };
    let at = match parse_timestamp(request.timestamp) {
        Ok(at) => at,
        Err(err) => return error_response(err, "checkout"),
    };

    match state.app.check_out(user_id, location_id, at) {
        Ok(transition) => {
            tracing::info!(
                user_id,
                location_id,
                duration_minutes = transition.record.duration_minutes,
                "checkout"
            );
            (
                StatusCode::OK,
                Json(CheckoutResponse::from_transition(&transition)),
            )
                .into_response()
        }
        Err(err) => error_response(err, "checkout"),
    }
}

pub async fn smart_tap(State(state): State<WebState>, Json(request): Json<TapRequest>) -> Response {
    let Some(user_id) = present(request.user_id.as_deref()) else {
        return missing_field("userId", "tap");
    };
    let Some(location_id) = present(request.location_id.as_deref()) else {
        return missing_field("locationId", "tap");
    };

    match state.app.smart_tap(user_id, location_id) {
        Ok(transition) => {
            tracing::info!(
                user_id,
                location_id,
                action = transition.action.as_str(),
                "tap"
            );
            (
                StatusCode::OK,
                Json(TapResponse::from_transition(&transition)),
            )
                .into_response()
        }
        Err(err) => error_response(err, "tap"),
    }
}

pub async fn list_sessions(
    State(state): State<WebState>,
    Query(query): Query<SessionsQuery>,
) -> Response {
    let Some(user_id) = present(query.user_id.as_deref()) else {
        return missing_field("userId", "sessions.list");
    };
    let limit = query.limit.unwrap_or(DEFAULT_HISTORY_PAGE);

    match state.app.history(user_id, limit) {
        Ok(sessions) => (
            StatusCode::OK,
            Json(SessionsResponse {
                success: true,
                user_id: user_id.to_string(),
                count: sessions.len(),
                sessions,
            }),
        )
            .into_response(),
        Err(err) => error_response(err, "sessions.list"),
    }
}

fn present(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

fn parse_timestamp(
    raw: Option<i64>,
) -> Result<Option<DateTime<Utc>>, AnchorlineError> {
    let Some(millis) = raw else { return Ok(None) };
    Utc.timestamp_millis_opt(millis)
        .single()
        .map(Some)
        .ok_or_else(|| {
            AnchorlineError::Validation(format!(
                "timestamp must be epoch milliseconds (got {millis})"
            ))
        })
}
