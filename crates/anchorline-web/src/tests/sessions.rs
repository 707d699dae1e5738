use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::json;
use tower::util::ServiceExt;

use super::harness::{TestHarness, decode_json, get_request, json_request, t0_millis};

async fn run_visit(harness: &TestHarness, location_id: &str, t0: i64) {
    harness
        .router
        .clone()
        .oneshot(json_request(
            "/checkin",
            json!({
                "userId": "u1",
                "locationId": location_id,
                "anchorType": "nfc",
                "timestamp": t0
            }),
        ))
        .await
        .expect("checkin");
    harness
        .router
        .clone()
        .oneshot(json_request(
            "/checkout",
            json!({
                "userId": "u1",
                "locationId": location_id,
                "timestamp": t0 + 600_000
            }),
        ))
        .await
        .expect("checkout");
}

#[tokio::test]
async fn sessions_lists_history_most_recent_first() {
    let harness = TestHarness::setup();
    let t0 = t0_millis();

    run_visit(&harness, "gym-main", t0).await;
    run_visit(&harness, "office-hq", t0 + 7_200_000).await;

    let response = harness
        .router
        .clone()
        .oneshot(get_request("/sessions?userId=u1"))
        .await
        .expect("sessions");
    assert_eq!(response.status(), StatusCode::OK);
    let payload: serde_json::Value = decode_json(response).await;
    assert_eq!(payload["success"], true);
    assert_eq!(payload["count"], 2);
    let sessions = payload["sessions"].as_array().expect("sessions");
    assert_eq!(sessions[0]["locationId"], "office-hq");
    assert_eq!(sessions[1]["locationId"], "gym-main");
    assert_eq!(sessions[0]["status"], "finalized");
    assert_eq!(sessions[0]["durationMinutes"], 10);
}

#[tokio::test]
async fn sessions_honors_limit_parameter() {
    let harness = TestHarness::setup();
    let t0 = t0_millis();

    for i in 0..3 {
        run_visit(&harness, "gym-main", t0 + i * 20_000_000).await;
    }

    let response = harness
        .router
        .clone()
        .oneshot(get_request("/sessions?userId=u1&limit=2"))
        .await
        .expect("sessions");
    let payload: serde_json::Value = decode_json(response).await;
    assert_eq!(payload["count"], 2);
}

#[tokio::test]
async fn sessions_is_empty_for_unknown_user() {
    let harness = TestHarness::setup();
    let response = harness
        .router
        .clone()
        .oneshot(get_request("/sessions?userId=ghost"))
        .await
        .expect("sessions");
    assert_eq!(response.status(), StatusCode::OK);
    let payload: serde_json::Value = decode_json(response).await;
    assert_eq!(payload["count"], 0);
}

#[tokio::test]
async fn sessions_requires_user_id() {
    let harness = TestHarness::setup();
    let response = harness
        .router
        .clone()
        .oneshot(get_request("/sessions"))
        .await
        .expect("sessions");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let payload: serde_json::Value = decode_json(response).await;
    assert!(
        payload["error"]["message"]
            .as_str()
            .expect("message")
            .contains("userId")
    );
}

#[tokio::test]
async fn responses_carry_open_cors_headers() {
    let harness = TestHarness::setup();
    let response = harness
        .router
        .clone()
        .oneshot(get_request("/sessions?userId=u1"))
        .await
        .expect("sessions");
    assert_eq!(
        response
            .headers()
            .get("access-control-allow-origin")
            .and_then(|value| value.to_str().ok()),
        Some("*")
    );

    let preflight = harness
        .router
        .clone()
        .oneshot(
            Request::builder()
                .method("OPTIONS")
                .uri("/tap")
                .body(Body::empty())
                .expect("preflight request"),
        )
        .await
        .expect("preflight response");
    assert_eq!(preflight.status(), StatusCode::NO_CONTENT);
    assert!(
        preflight
            .headers()
            .get("access-control-allow-methods")
            .is_some()
    );
}
