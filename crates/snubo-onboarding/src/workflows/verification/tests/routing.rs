use axum::http::StatusCode;
use serde_json::{json, Value};
use tower::ServiceExt;

use super::common::*;

async fn start_session(router: &axum::Router) -> String {
    let response = router
        .clone()
        .oneshot(empty_request("POST", "/api/v1/verification/sessions"))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::CREATED);

    let payload = read_json_body(response).await;
    payload["session_id"]
        .as_str()
        .expect("session id present")
        .to_string()
}

async fn post_event(router: &axum::Router, session_id: &str, event: Value) -> (StatusCode, Value) {
    let response = router
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/api/v1/verification/sessions/{session_id}/events"),
            event,
        ))
        .await
        .expect("route executes");
    let status = response.status();
    (status, read_json_body(response).await)
}

#[tokio::test]
async fn id_types_route_lists_descriptors() {
    let (service, _) = build_service();
    let router = verification_router_with_service(service);

    let response = router
        .oneshot(empty_request("GET", "/api/v1/verification/id-types"))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    let types = payload.as_array().expect("array payload");
    assert_eq!(types.len(), 4);
    assert_eq!(types[0]["id"], "aadhar");
    assert_eq!(types[0]["max_length"], 12);
    assert_eq!(types[3]["title"], "Passport");
}

#[tokio::test]
async fn start_route_creates_a_session_on_selection() {
    let (service, _) = build_service();
    let router = verification_router_with_service(service);

    let session_id = start_session(&router).await;

    let response = router
        .oneshot(empty_request(
            "GET",
            &format!("/api/v1/verification/sessions/{session_id}"),
        ))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload["step"], "select");
    assert_eq!(payload["is_verifying"], false);
}

#[tokio::test]
async fn event_route_applies_events_and_reports_rejections() {
    let (service, _) = build_service();
    let router = verification_router_with_service(service);
    let session_id = start_session(&router).await;

    let (status, payload) = post_event(
        &router,
        &session_id,
        json!({ "type": "choose_id_type", "id_type": "passport" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(payload["status"], "active");
    assert_eq!(payload["snapshot"]["step"], "details");
    assert_eq!(payload["snapshot"]["id_type_title"], "Passport");

    post_event(
        &router,
        &session_id,
        json!({ "type": "edit_id_number", "value": "X12" }),
    )
    .await;
    let (status, payload) =
        post_event(&router, &session_id, json!({ "type": "request_otp" })).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(payload["error"], "Please enter a valid passport number");
}

#[tokio::test]
async fn event_route_returns_not_found_for_unknown_sessions() {
    let (service, _) = build_service();
    let router = verification_router_with_service(service);

    let (status, payload) = post_event(&router, "vs-unknown", json!({ "type": "back" })).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(payload["error"]
        .as_str()
        .expect("error message")
        .contains("vs-unknown"));
}

#[tokio::test]
async fn delete_route_abandons_the_session() {
    let (service, _) = build_service();
    let router = verification_router_with_service(service);
    let session_id = start_session(&router).await;
    let uri = format!("/api/v1/verification/sessions/{session_id}");

    let response = router
        .clone()
        .oneshot(empty_request("DELETE", &uri))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = router
        .oneshot(empty_request("GET", &uri))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn skip_then_continue_reports_the_outcome() {
    let (service, _) = build_service();
    let router = verification_router_with_service(service);
    let session_id = start_session(&router).await;

    let (_, payload) = post_event(&router, &session_id, json!({ "type": "skip" })).await;
    assert_eq!(payload["snapshot"]["step"], "skipped");
    assert_eq!(
        payload["snapshot"]["restricted_features"]
            .as_array()
            .map(Vec::len),
        Some(5)
    );

    let (status, payload) = post_event(
        &router,
        &session_id,
        json!({ "type": "continue_without_verifying" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(payload["status"], "finished");
    assert_eq!(payload["outcome"]["verified"], false);
}
