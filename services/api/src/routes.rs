use crate::infra::{AppState, AppVerificationService};
use axum::extract::Path;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use serde::Deserialize;
use serde_json::json;
use snubo_onboarding::validation::{check_password_strength, PasswordStrength, ValidationField};
use snubo_onboarding::workflows::verification::verification_router;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub(crate) struct PasswordStrengthRequest {
    pub(crate) password: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct FieldValidationRequest {
    pub(crate) value: String,
    #[serde(default)]
    pub(crate) confirm: Option<String>,
}

pub(crate) fn with_verification_routes(service: Arc<AppVerificationService>) -> Router {
    verification_router(service)
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
        .route(
            "/api/v1/validation/password-strength",
            post(password_strength_endpoint),
        )
        .route("/api/v1/validation/:field", post(validate_field_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

pub(crate) async fn password_strength_endpoint(
    Json(payload): Json<PasswordStrengthRequest>,
) -> Json<PasswordStrength> {
    Json(check_password_strength(&payload.password))
}

pub(crate) async fn validate_field_endpoint(
    Path(field): Path<String>,
    Json(payload): Json<FieldValidationRequest>,
) -> Response {
    let Some(validator) = ValidationField::from_key(&field) else {
        let body = json!({ "error": format!("no validator for field '{field}'") });
        return (StatusCode::NOT_FOUND, Json(body)).into_response();
    };

    let confirm = payload.confirm.unwrap_or_default();
    let result = validator.validate(&payload.value, &confirm);
    (StatusCode::OK, Json(result)).into_response()
}
