use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;

use super::domain::{SessionId, VerificationEvent};
use super::flow::FlowError;
use super::gateway::OtpGateway;
use super::service::{VerificationService, VerificationServiceError};

/// Router builder exposing the verification session endpoints.
pub fn verification_router<G>(service: Arc<VerificationService<G>>) -> Router
where
    G: OtpGateway + 'static,
{
    Router::new()
        .route("/api/v1/verification/id-types", get(id_types_handler::<G>))
        .route("/api/v1/verification/sessions", post(start_handler::<G>))
        .route(
            "/api/v1/verification/sessions/:session_id",
            get(snapshot_handler::<G>).delete(abandon_handler::<G>),
        )
        .route(
            "/api/v1/verification/sessions/:session_id/events",
            post(event_handler::<G>),
        )
        .with_state(service)
}

pub(crate) async fn id_types_handler<G>(
    State(service): State<Arc<VerificationService<G>>>,
) -> Response
where
    G: OtpGateway + 'static,
{
    (StatusCode::OK, Json(service.id_types())).into_response()
}

pub(crate) async fn start_handler<G>(
    State(service): State<Arc<VerificationService<G>>>,
) -> Response
where
    G: OtpGateway + 'static,
{
    let snapshot = service.start();
    (StatusCode::CREATED, Json(snapshot)).into_response()
}

pub(crate) async fn snapshot_handler<G>(
    State(service): State<Arc<VerificationService<G>>>,
    Path(session_id): Path<String>,
) -> Response
where
    G: OtpGateway + 'static,
{
    match service.snapshot(&SessionId(session_id)) {
        Ok(snapshot) => (StatusCode::OK, Json(snapshot)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn event_handler<G>(
    State(service): State<Arc<VerificationService<G>>>,
    Path(session_id): Path<String>,
    Json(event): Json<VerificationEvent>,
) -> Response
where
    G: OtpGateway + 'static,
{
    match service.dispatch(&SessionId(session_id), event).await {
        Ok(status) => (StatusCode::OK, Json(status)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn abandon_handler<G>(
    State(service): State<Arc<VerificationService<G>>>,
    Path(session_id): Path<String>,
) -> Response
where
    G: OtpGateway + 'static,
{
    match service.abandon(&SessionId(session_id)) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(error) => error_response(error),
    }
}

fn error_response(error: VerificationServiceError) -> Response {
    let status = match &error {
        VerificationServiceError::Flow(FlowError::Rejected(_)) => StatusCode::UNPROCESSABLE_ENTITY,
        VerificationServiceError::NotFound(_) | VerificationServiceError::Flow(FlowError::Closed) => {
            StatusCode::NOT_FOUND
        }
    };

    let payload = json!({
        "error": error.to_string(),
    });
    (status, Json(payload)).into_response()
}
