use crate::config::ConfigError;
use crate::telemetry::TelemetryError;
use crate::workflows::verification::{FlowError, VerificationServiceError};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::fmt;

#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Telemetry(TelemetryError),
    Io(std::io::Error),
    Server(axum::Error),
    Workflow(VerificationServiceError),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "configuration error: {}", err),
            AppError::Telemetry(err) => write!(f, "telemetry error: {}", err),
            AppError::Io(err) => write!(f, "io error: {}", err),
            AppError::Server(err) => write!(f, "server error: {}", err),
            AppError::Workflow(err) => write!(f, "verification error: {}", err),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(err) => Some(err),
            AppError::Telemetry(err) => Some(err),
            AppError::Io(err) => Some(err),
            AppError::Server(err) => Some(err),
            AppError::Workflow(err) => Some(err),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Workflow(VerificationServiceError::Flow(FlowError::Rejected(_))) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            AppError::Workflow(
                VerificationServiceError::NotFound(_)
                | VerificationServiceError::Flow(FlowError::Closed),
            ) => StatusCode::NOT_FOUND,
            AppError::Config(_)
            | AppError::Telemetry(_)
            | AppError::Io(_)
            | AppError::Server(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<TelemetryError> for AppError {
    fn from(value: TelemetryError) -> Self {
        Self::Telemetry(value)
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<axum::Error> for AppError {
    fn from(value: axum::Error) -> Self {
        Self::Server(value)
    }
}

impl From<VerificationServiceError> for AppError {
    fn from(value: VerificationServiceError) -> Self {
        Self::Workflow(value)
    }
}

impl From<FlowError> for AppError {
    fn from(value: FlowError) -> Self {
        Self::Workflow(VerificationServiceError::Flow(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::verification::{FlowRejection, SessionId};

    #[test]
    fn workflow_errors_map_to_client_statuses() {
        let missing = AppError::from(VerificationServiceError::NotFound(SessionId(
            "vs-000042".to_string(),
        )));
        assert_eq!(missing.into_response().status(), StatusCode::NOT_FOUND);

        let ended = AppError::from(FlowError::Closed);
        assert_eq!(ended.into_response().status(), StatusCode::NOT_FOUND);

        let rejected = AppError::from(FlowError::Rejected(FlowRejection::IncompleteOtp));
        assert_eq!(
            rejected.into_response().status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }

    #[test]
    fn infrastructure_errors_are_internal() {
        let error = AppError::from(ConfigError::InvalidPort);
        assert!(error.to_string().starts_with("configuration error"));
        assert_eq!(
            error.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
