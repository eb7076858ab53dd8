use crate::cli::ServeArgs;
use crate::infra::{build_verification_service, AppState};
use crate::routes::with_verification_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use snubo_onboarding::config::AppConfig;
use snubo_onboarding::error::AppError;
use snubo_onboarding::telemetry;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let verification_service = build_verification_service(&config.verification);
    let id_types = config
        .verification
        .enabled_id_types
        .iter()
        .map(|id_type| id_type.key())
        .collect::<Vec<_>>()
        .join(",");

    let app = with_verification_routes(verification_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        id_types = %id_types,
        otp_latency_ms = config.verification.otp_latency.as_millis() as u64,
        "onboarding verification service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
