use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use snubo_onboarding::config::VerificationConfig;
use snubo_onboarding::workflows::verification::{SimulatedOtpGateway, VerificationService};

pub(crate) type AppVerificationService = VerificationService<SimulatedOtpGateway>;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Wire the verification service to the simulated gateway described by `config`.
pub(crate) fn build_verification_service(config: &VerificationConfig) -> Arc<AppVerificationService> {
    let gateway = Arc::new(SimulatedOtpGateway::new(
        config.otp_latency,
        config.demo_otp_code.clone(),
    ));
    Arc::new(VerificationService::with_event_buffer(
        config.registry(),
        gateway,
        config.event_buffer,
    )
    .with_idle_timeout(config.session_idle_timeout))
}
