use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::registry::IdType;

/// Opaque token returned by the gateway for one OTP dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OtpRequestId(pub String);

/// Acknowledgement for a sent code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OtpDispatch {
    pub request_id: OtpRequestId,
    pub issued_at: DateTime<Utc>,
}

/// Result of checking a code; a mismatch is a normal answer, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OtpCheck {
    pub matched: bool,
}

/// Transport-level failures talking to the OTP service.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GatewayError {
    #[error("otp gateway transport failure: {0}")]
    Transport(String),
    #[error("otp gateway timed out after {0:?}")]
    Timeout(Duration),
}

/// Service boundary that issues and checks one-time codes.
#[async_trait]
pub trait OtpGateway: Send + Sync {
    async fn send_otp(&self, id_type: IdType, id_number: &str)
        -> Result<OtpDispatch, GatewayError>;

    async fn verify_otp(
        &self,
        request_id: &OtpRequestId,
        code: &str,
    ) -> Result<OtpCheck, GatewayError>;
}

/// In-process gateway that waits a fixed latency and accepts one configured code.
///
/// Used by the demo and the development server in place of a real SMS provider. Only the
/// latest code per document stays outstanding, and a matched code is consumed.
#[derive(Debug)]
pub struct SimulatedOtpGateway {
    latency: Duration,
    accepted_code: String,
    sequence: AtomicU64,
    outstanding: Mutex<HashMap<OtpRequestId, (IdType, String)>>,
}

impl SimulatedOtpGateway {
    pub fn new(latency: Duration, accepted_code: impl Into<String>) -> Self {
        Self {
            latency,
            accepted_code: accepted_code.into(),
            sequence: AtomicU64::new(1),
            outstanding: Mutex::new(HashMap::new()),
        }
    }

    /// Request ids that can still be verified.
    pub fn outstanding_count(&self) -> usize {
        self.outstanding().len()
    }

    fn outstanding(&self) -> MutexGuard<'_, HashMap<OtpRequestId, (IdType, String)>> {
        self.outstanding
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    async fn wait(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }
}

#[async_trait]
impl OtpGateway for SimulatedOtpGateway {
    async fn send_otp(
        &self,
        id_type: IdType,
        id_number: &str,
    ) -> Result<OtpDispatch, GatewayError> {
        self.wait().await;

        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed);
        let request_id = OtpRequestId(format!("otp-{sequence:06}"));
        let document = (id_type, id_number.to_string());
        {
            let mut outstanding = self.outstanding();
            outstanding.retain(|_, issued_for| *issued_for != document);
            outstanding.insert(request_id.clone(), document);
        }

        info!(request_id = %request_id.0, id_type = id_type.key(), "simulated otp issued");
        Ok(OtpDispatch {
            request_id,
            issued_at: Utc::now(),
        })
    }

    async fn verify_otp(
        &self,
        request_id: &OtpRequestId,
        code: &str,
    ) -> Result<OtpCheck, GatewayError> {
        self.wait().await;

        let mut outstanding = self.outstanding();
        let matched = outstanding.contains_key(request_id) && code == self.accepted_code;
        if matched {
            outstanding.remove(request_id);
        }

        Ok(OtpCheck { matched })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn simulated_gateway_accepts_configured_code_for_the_latest_request() {
        let gateway = SimulatedOtpGateway::new(Duration::ZERO, "123456");

        let first = gateway
            .send_otp(IdType::Passport, "A1234567")
            .await
            .expect("send succeeds");
        let second = gateway
            .send_otp(IdType::Passport, "A1234567")
            .await
            .expect("resend succeeds");
        assert_ne!(first.request_id, second.request_id);
        assert_eq!(gateway.outstanding_count(), 1);

        let superseded = gateway
            .verify_otp(&first.request_id, "123456")
            .await
            .expect("superseded request is not an error");
        assert!(!superseded.matched);

        let wrong = gateway
            .verify_otp(&second.request_id, "654321")
            .await
            .expect("mismatch is not an error");
        assert!(!wrong.matched);
        assert_eq!(gateway.outstanding_count(), 1);

        let matched = gateway
            .verify_otp(&second.request_id, "123456")
            .await
            .expect("verify succeeds");
        assert!(matched.matched);
        assert_eq!(gateway.outstanding_count(), 0);

        let replayed = gateway
            .verify_otp(&second.request_id, "123456")
            .await
            .expect("consumed request is not an error");
        assert!(!replayed.matched);
    }

    #[tokio::test]
    async fn codes_for_different_documents_stay_outstanding_together() {
        let gateway = SimulatedOtpGateway::new(Duration::ZERO, "123456");

        gateway
            .send_otp(IdType::Passport, "A1234567")
            .await
            .expect("send succeeds");
        gateway
            .send_otp(IdType::VoterId, "ABC1234567")
            .await
            .expect("send succeeds");

        assert_eq!(gateway.outstanding_count(), 2);
    }
}
