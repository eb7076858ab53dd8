use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request};
use axum::response::Response;
use chrono::Utc;
use serde_json::Value;
use tokio::sync::Notify;

use crate::workflows::verification::{
    verification_router, GatewayError, IdType, IdTypeRegistry, OtpCheck, OtpDispatch,
    OtpGateway, OtpRequestId, SessionId, VerificationService, VerificationSession,
};

pub(super) const ACCEPTED_CODE: &str = "123456";

pub(super) fn registry() -> Arc<IdTypeRegistry> {
    Arc::new(IdTypeRegistry::standard())
}

pub(super) fn session() -> VerificationSession {
    VerificationSession::new(SessionId("vs-test".to_string()), registry())
}

pub(super) fn dispatch(request_id: &str) -> OtpDispatch {
    OtpDispatch {
        request_id: OtpRequestId(request_id.to_string()),
        issued_at: Utc::now(),
    }
}

/// Gateway double that answers instantly unless gated, and fails on demand.
#[derive(Default)]
pub(super) struct ScriptedGateway {
    gate: Option<Notify>,
    send_failures: Mutex<VecDeque<GatewayError>>,
    verify_failures: Mutex<VecDeque<GatewayError>>,
    sends: AtomicUsize,
    verifies: AtomicUsize,
    last_id_number: Mutex<Option<(IdType, String)>>,
}

impl ScriptedGateway {
    /// Every call waits for a matching [`ScriptedGateway::release`].
    pub(super) fn gated() -> Self {
        Self {
            gate: Some(Notify::new()),
            ..Self::default()
        }
    }

    pub(super) fn release(&self) {
        if let Some(gate) = &self.gate {
            gate.notify_one();
        }
    }

    pub(super) fn fail_next_send(&self, error: GatewayError) {
        self.send_failures
            .lock()
            .expect("failure queue")
            .push_back(error);
    }

    pub(super) fn fail_next_verify(&self, error: GatewayError) {
        self.verify_failures
            .lock()
            .expect("failure queue")
            .push_back(error);
    }

    pub(super) fn send_calls(&self) -> usize {
        self.sends.load(Ordering::SeqCst)
    }

    pub(super) fn verify_calls(&self) -> usize {
        self.verifies.load(Ordering::SeqCst)
    }

    pub(super) fn last_id_number(&self) -> Option<(IdType, String)> {
        self.last_id_number.lock().expect("last id number").clone()
    }

    async fn wait(&self) {
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
    }
}

#[async_trait]
impl OtpGateway for ScriptedGateway {
    async fn send_otp(
        &self,
        id_type: IdType,
        id_number: &str,
    ) -> Result<OtpDispatch, GatewayError> {
        let call = self.sends.fetch_add(1, Ordering::SeqCst) + 1;
        *self.last_id_number.lock().expect("last id number") =
            Some((id_type, id_number.to_string()));
        self.wait().await;

        if let Some(error) = self.send_failures.lock().expect("failure queue").pop_front() {
            return Err(error);
        }
        Ok(dispatch(&format!("otp-{call}")))
    }

    async fn verify_otp(
        &self,
        _request_id: &OtpRequestId,
        code: &str,
    ) -> Result<OtpCheck, GatewayError> {
        self.verifies.fetch_add(1, Ordering::SeqCst);
        self.wait().await;

        if let Some(error) = self.verify_failures.lock().expect("failure queue").pop_front() {
            return Err(error);
        }
        Ok(OtpCheck {
            matched: code == ACCEPTED_CODE,
        })
    }
}

pub(super) fn build_service() -> (VerificationService<ScriptedGateway>, Arc<ScriptedGateway>) {
    let gateway = Arc::new(ScriptedGateway::default());
    let service = VerificationService::new(IdTypeRegistry::standard(), gateway.clone());
    (service, gateway)
}

pub(super) fn verification_router_with_service(
    service: VerificationService<ScriptedGateway>,
) -> axum::Router {
    verification_router(Arc::new(service))
}

pub(super) fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(&body).expect("serialize body")))
        .expect("request builds")
}

pub(super) fn empty_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .expect("request builds")
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
