use std::sync::Arc;
use std::time::Duration;

use super::common::*;
use crate::workflows::verification::{
    FlowError, FlowRejection, FlowStatus, IdType, IdTypeRegistry, SessionId, VerificationEvent,
    VerificationService, VerificationServiceError, VerificationStep,
};

#[tokio::test]
async fn started_sessions_get_distinct_ids() {
    let (service, _) = build_service();

    let first = service.start();
    let second = service.start();

    assert_ne!(first.session_id, second.session_id);
    assert!(first.session_id.0.starts_with("vs-"));
    assert_eq!(first.step, VerificationStep::Select);
    assert_eq!(service.active_sessions(), 2);
}

#[tokio::test]
async fn finished_sessions_are_discarded() {
    let (service, _) = build_service();
    let session_id = service.start().session_id;

    service
        .dispatch(&session_id, VerificationEvent::Skip)
        .await
        .expect("skip accepted");
    let status = service
        .dispatch(&session_id, VerificationEvent::ContinueWithoutVerifying)
        .await
        .expect("continue accepted");

    assert!(matches!(status, FlowStatus::Finished { outcome } if !outcome.verified));
    assert_eq!(service.active_sessions(), 0);
    assert!(matches!(
        service.snapshot(&session_id),
        Err(VerificationServiceError::NotFound(_))
    ));
}

#[tokio::test]
async fn rejected_events_keep_the_session() {
    let (service, _) = build_service();
    let session_id = service.start().session_id;

    let error = service
        .dispatch(&session_id, VerificationEvent::RequestOtp)
        .await
        .expect_err("request from selection is refused");

    assert!(matches!(
        error,
        VerificationServiceError::Flow(FlowError::Rejected(FlowRejection::NotAllowed { .. }))
    ));
    assert_eq!(service.active_sessions(), 1);
}

#[tokio::test]
async fn settled_waits_for_the_gateway() {
    let (service, gateway) = build_service();
    let session_id = service.start().session_id;

    for event in [
        VerificationEvent::ChooseIdType {
            id_type: IdType::Aadhar,
        },
        VerificationEvent::EditIdNumber {
            value: "1234 5678 9012".to_string(),
        },
        VerificationEvent::RequestOtp,
    ] {
        service
            .dispatch(&session_id, event)
            .await
            .expect("event accepted");
    }

    let snapshot = service.settled(&session_id).await.expect("session live");
    assert_eq!(snapshot.step, VerificationStep::AwaitingOtp);
    assert_eq!(snapshot.id_number, "123456789012");
    assert_eq!(gateway.send_calls(), 1);
}

#[tokio::test]
async fn abandoning_unknown_sessions_reports_not_found() {
    let (service, _) = build_service();
    let session_id = service.start().session_id;

    service.abandon(&session_id).expect("live session abandoned");
    assert!(matches!(
        service.abandon(&session_id),
        Err(VerificationServiceError::NotFound(_))
    ));
    assert!(matches!(
        service
            .dispatch(&SessionId("vs-missing".to_string()), VerificationEvent::Back)
            .await,
        Err(VerificationServiceError::NotFound(_))
    ));
}

#[test]
fn id_types_follow_registry_order() {
    let (service, _) = build_service();

    let ids: Vec<IdType> = service.id_types().into_iter().map(|view| view.id).collect();

    assert_eq!(ids, IdType::ordered().to_vec());
}

#[tokio::test]
async fn idle_sessions_are_dropped_when_the_next_one_starts() {
    let gateway = Arc::new(ScriptedGateway::default());
    let service = VerificationService::new(IdTypeRegistry::standard(), gateway)
        .with_idle_timeout(Duration::ZERO);

    let stale = service.start().session_id;
    let fresh = service.start().session_id;

    assert_eq!(service.active_sessions(), 1);
    assert!(matches!(
        service.snapshot(&stale),
        Err(VerificationServiceError::NotFound(_))
    ));
    assert!(matches!(
        service
            .dispatch(&stale, VerificationEvent::Skip)
            .await,
        Err(VerificationServiceError::NotFound(_))
    ));

    assert_eq!(service.expire_idle(), 1);
    assert!(service.snapshot(&fresh).is_err());
}

#[tokio::test]
async fn active_sessions_survive_the_default_idle_window() {
    let (service, _) = build_service();
    let first = service.start().session_id;
    service.start();

    assert_eq!(service.expire_idle(), 0);
    assert!(service.snapshot(&first).is_ok());
}
