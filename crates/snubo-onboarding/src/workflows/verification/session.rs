use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::domain::{
    restricted_features, FlowRejection, Notice, SessionId, VerificationEvent,
    VerificationOutcome, VerificationStep,
};
use super::gateway::{GatewayError, OtpCheck, OtpDispatch, OtpRequestId};
use super::registry::{IdType, IdTypeDescriptor, IdTypeRegistry};
use crate::validation::ValidationResult;

pub const OTP_LENGTH: usize = 6;

/// Sequence number tying a gateway reply to the request that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CallTicket(u64);

impl CallTicket {
    pub const fn value(self) -> u64 {
        self.0
    }
}

/// Outbound gateway call requested by an accepted event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayCommand {
    SendOtp {
        ticket: CallTicket,
        id_type: IdType,
        id_number: String,
    },
    VerifyOtp {
        ticket: CallTicket,
        request_id: OtpRequestId,
        code: String,
    },
}

impl GatewayCommand {
    pub fn ticket(&self) -> CallTicket {
        match self {
            GatewayCommand::SendOtp { ticket, .. } | GatewayCommand::VerifyOtp { ticket, .. } => {
                *ticket
            }
        }
    }
}

/// Gateway answer routed back into the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayReply {
    Sent {
        ticket: CallTicket,
        result: Result<OtpDispatch, GatewayError>,
    },
    Checked {
        ticket: CallTicket,
        result: Result<OtpCheck, GatewayError>,
    },
}

impl GatewayReply {
    pub fn ticket(&self) -> CallTicket {
        match self {
            GatewayReply::Sent { ticket, .. } | GatewayReply::Checked { ticket, .. } => *ticket,
        }
    }
}

/// Effect of an accepted event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    Updated,
    Dispatch(GatewayCommand),
    Finished(VerificationOutcome),
}

/// Whether a gateway reply changed the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyDisposition {
    Applied,
    Stale,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CallKind {
    Send,
    Resend,
    Verify,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PendingCall {
    ticket: CallTicket,
    kind: CallKind,
}

#[derive(Debug, Clone)]
enum SessionState {
    Select,
    Details {
        descriptor: IdTypeDescriptor,
        id_number: String,
        pending: Option<PendingCall>,
    },
    AwaitingOtp {
        descriptor: IdTypeDescriptor,
        id_number: String,
        request_id: OtpRequestId,
        otp_code: String,
        pending: Option<PendingCall>,
    },
    Verified {
        descriptor: IdTypeDescriptor,
    },
    Skipped,
}

impl SessionState {
    fn step(&self) -> VerificationStep {
        match self {
            SessionState::Select => VerificationStep::Select,
            SessionState::Details { .. } => VerificationStep::Details,
            SessionState::AwaitingOtp { .. } => VerificationStep::AwaitingOtp,
            SessionState::Verified { .. } => VerificationStep::Verified,
            SessionState::Skipped => VerificationStep::Skipped,
        }
    }

    fn pending(&self) -> Option<PendingCall> {
        match self {
            SessionState::Details { pending, .. } | SessionState::AwaitingOtp { pending, .. } => {
                *pending
            }
            _ => None,
        }
    }
}

/// One onboarding verification attempt, from ID selection to a terminal outcome.
///
/// All mutation goes through [`VerificationSession::apply`] for user events and
/// [`VerificationSession::resolve`] for gateway replies. Step-specific data lives inside
/// the step variant, so a verified session can never still carry an OTP draft.
#[derive(Debug, Clone)]
pub struct VerificationSession {
    id: SessionId,
    registry: Arc<IdTypeRegistry>,
    state: SessionState,
    notice: Option<Notice>,
    next_ticket: u64,
    started_at: DateTime<Utc>,
}

impl VerificationSession {
    pub fn new(id: SessionId, registry: Arc<IdTypeRegistry>) -> Self {
        Self {
            id,
            registry,
            state: SessionState::Select,
            notice: None,
            next_ticket: 1,
            started_at: Utc::now(),
        }
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn step(&self) -> VerificationStep {
        self.state.step()
    }

    pub fn is_verifying(&self) -> bool {
        self.state.pending().is_some()
    }

    pub fn is_verified(&self) -> bool {
        matches!(self.state, SessionState::Verified { .. })
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    pub fn selected_id_type(&self) -> Option<&IdTypeDescriptor> {
        match &self.state {
            SessionState::Details { descriptor, .. }
            | SessionState::AwaitingOtp { descriptor, .. }
            | SessionState::Verified { descriptor } => Some(descriptor),
            SessionState::Select | SessionState::Skipped => None,
        }
    }

    pub fn id_number(&self) -> &str {
        match &self.state {
            SessionState::Details { id_number, .. }
            | SessionState::AwaitingOtp { id_number, .. } => id_number,
            _ => "",
        }
    }

    pub fn otp_code(&self) -> &str {
        match &self.state {
            SessionState::AwaitingOtp { otp_code, .. } => otp_code,
            _ => "",
        }
    }

    pub fn otp_request_id(&self) -> Option<&OtpRequestId> {
        match &self.state {
            SessionState::AwaitingOtp { request_id, .. } => Some(request_id),
            _ => None,
        }
    }

    /// Field feedback for the ID number; `None` until something has been typed.
    pub fn id_number_validation(&self) -> Option<ValidationResult> {
        match &self.state {
            SessionState::Details {
                descriptor,
                id_number,
                ..
            } if !id_number.is_empty() => Some(descriptor.validate(id_number)),
            _ => None,
        }
    }

    /// Apply a user event. Rejected events leave the session untouched.
    pub fn apply(&mut self, event: VerificationEvent) -> Result<Transition, FlowRejection> {
        let step = self.step();
        let event_name = event.name();
        let not_allowed = FlowRejection::NotAllowed {
            event: event_name,
            step,
        };

        let transition = match (&mut self.state, event) {
            (SessionState::Select, VerificationEvent::ChooseIdType { id_type }) => {
                let descriptor = *self
                    .registry
                    .get(id_type)
                    .ok_or(FlowRejection::UnsupportedIdType(id_type))?;
                self.state = SessionState::Details {
                    descriptor,
                    id_number: String::new(),
                    pending: None,
                };
                Transition::Updated
            }
            (
                SessionState::Details {
                    descriptor,
                    id_number,
                    pending,
                },
                VerificationEvent::EditIdNumber { value },
            ) => {
                if pending.is_some() {
                    return Err(FlowRejection::Busy);
                }
                *id_number = descriptor.normalize(&value);
                Transition::Updated
            }
            (
                SessionState::Details {
                    descriptor,
                    id_number,
                    pending,
                },
                VerificationEvent::RequestOtp,
            ) => {
                if pending.is_some() {
                    return Err(FlowRejection::Busy);
                }
                if !descriptor.matches(id_number) {
                    return Err(FlowRejection::InvalidIdNumber {
                        message: descriptor.validate(id_number).message,
                    });
                }
                let command = GatewayCommand::SendOtp {
                    ticket: CallTicket(self.next_ticket),
                    id_type: descriptor.id,
                    id_number: id_number.clone(),
                };
                *pending = Some(PendingCall {
                    ticket: command.ticket(),
                    kind: CallKind::Send,
                });
                Transition::Dispatch(command)
            }
            (SessionState::AwaitingOtp { otp_code, .. }, VerificationEvent::EditOtp { value }) => {
                *otp_code = value
                    .chars()
                    .filter(char::is_ascii_digit)
                    .take(OTP_LENGTH)
                    .collect();
                Transition::Updated
            }
            (
                SessionState::AwaitingOtp {
                    descriptor,
                    id_number,
                    pending,
                    ..
                },
                VerificationEvent::ResendOtp,
            ) => {
                if pending.is_some() {
                    return Err(FlowRejection::Busy);
                }
                let command = GatewayCommand::SendOtp {
                    ticket: CallTicket(self.next_ticket),
                    id_type: descriptor.id,
                    id_number: id_number.clone(),
                };
                *pending = Some(PendingCall {
                    ticket: command.ticket(),
                    kind: CallKind::Resend,
                });
                Transition::Dispatch(command)
            }
            (
                SessionState::AwaitingOtp {
                    request_id,
                    otp_code,
                    pending,
                    ..
                },
                VerificationEvent::SubmitOtp,
            ) => {
                if pending.is_some() {
                    return Err(FlowRejection::Busy);
                }
                if otp_code.len() != OTP_LENGTH {
                    return Err(FlowRejection::IncompleteOtp);
                }
                let command = GatewayCommand::VerifyOtp {
                    ticket: CallTicket(self.next_ticket),
                    request_id: request_id.clone(),
                    code: otp_code.clone(),
                };
                *pending = Some(PendingCall {
                    ticket: command.ticket(),
                    kind: CallKind::Verify,
                });
                Transition::Dispatch(command)
            }
            (
                SessionState::Details { .. } | SessionState::AwaitingOtp { .. },
                VerificationEvent::Back,
            ) => {
                self.state = SessionState::Select;
                Transition::Updated
            }
            (
                SessionState::Select | SessionState::Details { .. },
                VerificationEvent::Skip,
            ) => {
                self.state = SessionState::Skipped;
                Transition::Updated
            }
            (SessionState::Skipped, VerificationEvent::ResumeVerification) => {
                self.state = SessionState::Select;
                Transition::Updated
            }
            (SessionState::Skipped, VerificationEvent::ContinueWithoutVerifying) => {
                Transition::Finished(VerificationOutcome { verified: false })
            }
            (SessionState::Verified { .. }, VerificationEvent::Continue) => {
                Transition::Finished(VerificationOutcome { verified: true })
            }
            _ => return Err(not_allowed),
        };

        if let Transition::Dispatch(_) = transition {
            self.next_ticket += 1;
        }
        self.notice = None;
        Ok(transition)
    }

    /// Fold a gateway reply into the session, discarding it if the session has moved on.
    pub fn resolve(&mut self, reply: GatewayReply) -> ReplyDisposition {
        let Some(pending) = self.state.pending() else {
            return ReplyDisposition::Stale;
        };
        if pending.ticket != reply.ticket() {
            return ReplyDisposition::Stale;
        }

        match (pending.kind, reply) {
            (CallKind::Send, GatewayReply::Sent { result, .. }) => match result {
                Ok(dispatch) => {
                    if let SessionState::Details {
                        descriptor,
                        id_number,
                        ..
                    } = &mut self.state
                    {
                        self.state = SessionState::AwaitingOtp {
                            descriptor: *descriptor,
                            id_number: std::mem::take(id_number),
                            request_id: dispatch.request_id,
                            otp_code: String::new(),
                            pending: None,
                        };
                    }
                    self.notice = None;
                }
                Err(error) => self.fail_pending(error),
            },
            (CallKind::Resend, GatewayReply::Sent { result, .. }) => match result {
                Ok(dispatch) => {
                    if let SessionState::AwaitingOtp {
                        request_id,
                        pending,
                        ..
                    } = &mut self.state
                    {
                        *request_id = dispatch.request_id;
                        *pending = None;
                    }
                    self.notice = None;
                }
                Err(error) => self.fail_pending(error),
            },
            (CallKind::Verify, GatewayReply::Checked { result, .. }) => match result {
                Ok(OtpCheck { matched: true }) => {
                    if let Some(descriptor) = self.selected_id_type().copied() {
                        self.state = SessionState::Verified { descriptor };
                    }
                    self.notice = None;
                }
                Ok(OtpCheck { matched: false }) => {
                    self.clear_pending();
                    self.notice = Some(Notice::CodeMismatch);
                }
                Err(error) => self.fail_pending(error),
            },
            _ => return ReplyDisposition::Stale,
        }

        ReplyDisposition::Applied
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let selected = self.selected_id_type();
        SessionSnapshot {
            session_id: self.id.clone(),
            step: self.step(),
            step_label: self.step().label(),
            id_type: selected.map(|descriptor| descriptor.id),
            id_type_title: selected.map(|descriptor| descriptor.title),
            id_number: self.id_number().to_string(),
            id_number_validation: self.id_number_validation(),
            otp_code: self.otp_code().to_string(),
            otp_request_id: self.otp_request_id().cloned(),
            is_verifying: self.is_verifying(),
            is_verified: self.is_verified(),
            notice: self.notice.as_ref().map(|notice| NoticeView {
                notice: notice.clone(),
                message: notice.message(),
            }),
            restricted_features: match self.state {
                SessionState::Skipped => restricted_features().to_vec(),
                _ => Vec::new(),
            },
            started_at: self.started_at,
        }
    }

    fn clear_pending(&mut self) {
        if let SessionState::Details { pending, .. } | SessionState::AwaitingOtp { pending, .. } =
            &mut self.state
        {
            *pending = None;
        }
    }

    fn fail_pending(&mut self, error: GatewayError) {
        self.clear_pending();
        self.notice = Some(Notice::GatewayUnavailable {
            message: error.to_string(),
        });
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NoticeView {
    #[serde(flatten)]
    pub notice: Notice,
    pub message: String,
}

/// Read-only view of a session for the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSnapshot {
    pub session_id: SessionId,
    pub step: VerificationStep,
    pub step_label: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id_type: Option<IdType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id_type_title: Option<&'static str>,
    pub id_number: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id_number_validation: Option<ValidationResult>,
    pub otp_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub otp_request_id: Option<OtpRequestId>,
    pub is_verifying: bool,
    pub is_verified: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<NoticeView>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub restricted_features: Vec<&'static str>,
    pub started_at: DateTime<Utc>,
}
