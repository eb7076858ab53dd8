//! Identity verification flow for onboarding.
//!
//! A session walks the user from choosing an ID document, through entering its number and
//! confirming a one-time code, to either a verified account or an explicit decision to
//! continue with restricted features. Each session is driven by its own task so events
//! are applied strictly in arrival order, and gateway replies that arrive after the user
//! has moved on are discarded.

pub mod domain;
pub mod flow;
pub mod gateway;
pub mod registry;
pub mod router;
pub mod service;
pub mod session;

#[cfg(test)]
mod tests;

pub use domain::{
    restricted_features, FlowRejection, Notice, SessionId, VerificationEvent,
    VerificationOutcome, VerificationStep,
};
pub use flow::{spawn_flow, FlowError, FlowHandle, FlowStatus, DEFAULT_EVENT_BUFFER};
pub use gateway::{
    GatewayError, OtpCheck, OtpDispatch, OtpGateway, OtpRequestId, SimulatedOtpGateway,
};
pub use registry::{
    IdType, IdTypeDescriptor, IdTypeRegistry, IdTypeView, InputNormalization,
};
pub use router::verification_router;
pub use service::{VerificationService, VerificationServiceError, DEFAULT_IDLE_TIMEOUT};
pub use session::{
    CallTicket, GatewayCommand, GatewayReply, NoticeView, ReplyDisposition, SessionSnapshot,
    Transition, VerificationSession, OTP_LENGTH,
};
