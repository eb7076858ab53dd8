use serde::{Deserialize, Serialize};

use super::registry::IdType;

/// Identifier wrapper for live verification sessions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Screen of the verification flow currently shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStep {
    Select,
    Details,
    AwaitingOtp,
    Verified,
    Skipped,
}

impl VerificationStep {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Select => "Choose ID Type",
            Self::Details => "Enter ID Number",
            Self::AwaitingOtp => "Enter Verification Code",
            Self::Verified => "Verification Complete",
            Self::Skipped => "Skip Verification",
        }
    }
}

/// User intents raised by the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum VerificationEvent {
    ChooseIdType { id_type: IdType },
    EditIdNumber { value: String },
    RequestOtp,
    EditOtp { value: String },
    ResendOtp,
    SubmitOtp,
    Back,
    Skip,
    ResumeVerification,
    ContinueWithoutVerifying,
    Continue,
}

impl VerificationEvent {
    pub const fn name(&self) -> &'static str {
        match self {
            Self::ChooseIdType { .. } => "choose_id_type",
            Self::EditIdNumber { .. } => "edit_id_number",
            Self::RequestOtp => "request_otp",
            Self::EditOtp { .. } => "edit_otp",
            Self::ResendOtp => "resend_otp",
            Self::SubmitOtp => "submit_otp",
            Self::Back => "back",
            Self::Skip => "skip",
            Self::ResumeVerification => "resume_verification",
            Self::ContinueWithoutVerifying => "continue_without_verifying",
            Self::Continue => "continue",
        }
    }
}

/// Final result handed back once the session ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationOutcome {
    pub verified: bool,
}

/// Recoverable problem surfaced alongside the current step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Notice {
    GatewayUnavailable { message: String },
    CodeMismatch,
}

impl Notice {
    pub fn message(&self) -> String {
        match self {
            Notice::GatewayUnavailable { message } => {
                format!("We couldn't reach the verification service ({message}). Please try again.")
            }
            Notice::CodeMismatch => "Invalid verification code. Please try again.".to_string(),
        }
    }
}

/// Guard failures: the event was refused and the session is unchanged.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FlowRejection {
    #[error("id type {0:?} is not offered in this market")]
    UnsupportedIdType(IdType),
    #[error("{message}")]
    InvalidIdNumber { message: String },
    #[error("verification code must be 6 digits")]
    IncompleteOtp,
    #[error("a verification request is already in progress")]
    Busy,
    #[error("{event} is not available while on step {step:?}")]
    NotAllowed {
        event: &'static str,
        step: VerificationStep,
    },
}

/// Features withheld from accounts that continue without verifying.
pub const fn restricted_features() -> [&'static str; 5] {
    [
        "Send messages to other users",
        "Comment on posts",
        "Create group chats",
        "Access premium features",
        "Report inappropriate content",
    ]
}
