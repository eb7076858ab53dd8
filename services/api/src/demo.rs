use crate::infra::{build_verification_service, AppVerificationService};
use clap::Args;
use snubo_onboarding::config::VerificationConfig;
use snubo_onboarding::error::AppError;
use snubo_onboarding::validation::{check_password_strength, ValidationField};
use snubo_onboarding::workflows::verification::{
    FlowError, FlowStatus, IdType, SessionId, SessionSnapshot, VerificationEvent,
    VerificationServiceError,
};
use std::time::Duration;

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Simulated OTP gateway latency in milliseconds.
    #[arg(long, default_value_t = 250)]
    pub(crate) latency_ms: u64,
    /// Submit a wrong code once before the correct one.
    #[arg(long)]
    pub(crate) wrong_code_first: bool,
    /// Only run the passport verification scenario.
    #[arg(long)]
    pub(crate) skip_unverified_scenario: bool,
}

#[derive(Args, Debug)]
pub(crate) struct PasswordArgs {
    /// Password to score.
    pub(crate) password: String,
}

#[derive(Args, Debug)]
pub(crate) struct ValidateArgs {
    /// Field to validate: email, email_or_phone, name or password_match.
    pub(crate) field: String,
    /// Value typed into the field.
    pub(crate) value: String,
    /// Confirmation value for password_match.
    #[arg(long, default_value = "")]
    pub(crate) confirm: String,
}

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        latency_ms,
        wrong_code_first,
        skip_unverified_scenario,
    } = args;

    let config = VerificationConfig {
        otp_latency: Duration::from_millis(latency_ms),
        ..VerificationConfig::default()
    };
    let service = build_verification_service(&config);

    println!("Identity verification demo");
    println!("Accepted ID types:");
    for view in service.id_types() {
        println!(
            "  - {} ({}, up to {} characters)",
            view.title, view.description, view.max_length
        );
    }

    println!("\nScenario 1: verify with a passport");
    run_verified_scenario(&service, &config.demo_otp_code, wrong_code_first).await?;

    if skip_unverified_scenario {
        return Ok(());
    }

    println!("\nScenario 2: skip verification after choosing a voter ID");
    run_unverified_scenario(&service).await?;
    Ok(())
}

async fn run_verified_scenario(
    service: &AppVerificationService,
    accepted_code: &str,
    wrong_code_first: bool,
) -> Result<(), AppError> {
    let session_id = service.start().session_id;
    println!("- Started session {session_id}");

    step(
        service,
        &session_id,
        VerificationEvent::ChooseIdType {
            id_type: IdType::Aadhar,
        },
    )
    .await?;
    step(
        service,
        &session_id,
        VerificationEvent::EditIdNumber {
            value: "1234".to_string(),
        },
    )
    .await?;
    match service
        .dispatch(&session_id, VerificationEvent::RequestOtp)
        .await
    {
        Err(VerificationServiceError::Flow(FlowError::Rejected(rejection))) => {
            println!("  Send code refused: {rejection}");
        }
        other => {
            other?;
        }
    }
    step(service, &session_id, VerificationEvent::Back).await?;

    step(
        service,
        &session_id,
        VerificationEvent::ChooseIdType {
            id_type: IdType::Passport,
        },
    )
    .await?;
    step(
        service,
        &session_id,
        VerificationEvent::EditIdNumber {
            value: "a1234567".to_string(),
        },
    )
    .await?;
    step(service, &session_id, VerificationEvent::RequestOtp).await?;
    let snapshot = service.settled(&session_id).await?;
    describe(&snapshot);

    if wrong_code_first {
        submit_code(service, &session_id, "000000").await?;
    }
    submit_code(service, &session_id, accepted_code).await?;

    step(service, &session_id, VerificationEvent::Continue).await?;
    Ok(())
}

async fn run_unverified_scenario(service: &AppVerificationService) -> Result<(), AppError> {
    let session_id = service.start().session_id;
    println!("- Started session {session_id}");

    step(
        service,
        &session_id,
        VerificationEvent::ChooseIdType {
            id_type: IdType::VoterId,
        },
    )
    .await?;
    step(service, &session_id, VerificationEvent::Skip).await?;
    step(
        service,
        &session_id,
        VerificationEvent::ContinueWithoutVerifying,
    )
    .await?;
    Ok(())
}

async fn submit_code(
    service: &AppVerificationService,
    session_id: &SessionId,
    code: &str,
) -> Result<(), AppError> {
    step(
        service,
        session_id,
        VerificationEvent::EditOtp {
            value: code.to_string(),
        },
    )
    .await?;
    step(service, session_id, VerificationEvent::SubmitOtp).await?;
    let snapshot = service.settled(session_id).await?;
    describe(&snapshot);
    Ok(())
}

async fn step(
    service: &AppVerificationService,
    session_id: &SessionId,
    event: VerificationEvent,
) -> Result<(), AppError> {
    println!("  > {}", event.name());
    match service.dispatch(session_id, event).await? {
        FlowStatus::Active { snapshot } => describe(&snapshot),
        FlowStatus::Finished { outcome } => {
            println!(
                "    Finished: {}",
                if outcome.verified {
                    "identity verified"
                } else {
                    "continuing without verification"
                }
            );
        }
    }
    Ok(())
}

fn describe(snapshot: &SessionSnapshot) {
    let mut line = format!("    [{}]", snapshot.step_label);
    if let Some(title) = snapshot.id_type_title {
        line.push_str(&format!(" {title}"));
    }
    if !snapshot.id_number.is_empty() {
        line.push_str(&format!(" number={}", snapshot.id_number));
    }
    if let Some(validation) = &snapshot.id_number_validation {
        line.push_str(&format!(" ({})", validation.message));
    }
    if !snapshot.otp_code.is_empty() {
        line.push_str(&format!(" code={}", "*".repeat(snapshot.otp_code.len())));
    }
    if snapshot.is_verifying {
        line.push_str(" waiting for gateway");
    }
    println!("{line}");

    if let Some(notice) = &snapshot.notice {
        println!("    ! {}", notice.message);
    }
    if !snapshot.restricted_features.is_empty() {
        println!("    Unverified accounts cannot:");
        for feature in &snapshot.restricted_features {
            println!("      - {feature}");
        }
    }
}

pub(crate) fn run_password(args: PasswordArgs) -> Result<(), AppError> {
    let strength = check_password_strength(&args.password);
    let meter: String = (0..4)
        .map(|bar| if bar < strength.filled_bars() { '#' } else { '-' })
        .collect();

    println!(
        "[{meter}] {} (score {}/4)",
        strength.label_text(),
        strength.score
    );
    for suggestion in &strength.suggestions {
        println!("  - {suggestion}");
    }
    Ok(())
}

pub(crate) fn run_validate(args: ValidateArgs) -> Result<(), AppError> {
    let Some(field) = ValidationField::from_key(&args.field) else {
        println!(
            "Unknown field '{}'; expected email, email_or_phone, name or password_match",
            args.field
        );
        return Ok(());
    };

    let result = field.validate(&args.value, &args.confirm);
    let marker = if result.is_valid { "ok" } else { "invalid" };
    println!("{marker}: {}", result.message);
    Ok(())
}
