//! Field validators shared by the onboarding forms.
//!
//! Every validator is a pure, total function: it never fails and always hands back a
//! fresh [`ValidationResult`] carrying the message the form should display.

mod password;

pub use password::{check_password_strength, PasswordStrength, StrengthLabel, StrengthTone};

use serde::{Deserialize, Serialize};

/// Outcome of validating a single text input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub message: String,
}

impl ValidationResult {
    pub fn valid(message: impl Into<String>) -> Self {
        Self {
            is_valid: true,
            message: message.into(),
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self {
            is_valid: false,
            message: message.into(),
        }
    }
}

/// Form fields with a dedicated validator, addressable by their snake_case key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationField {
    Email,
    EmailOrPhone,
    Name,
    PasswordMatch,
}

impl ValidationField {
    pub fn from_key(key: &str) -> Option<Self> {
        match key.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "email" => Some(Self::Email),
            "email_or_phone" => Some(Self::EmailOrPhone),
            "name" => Some(Self::Name),
            "password_match" => Some(Self::PasswordMatch),
            _ => None,
        }
    }

    /// Run the field's validator; `confirm` is only read for [`ValidationField::PasswordMatch`].
    pub fn validate(self, value: &str, confirm: &str) -> ValidationResult {
        match self {
            Self::Email => validate_email(value),
            Self::EmailOrPhone => validate_email_or_phone(value),
            Self::Name => validate_name(value),
            Self::PasswordMatch => validate_password_match(value, confirm),
        }
    }
}

const PHONE_SEPARATORS: [char; 3] = ['-', '(', ')'];
const PHONE_MAX_TRAILING_DIGITS: usize = 15;

pub fn validate_email(email: &str) -> ValidationResult {
    if email.is_empty() {
        return ValidationResult::invalid("Email is required");
    }

    if !looks_like_email(email) {
        return ValidationResult::invalid("Please enter a valid email address");
    }

    ValidationResult::valid("Valid email address")
}

pub fn validate_email_or_phone(input: &str) -> ValidationResult {
    if input.trim().is_empty() {
        return ValidationResult::invalid("Email or phone number is required");
    }

    if looks_like_email(input) {
        return ValidationResult::valid("Valid email address");
    }

    let cleaned: String = input
        .chars()
        .filter(|ch| !ch.is_whitespace() && !PHONE_SEPARATORS.contains(ch))
        .collect();
    if looks_like_phone(&cleaned) {
        return ValidationResult::valid("Valid phone number");
    }

    ValidationResult::invalid("Please enter a valid email address or phone number")
}

pub fn validate_name(name: &str) -> ValidationResult {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return ValidationResult::invalid("Name is required");
    }

    if trimmed.chars().count() < 2 {
        return ValidationResult::invalid("Name must be at least 2 characters");
    }

    if !trimmed
        .chars()
        .all(|ch| ch.is_ascii_alphabetic() || ch.is_whitespace())
    {
        return ValidationResult::invalid("Name can only contain letters and spaces");
    }

    ValidationResult::valid("Valid name")
}

pub fn validate_password_match(password: &str, confirm: &str) -> ValidationResult {
    if confirm.is_empty() {
        return ValidationResult::invalid("Please confirm your password");
    }

    if password != confirm {
        return ValidationResult::invalid("Passwords do not match");
    }

    ValidationResult::valid("Passwords match")
}

/// `local@domain.tld`: one `@`, no whitespace, and a dot inside the domain with text on both sides.
fn looks_like_email(input: &str) -> bool {
    if input.chars().any(char::is_whitespace) {
        return false;
    }

    let Some((local, domain)) = input.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }

    domain
        .char_indices()
        .any(|(index, ch)| ch == '.' && index > 0 && index + 1 < domain.len())
}

/// Optional `+`, a non-zero leading digit, then up to fifteen more digits.
fn looks_like_phone(cleaned: &str) -> bool {
    let digits = cleaned.strip_prefix('+').unwrap_or(cleaned);
    let mut chars = digits.chars();

    match chars.next() {
        Some(first) if ('1'..='9').contains(&first) => {}
        _ => return false,
    }

    let rest = chars.as_str();
    rest.len() <= PHONE_MAX_TRAILING_DIGITS && rest.chars().all(|ch| ch.is_ascii_digit())
}
