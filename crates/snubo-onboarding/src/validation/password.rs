use serde::{Deserialize, Serialize};

const MIN_PASSWORD_LENGTH: usize = 8;
const MAX_SCORE: u8 = 4;
const MAX_SUGGESTIONS: usize = 3;
const SPECIAL_CHARACTERS: &str = "!@#$%^&*()_+-=[]{};':\"\\|,.<>/?";

/// Strength bucket shown next to the password field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrengthLabel {
    VeryWeak,
    Weak,
    Good,
    Strong,
}

impl StrengthLabel {
    pub const fn from_score(score: u8) -> Self {
        match score {
            0 | 1 => Self::VeryWeak,
            2 => Self::Weak,
            3 => Self::Good,
            _ => Self::Strong,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::VeryWeak => "Very Weak",
            Self::Weak => "Weak",
            Self::Good => "Good",
            Self::Strong => "Strong",
        }
    }

    pub const fn tone(self) -> StrengthTone {
        match self {
            Self::VeryWeak => StrengthTone::Danger,
            Self::Weak => StrengthTone::Warning,
            Self::Good => StrengthTone::Caution,
            Self::Strong => StrengthTone::Success,
        }
    }
}

/// Colour family the presentation layer uses for the label and meter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrengthTone {
    Danger,
    Warning,
    Caution,
    Success,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PasswordStrength {
    pub score: u8,
    pub label: StrengthLabel,
    pub tone: StrengthTone,
    pub suggestions: Vec<String>,
}

impl PasswordStrength {
    pub fn label_text(&self) -> &'static str {
        self.label.label()
    }

    /// Number of the four meter segments that should be lit.
    pub fn filled_bars(&self) -> u8 {
        self.score.min(MAX_SCORE)
    }
}

/// One additive rule: awards `half_points` when met, otherwise contributes its suggestion.
struct StrengthCheck {
    half_points: u8,
    suggestion: &'static str,
    passes: fn(&str) -> bool,
}

// Evaluation order fixes the order suggestions are reported in.
const CHECKS: [StrengthCheck; 5] = [
    StrengthCheck {
        half_points: 2,
        suggestion: "Use at least 8 characters",
        passes: long_enough,
    },
    StrengthCheck {
        half_points: 1,
        suggestion: "Add lowercase letters",
        passes: has_lowercase,
    },
    StrengthCheck {
        half_points: 1,
        suggestion: "Add uppercase letters",
        passes: has_uppercase,
    },
    StrengthCheck {
        half_points: 2,
        suggestion: "Add numbers",
        passes: has_digit,
    },
    StrengthCheck {
        half_points: 2,
        suggestion: "Add special characters (!@#$%^&*)",
        passes: has_special,
    },
];

fn long_enough(password: &str) -> bool {
    password.chars().count() >= MIN_PASSWORD_LENGTH
}

fn has_lowercase(password: &str) -> bool {
    password.chars().any(|ch| ch.is_ascii_lowercase())
}

fn has_uppercase(password: &str) -> bool {
    password.chars().any(|ch| ch.is_ascii_uppercase())
}

fn has_digit(password: &str) -> bool {
    password.chars().any(|ch| ch.is_ascii_digit())
}

fn has_special(password: &str) -> bool {
    password.chars().any(|ch| SPECIAL_CHARACTERS.contains(ch))
}

/// Score a password from 0 to 4 and collect up to three improvement hints.
pub fn check_password_strength(password: &str) -> PasswordStrength {
    let mut half_points: u8 = 0;
    let mut suggestions = Vec::new();

    for check in &CHECKS {
        if (check.passes)(password) {
            half_points += check.half_points;
        } else {
            suggestions.push(check.suggestion.to_string());
        }
    }

    // Halves round up, matching round-half-up on the fractional sum.
    let score = ((half_points + 1) / 2).min(MAX_SCORE);
    suggestions.truncate(MAX_SUGGESTIONS);

    let label = StrengthLabel::from_score(score);
    PasswordStrength {
        score,
        label,
        tone: label.tone(),
        suggestions,
    }
}
