use serde::{Deserialize, Serialize};

use crate::validation::ValidationResult;

/// Government ID documents accepted for identity verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdType {
    Aadhar,
    DrivingLicense,
    VoterId,
    Passport,
}

impl IdType {
    pub const fn ordered() -> [Self; 4] {
        [
            Self::Aadhar,
            Self::DrivingLicense,
            Self::VoterId,
            Self::Passport,
        ]
    }

    pub const fn key(self) -> &'static str {
        match self {
            Self::Aadhar => "aadhar",
            Self::DrivingLicense => "driving_license",
            Self::VoterId => "voter_id",
            Self::Passport => "passport",
        }
    }

    pub fn from_key(value: &str) -> Option<Self> {
        let normalized = value.trim().to_ascii_lowercase();
        Self::ordered()
            .into_iter()
            .find(|id_type| id_type.key() == normalized)
    }
}

/// How raw keystrokes are cleaned before they are stored and matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputNormalization {
    DigitsOnly,
    Uppercase,
}

impl InputNormalization {
    fn apply(self, raw: &str) -> String {
        match self {
            Self::DigitsOnly => raw.chars().filter(char::is_ascii_digit).collect(),
            Self::Uppercase => raw.to_uppercase(),
        }
    }
}

/// Static description of one ID type together with its structural number check.
#[derive(Clone, Copy)]
pub struct IdTypeDescriptor {
    pub id: IdType,
    pub title: &'static str,
    pub description: &'static str,
    pub placeholder: &'static str,
    pub max_length: usize,
    pub normalization: InputNormalization,
    pub pattern: fn(&str) -> bool,
}

impl IdTypeDescriptor {
    /// Clean a raw input and cut it to the field's maximum length.
    pub fn normalize(&self, raw: &str) -> String {
        self.normalization
            .apply(raw)
            .chars()
            .take(self.max_length)
            .collect()
    }

    pub fn matches(&self, id_number: &str) -> bool {
        !id_number.is_empty() && (self.pattern)(id_number)
    }

    pub fn validate(&self, id_number: &str) -> ValidationResult {
        let subject = self.title.to_lowercase();
        if self.matches(id_number) {
            ValidationResult::valid(format!("Valid {subject} number"))
        } else {
            ValidationResult::invalid(format!("Please enter a valid {subject} number"))
        }
    }

    pub fn view(&self) -> IdTypeView {
        IdTypeView {
            id: self.id,
            title: self.title,
            description: self.description,
            placeholder: self.placeholder,
            max_length: self.max_length,
        }
    }
}

impl std::fmt::Debug for IdTypeDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdTypeDescriptor")
            .field("id", &self.id)
            .field("title", &self.title)
            .field("max_length", &self.max_length)
            .field("normalization", &self.normalization)
            .finish_non_exhaustive()
    }
}

/// Serializable descriptor for clients rendering the ID picker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IdTypeView {
    pub id: IdType,
    pub title: &'static str,
    pub description: &'static str,
    pub placeholder: &'static str,
    pub max_length: usize,
}

/// Lookup table of the ID types offered in a market.
#[derive(Debug, Clone)]
pub struct IdTypeRegistry {
    descriptors: Vec<IdTypeDescriptor>,
}

impl IdTypeRegistry {
    pub fn new(descriptors: Vec<IdTypeDescriptor>) -> Self {
        let mut registry = Self {
            descriptors: Vec::with_capacity(descriptors.len()),
        };
        for descriptor in descriptors {
            registry.insert(descriptor);
        }
        registry
    }

    /// The four Indian documents accepted at launch.
    ///
    /// The number rules are structural approximations; markets that need stricter
    /// formats should swap descriptors in with [`IdTypeRegistry::with_descriptor`].
    pub fn standard() -> Self {
        Self::new(standard_descriptors())
    }

    pub fn restricted_to(&self, enabled: &[IdType]) -> Self {
        Self {
            descriptors: self
                .descriptors
                .iter()
                .filter(|descriptor| enabled.contains(&descriptor.id))
                .copied()
                .collect(),
        }
    }

    /// Replace (or add) the descriptor for `descriptor.id`.
    pub fn with_descriptor(mut self, descriptor: IdTypeDescriptor) -> Self {
        self.insert(descriptor);
        self
    }

    pub fn get(&self, id: IdType) -> Option<&IdTypeDescriptor> {
        self.descriptors
            .iter()
            .find(|descriptor| descriptor.id == id)
    }

    pub fn descriptors(&self) -> &[IdTypeDescriptor] {
        &self.descriptors
    }

    pub fn views(&self) -> Vec<IdTypeView> {
        self.descriptors.iter().map(IdTypeDescriptor::view).collect()
    }

    fn insert(&mut self, descriptor: IdTypeDescriptor) {
        match self
            .descriptors
            .iter_mut()
            .find(|existing| existing.id == descriptor.id)
        {
            Some(existing) => *existing = descriptor,
            None => self.descriptors.push(descriptor),
        }
    }
}

impl Default for IdTypeRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

fn standard_descriptors() -> Vec<IdTypeDescriptor> {
    vec![
        IdTypeDescriptor {
            id: IdType::Aadhar,
            title: "Aadhar Card",
            description: "12-digit unique identity number",
            placeholder: "Enter your 12-digit Aadhar number",
            max_length: 12,
            normalization: InputNormalization::DigitsOnly,
            pattern: is_aadhar_number,
        },
        IdTypeDescriptor {
            id: IdType::DrivingLicense,
            title: "Driving License",
            description: "Valid Indian driving license",
            placeholder: "Enter your driving license number",
            max_length: 20,
            normalization: InputNormalization::Uppercase,
            pattern: is_driving_license_number,
        },
        IdTypeDescriptor {
            id: IdType::VoterId,
            title: "Voter ID",
            description: "Election Commission issued ID",
            placeholder: "Enter your Voter ID number",
            max_length: 10,
            normalization: InputNormalization::Uppercase,
            pattern: is_voter_id_number,
        },
        IdTypeDescriptor {
            id: IdType::Passport,
            title: "Passport",
            description: "Indian passport",
            placeholder: "Enter your passport number",
            max_length: 8,
            normalization: InputNormalization::Uppercase,
            pattern: is_passport_number,
        },
    ]
}

/// `letters` ASCII capitals followed by exactly `digits` ASCII digits.
fn letters_then_digits(value: &str, letters: usize, digits: usize) -> bool {
    let bytes = value.as_bytes();
    bytes.len() == letters + digits
        && bytes[..letters].iter().all(u8::is_ascii_uppercase)
        && bytes[letters..].iter().all(u8::is_ascii_digit)
}

fn is_aadhar_number(value: &str) -> bool {
    letters_then_digits(value, 0, 12)
}

/// State code, RTO code, issue year and serial (`MH1220110012345`) or the `MH-` + 13 digit form.
fn is_driving_license_number(value: &str) -> bool {
    if letters_then_digits(value, 2, 13) {
        return true;
    }

    match value.split_once('-') {
        Some((state, serial)) => {
            letters_then_digits(state, 2, 0) && letters_then_digits(serial, 0, 13)
        }
        None => false,
    }
}

fn is_voter_id_number(value: &str) -> bool {
    letters_then_digits(value, 3, 7)
}

fn is_passport_number(value: &str) -> bool {
    letters_then_digits(value, 1, 7)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(id: IdType) -> IdTypeDescriptor {
        *IdTypeRegistry::standard()
            .get(id)
            .expect("standard registry covers every id type")
    }

    #[test]
    fn standard_registry_lists_all_types_in_order() {
        let registry = IdTypeRegistry::standard();
        let ids: Vec<IdType> = registry.descriptors().iter().map(|d| d.id).collect();
        assert_eq!(ids, IdType::ordered().to_vec());
        assert_eq!(registry.views()[0].title, "Aadhar Card");
    }

    #[test]
    fn aadhar_strips_non_digits_and_truncates() {
        let aadhar = descriptor(IdType::Aadhar);
        assert_eq!(aadhar.normalize("1234 5678 9012 34"), "123456789012");
        assert_eq!(aadhar.normalize("abc"), "");
        assert!(aadhar.matches("123456789012"));
        assert!(!aadhar.matches("12345678901"));
    }

    #[test]
    fn uppercase_types_upper_case_and_truncate() {
        let passport = descriptor(IdType::Passport);
        assert_eq!(passport.normalize("a1234567890"), "A1234567");
        assert!(passport.matches("A1234567"));
        assert!(!passport.matches("AB123456"));

        let voter = descriptor(IdType::VoterId);
        assert_eq!(voter.normalize("abc1234567xyz"), "ABC1234567");
        assert!(voter.matches("ABC1234567"));
        assert!(!voter.matches("AB12345678"));
    }

    #[test]
    fn driving_license_accepts_both_layouts() {
        let license = descriptor(IdType::DrivingLicense);
        assert!(license.matches("MH1220110012345"));
        assert!(license.matches("MH-1220110012345"));
        assert!(!license.matches("MH-122011001234"));
        assert!(!license.matches("M1-1220110012345"));
        assert!(!license.matches("MH12201100123456"));
        assert_eq!(
            license.normalize("mh-1220110012345-extra"),
            "MH-1220110012345-EXT"
        );
    }

    #[test]
    fn validate_reports_title_in_message() {
        let aadhar = descriptor(IdType::Aadhar);
        let invalid = aadhar.validate("123");
        assert!(!invalid.is_valid);
        assert_eq!(invalid.message, "Please enter a valid aadhar card number");
        assert!(aadhar.validate("123456789012").is_valid);
    }

    #[test]
    fn registry_can_be_restricted_and_overridden() {
        let registry = IdTypeRegistry::standard().restricted_to(&[IdType::Passport]);
        assert!(registry.get(IdType::Aadhar).is_none());
        assert!(registry.get(IdType::Passport).is_some());

        fn nine_digits(value: &str) -> bool {
            value.len() == 9 && value.bytes().all(|b| b.is_ascii_digit())
        }
        let custom = IdTypeDescriptor {
            max_length: 9,
            normalization: InputNormalization::DigitsOnly,
            pattern: nine_digits,
            ..descriptor(IdType::Passport)
        };
        let registry = registry.with_descriptor(custom);
        let passport = registry.get(IdType::Passport).expect("passport present");
        assert_eq!(registry.descriptors().len(), 1);
        assert!(passport.matches("123456789"));
        assert!(!passport.matches("A1234567"));
    }

    #[test]
    fn id_type_keys_round_trip() {
        for id_type in IdType::ordered() {
            assert_eq!(IdType::from_key(id_type.key()), Some(id_type));
        }
        assert_eq!(IdType::from_key(" Passport "), Some(IdType::Passport));
        assert_eq!(IdType::from_key("pan_card"), None);
    }
}
