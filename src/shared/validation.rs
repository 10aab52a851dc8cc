use regex::Regex;
use std::sync::LazyLock;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    Required(String),
    TooShort { field: String, min: usize, actual: usize },
    InvalidFormat { field: String, expected: String },
    InvalidEmail { field: String },
    InvalidMobile { field: String },
    InvalidValue { field: String, message: String },
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Required(field) => write!(f, "Field '{}' is required", field),
            Self::TooShort { field, min, actual } => {
                write!(f, "Field '{}' is too short: {} < {} chars", field, actual, min)
            }
            Self::InvalidFormat { field, expected } => {
                write!(f, "Field '{}' has invalid format, expected: {}", field, expected)
            }
            Self::InvalidEmail { field } => {
                write!(f, "Field '{}' must be a valid email address", field)
            }
            Self::InvalidMobile { field } => {
                write!(f, "Field '{}' must be a valid Indian mobile number", field)
            }
            Self::InvalidValue { field, message } => {
                write!(f, "Field '{}' has invalid value: {}", field, message)
            }
        }
    }
}

impl std::error::Error for ValidationError {}

impl ValidationError {
    pub fn field(&self) -> &str {
        match self {
            Self::Required(field)
            | Self::TooShort { field, .. }
            | Self::InvalidFormat { field, .. }
            | Self::InvalidEmail { field }
            | Self::InvalidMobile { field }
            | Self::InvalidValue { field, .. } => field,
        }
    }
}

#[derive(Debug, Default)]
pub struct ValidationResult {
    errors: Vec<ValidationError>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self { errors: Vec::new() }
    }

    pub fn add_error(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn into_result(self) -> Result<(), Vec<ValidationError>> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self.errors)
        }
    }
}

static EMAIL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$"
    ).expect("Invalid email regex")
});

static INDIAN_MOBILE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\+91)?[6-9]\d{9}$").expect("Invalid mobile regex"));

pub fn is_valid_email(value: &str) -> bool {
    EMAIL_REGEX.is_match(value)
}

/// Strips formatting from a phone number, keeping digits and a leading `+`.
pub fn normalize_mobile(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for (i, c) in value.trim().chars().enumerate() {
        if c.is_ascii_digit() || (c == '+' && i == 0) {
            out.push(c);
        }
    }
    out
}

pub fn is_valid_indian_mobile(value: &str) -> bool {
    INDIAN_MOBILE_REGEX.is_match(&normalize_mobile(value))
}

pub fn validate_required(value: &str, field_name: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(ValidationError::Required(field_name.to_string()))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_ten_digit_mobiles() {
        assert!(is_valid_indian_mobile("9876543210"));
        assert!(is_valid_indian_mobile("6000000001"));
        assert!(is_valid_indian_mobile("+919876543210"));
    }

    #[test]
    fn strips_formatting_before_matching() {
        assert!(is_valid_indian_mobile("98765 43210"));
        assert!(is_valid_indian_mobile("98765-43210"));
        assert!(is_valid_indian_mobile("+91 (98765) 43210"));
        assert_eq!(normalize_mobile("+91 98765-43210"), "+919876543210");
    }

    #[test]
    fn rejects_bad_mobiles() {
        assert!(!is_valid_indian_mobile("12345"));
        assert!(!is_valid_indian_mobile("1234567890"));
        assert!(!is_valid_indian_mobile("98765432100"));
        assert!(!is_valid_indian_mobile(""));
        assert!(!is_valid_indian_mobile("+9298765432"));
    }

    #[test]
    fn email_validation() {
        assert!(is_valid_email("asha@example.com"));
        assert!(is_valid_email("a.b+c@sub.example.co.in"));
        assert!(!is_valid_email("not-an-email"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("user@"));
    }

    #[test]
    fn required_fields() {
        assert!(validate_required("Asha", "name").is_ok());
        assert!(validate_required("   ", "name").is_err());
        assert_eq!(
            validate_required("", "name").unwrap_err().field(),
            "name"
        );
    }
}
