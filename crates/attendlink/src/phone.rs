//! Guardian phone number validation.
//!
//! Numbers are typed by staff in whatever format they like (`0100 111 2222`,
//! `(010) 0111-2222`, ...). Validation strips formatting, checks the national
//! mobile format and rewrites the number into the international form the
//! message channel expects.

use std::fmt;

use serde::Serialize;

use crate::config::PhoneConfig;
use crate::error::ValidationError;

/// A guardian number in international form, digits only (`201012345678`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct NormalizedPhone(String);

impl NormalizedPhone {
    /// The digits of the number.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NormalizedPhone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Validates guardian numbers against one national mobile scheme.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhoneValidator {
    national_length: usize,
    mobile_prefix: String,
    country_code: String,
}

impl Default for PhoneValidator {
    fn default() -> Self {
        Self::new(&PhoneConfig::default())
    }
}

impl PhoneValidator {
    /// Create a validator from configured rules.
    #[must_use]
    pub fn new(config: &PhoneConfig) -> Self {
        Self {
            national_length: config.national_length,
            mobile_prefix: config.mobile_prefix.clone(),
            country_code: config.country_code.clone(),
        }
    }

    /// Validate a raw guardian number.
    ///
    /// Checks run in a fixed order so the first failing rule decides the
    /// reported kind: missing, length, prefix, repeated digits.
    ///
    /// # Errors
    ///
    /// Returns the [`ValidationError`] kind of the first failing rule.
    pub fn validate(&self, raw: Option<&str>) -> Result<NormalizedPhone, ValidationError> {
        let digits: String = raw
            .unwrap_or_default()
            .chars()
            .filter(char::is_ascii_digit)
            .collect();

        if digits.is_empty() {
            return Err(ValidationError::MissingPhone);
        }

        if digits.len() != self.national_length {
            return Err(ValidationError::InvalidLength {
                actual: digits.len(),
                expected: self.national_length,
            });
        }

        if !digits.starts_with(&self.mobile_prefix) {
            return Err(ValidationError::InvalidPrefix {
                expected: self.mobile_prefix.clone(),
            });
        }

        // Trunk zero removed; what is left is the subscriber part
        let subscriber = &digits[1..];
        if is_single_digit_run(subscriber) {
            return Err(ValidationError::SuspiciousPattern);
        }

        Ok(NormalizedPhone(format!("{}{subscriber}", self.country_code)))
    }
}

fn is_single_digit_run(digits: &str) -> bool {
    let mut bytes = digits.bytes();
    match bytes.next() {
        Some(first) => bytes.all(|b| b == first),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validate(raw: &str) -> Result<NormalizedPhone, ValidationError> {
        PhoneValidator::default().validate(Some(raw))
    }

    #[test]
    fn test_valid_number_is_normalized() {
        let phone = validate("01012345678").unwrap();
        assert_eq!(phone.as_str(), "201012345678");
        assert_eq!(phone.as_str().len(), 12);
    }

    #[test]
    fn test_formatting_is_stripped() {
        assert_eq!(validate("0100 111 2222").unwrap().as_str(), "201001112222");
        assert_eq!(validate("(010) 0111-2222").unwrap().as_str(), "201001112222");
        assert_eq!(validate("+0100.111.2222 ").unwrap().as_str(), "201001112222");
    }

    #[test]
    fn test_missing_phone() {
        let validator = PhoneValidator::default();
        assert_eq!(validator.validate(None), Err(ValidationError::MissingPhone));
        assert_eq!(validator.validate(Some("")), Err(ValidationError::MissingPhone));
        assert_eq!(validator.validate(Some("n/a")), Err(ValidationError::MissingPhone));
    }

    #[test]
    fn test_invalid_length() {
        assert_eq!(
            validate("0123456789"),
            Err(ValidationError::InvalidLength {
                actual: 10,
                expected: 11
            })
        );
        assert!(matches!(
            validate("010123456789"),
            Err(ValidationError::InvalidLength { actual: 12, .. })
        ));
    }

    #[test]
    fn test_invalid_prefix() {
        assert_eq!(
            validate("0223456789x1"),
            Err(ValidationError::InvalidPrefix {
                expected: "01".to_string()
            })
        );
        assert!(matches!(
            validate("11012345678"),
            Err(ValidationError::InvalidPrefix { .. })
        ));
    }

    #[test]
    fn test_suspicious_pattern() {
        assert_eq!(validate("01111111111"), Err(ValidationError::SuspiciousPattern));
        // Identical digits fail the prefix rule first
        assert!(matches!(
            validate("00000000000"),
            Err(ValidationError::InvalidPrefix { .. })
        ));
    }

    #[test]
    fn test_custom_rules() {
        let validator = PhoneValidator::new(&PhoneConfig {
            national_length: 10,
            mobile_prefix: "05".to_string(),
            country_code: "966".to_string(),
        });

        assert_eq!(
            validator.validate(Some("0512345678")).unwrap().as_str(),
            "966512345678"
        );
        assert!(validator.validate(Some("01012345678")).is_err());
    }

    #[test]
    fn test_single_digit_run() {
        assert!(is_single_digit_run("1111"));
        assert!(!is_single_digit_run("1112"));
        assert!(!is_single_digit_run(""));
    }

    #[test]
    fn test_normalized_phone_display() {
        let phone = validate("01012345678").unwrap();
        assert_eq!(phone.to_string(), "201012345678");
        assert_eq!(serde_json::to_string(&phone).unwrap(), "\"201012345678\"");
    }
}
