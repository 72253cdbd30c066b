//! Password policy and validation

use serde::Serialize;

/// Minimum accepted length, in characters
pub const MIN_LENGTH: usize = 8;

/// Maximum accepted length, in characters
pub const MAX_LENGTH: usize = 128;

/// Characters that satisfy the special-character requirement
pub const SPECIAL_CHARACTERS: &str = "!@#$%^&*()_+=[]{}|;:,.<>?/\\-";

pub const TOO_SHORT: &str = "Password must be at least 8 characters long";
pub const TOO_LONG: &str = "Password must be at most 128 characters long";
pub const HAS_WHITESPACE: &str = "Password must not contain whitespace";
pub const MISSING_DIGIT: &str = "Password must contain at least one digit";
pub const MISSING_UPPERCASE: &str = "Password must contain at least one uppercase letter";
pub const MISSING_LOWERCASE: &str = "Password must contain at least one lowercase letter";
pub const MISSING_SPECIAL: &str =
    "Password must contain at least one special character (!@#$%^&*()_+=[]{}|;:,.<>?/\\-)";

/// Outcome of checking a password against the policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    /// True iff `errors` is empty
    pub valid: bool,
    /// One message per failed check, in a fixed order
    pub errors: Vec<String>,
}

impl ValidationReport {
    /// Whether the report contains `message`
    pub fn has_error(&self, message: &str) -> bool {
        self.errors.iter().any(|e| e == message)
    }
}

/// Whether `c` belongs to the special-character set
pub fn is_special(c: char) -> bool {
    SPECIAL_CHARACTERS.contains(c)
}

/// Validate password
///
/// Every check runs independently, so the report lists every problem at
/// once rather than only the first.
pub fn validate(password: &str) -> ValidationReport {
    let length = password.chars().count();

    let mut has_whitespace = false;
    let mut has_upper = false;
    let mut has_lower = false;
    let mut has_digit = false;
    let mut has_special = false;

    for c in password.chars() {
        if c.is_whitespace() {
            has_whitespace = true;
        } else if c.is_ascii_uppercase() {
            has_upper = true;
        } else if c.is_ascii_lowercase() {
            has_lower = true;
        } else if c.is_ascii_digit() {
            has_digit = true;
        } else if is_special(c) {
            has_special = true;
        }
    }

    let checks = [
        (length < MIN_LENGTH, TOO_SHORT),
        (length > MAX_LENGTH, TOO_LONG),
        (has_whitespace, HAS_WHITESPACE),
        (!has_digit, MISSING_DIGIT),
        (!has_upper, MISSING_UPPERCASE),
        (!has_lower, MISSING_LOWERCASE),
        (!has_special, MISSING_SPECIAL),
    ];

    let errors: Vec<String> = checks
        .iter()
        .filter(|(failed, _)| *failed)
        .map(|(_, message)| message.to_string())
        .collect();

    ValidationReport {
        valid: errors.is_empty(),
        errors,
    }
}
