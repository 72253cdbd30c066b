//! Checks run on staff account details before they are sent to the API

use regex::Regex;
use std::sync::OnceLock;

const USERNAME_MIN: usize = 3;
const USERNAME_MAX: usize = 32;
const EMAIL_MAX: usize = 254;

fn username_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z0-9_]+$").expect("valid username pattern"))
}

fn email_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}$")
            .expect("valid email pattern")
    })
}

/// Staff login name: 3 to 32 letters, digits or underscores
pub fn validate_username(username: &str) -> Result<(), String> {
    let length = username.chars().count();
    if length == 0 {
        Err("Username is required".to_string())
    } else if length < USERNAME_MIN {
        Err(format!("Username must be at least {} characters long", USERNAME_MIN))
    } else if length > USERNAME_MAX {
        Err(format!("Username must be at most {} characters long", USERNAME_MAX))
    } else if !username_pattern().is_match(username) {
        Err("Username can only contain letters, numbers, and underscores".to_string())
    } else {
        Ok(())
    }
}

/// Contact address for the account
pub fn validate_email(email: &str) -> Result<(), String> {
    if email.is_empty() {
        Err("Email is required".to_string())
    } else if email.len() > EMAIL_MAX {
        Err(format!("Email must be at most {} characters long", EMAIL_MAX))
    } else if !email_pattern().is_match(email) {
        Err("Invalid email format".to_string())
    } else {
        Ok(())
    }
}

/// Validate full name; optional, but not blank when given
pub fn validate_full_name(full_name: Option<&str>) -> Result<(), String> {
    match full_name {
        Some(name) if name.trim().is_empty() => Err("Full name cannot be blank".to_string()),
        Some(name) if name.chars().count() > 100 => {
            Err("Full name must be at most 100 characters long".to_string())
        }
        _ => Ok(()),
    }
}

/// Validate password against the account policy, listing every failure
pub fn validate_password(password: &str) -> Result<(), Vec<String>> {
    let report = password::validate(password);
    if report.valid {
        Ok(())
    } else {
        Err(report.errors)
    }
}
