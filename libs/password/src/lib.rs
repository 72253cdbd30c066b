//! Password tooling for staff accounts
//!
//! [`validate`] checks a candidate against the account password policy and
//! reports every failed rule. [`PasswordGenerator`] produces memorable
//! passwords that always pass that policy.

pub mod generator;
pub mod policy;

pub use generator::{
    DEFAULT_OPTION_COUNT, PasswordGenerator, generate_password, generate_password_options,
};
pub use policy::{MAX_LENGTH, MIN_LENGTH, SPECIAL_CHARACTERS, ValidationReport, validate};
