use rand::distributions::Alphanumeric;
use rand::Rng;
use std::io;

use super::status::{Message, StatusValue};

/// Shortest temporary password ever generated, whatever the policy says
pub const MIN_GENERATED_PASSWORD_LENGTH: usize = 10;
/// Longer passwords are refused outright
pub const MAX_PASSWORD_LENGTH: usize = 4096;

const COMMON_PASSWORDS: &[&str] = &[
    "123456",
    "12345678",
    "123456789",
    "password",
    "password1",
    "qwerty",
    "letmein",
    "iloveyou",
    "welcome",
    "admin",
];

/// Password validity hook run before a password is accepted or stored
pub trait PasswordPolicy: Send + Sync {
    fn check(&self, username: &str, password: &str) -> StatusValue;
}

impl<F> PasswordPolicy for F
where
    F: Fn(&str, &str) -> StatusValue + Send + Sync,
{
    fn check(&self, username: &str, password: &str) -> StatusValue {
        self(username, password)
    }
}

/// Reasons a password falls short of the default policy
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PasswordError {
    TooShort(usize),
    TooLong(usize),
    MatchesUsername,
    Common,
}

impl PasswordError {
    pub fn message(&self) -> Message {
        match self {
            PasswordError::TooShort(min) => {
                Message::new("passwordtooshort").with_param(*min as u64)
            }
            PasswordError::TooLong(max) => Message::new("passwordtoolong").with_param(*max as u64),
            PasswordError::MatchesUsername => Message::new("password-name-match"),
            PasswordError::Common => Message::new("passwordtoopopular"),
        }
    }

    /// Only an oversized password makes the status fatal; the rest are
    /// advisory and leave the decision to the caller.
    pub fn is_fatal(&self) -> bool {
        matches!(self, PasswordError::TooLong(_))
    }
}

/// Collect every rule the password breaks
pub fn validate_password(username: &str, password: &str, min_length: usize) -> Vec<PasswordError> {
    let mut problems = Vec::new();
    let length = password.chars().count();

    if length < min_length {
        problems.push(PasswordError::TooShort(min_length));
    }
    if length > MAX_PASSWORD_LENGTH {
        problems.push(PasswordError::TooLong(MAX_PASSWORD_LENGTH));
    }
    if !username.is_empty() && password.to_lowercase() == username.to_lowercase() {
        problems.push(PasswordError::MatchesUsername);
    }
    if COMMON_PASSWORDS.contains(&password.to_lowercase().as_str()) {
        problems.push(PasswordError::Common);
    }
    problems
}

/// Length, username and blocklist checks
#[derive(Debug, Clone)]
pub struct DefaultPasswordPolicy {
    min_length: usize,
}

impl DefaultPasswordPolicy {
    pub fn new(min_length: usize) -> Self {
        Self { min_length }
    }
}

impl PasswordPolicy for DefaultPasswordPolicy {
    fn check(&self, username: &str, password: &str) -> StatusValue {
        let mut status = StatusValue::new_good();
        for problem in validate_password(username, password, self.min_length) {
            if problem.is_fatal() {
                status.fatal(problem.message());
            } else {
                status.error(problem.message());
            }
        }
        status
    }
}

/// Random alphanumeric password of at least [`MIN_GENERATED_PASSWORD_LENGTH`] chars
pub fn generate_random_password(length: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(length.max(MIN_GENERATED_PASSWORD_LENGTH))
        .map(char::from)
        .collect()
}

/// Helper function to read a password securely
pub fn read_password() -> io::Result<String> {
    rpassword::read_password()
}
