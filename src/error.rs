use std::io;
use thiserror::Error;

use crate::modules::email::MailError;

/// Failures raised by a [`UserDirectory`](crate::auth::UserDirectory) backend
#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("user store lock poisoned")]
    Poisoned,
    #[error("no such user: {0}")]
    NoSuchUser(String),
    #[error("user already exists: {0}")]
    AlreadyExists(String),
    #[error("invalid username: {0}")]
    InvalidName(String),
    #[error("user store I/O failed: {0}")]
    Io(#[from] io::Error),
    #[error("user store is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Infrastructure failures surfaced by the provider.
///
/// Authentication and policy outcomes are never reported through this type;
/// they come back as [`AuthenticationResponse`](crate::auth::AuthenticationResponse)
/// or [`StatusValue`](crate::auth::StatusValue).
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("directory error: {0}")]
    Directory(#[from] DirectoryError),
    #[error("mail error: {0}")]
    Mail(#[from] MailError),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}
