use super::requests::TemporaryPasswordRequest;
use super::status::{Message, StatusValue};

/// Outcome of a primary authentication or account-creation step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthenticationResponse {
    /// Credentials accepted for `username`. Account creation attaches the
    /// request the orchestrator must hand back to `finish_account_creation`.
    Pass {
        username: String,
        create_request: Option<TemporaryPasswordRequest>,
    },
    Fail(Message),
    /// Not this provider's business; try the next one
    Abstain,
}

impl AuthenticationResponse {
    pub fn new_pass(username: impl Into<String>) -> Self {
        AuthenticationResponse::Pass {
            username: username.into(),
            create_request: None,
        }
    }

    pub fn new_fail(message: Message) -> Self {
        AuthenticationResponse::Fail(message)
    }

    pub fn new_abstain() -> Self {
        AuthenticationResponse::Abstain
    }

    pub fn is_pass(&self) -> bool {
        matches!(self, AuthenticationResponse::Pass { .. })
    }

    pub fn is_fail(&self) -> bool {
        matches!(self, AuthenticationResponse::Fail(_))
    }

    pub fn username(&self) -> Option<&str> {
        match self {
            AuthenticationResponse::Pass { username, .. } => Some(username),
            _ => None,
        }
    }

    pub fn message(&self) -> Option<&Message> {
        match self {
            AuthenticationResponse::Fail(message) => Some(message),
            _ => None,
        }
    }

    pub fn create_request(&self) -> Option<&TemporaryPasswordRequest> {
        match self {
            AuthenticationResponse::Pass { create_request, .. } => create_request.as_ref(),
            _ => None,
        }
    }
}

/// How a primary provider takes part in account creation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountCreationType {
    /// Creates the credential along with the account
    Create,
}

/// Hint returned from `finish_account_creation` so the caller can adjust
/// its post-creation notice
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreationNotice {
    ByEmail,
}

/// Result of `finish_account_creation`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreationOutcome {
    pub notice: Option<CreationNotice>,
    /// Delivery of the account-created mail; good when none was sent
    pub mail: StatusValue,
}

impl CreationOutcome {
    /// Password stored, nothing mailed
    pub fn silent() -> Self {
        Self {
            notice: None,
            mail: StatusValue::new_good(),
        }
    }
}
