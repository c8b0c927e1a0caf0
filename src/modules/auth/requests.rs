use serde::{Deserialize, Serialize};

use super::password::generate_random_password;

/// What the orchestrator is trying to do with the presented requests
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum AuthAction {
    #[default]
    Login,
    Create,
    Change,
    Remove,
    Link,
}

/// Discriminator for [`AuthenticationRequest`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestKind {
    Password,
    TemporaryPassword,
    Generic,
}

/// Username + password, as typed into a login form
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PasswordRequest {
    pub action: AuthAction,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl PasswordRequest {
    pub fn new(action: AuthAction) -> Self {
        Self {
            action,
            ..Self::default()
        }
    }
}

/// Request to set, mail or remove a temporary password
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemporaryPasswordRequest {
    pub action: AuthAction,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Send the new password to the account's email address
    pub mail_password: bool,
    /// Username or IP address the reset is attributed to
    pub caller: Option<String>,
}

impl TemporaryPasswordRequest {
    pub fn new(action: AuthAction) -> Self {
        Self {
            action,
            ..Self::default()
        }
    }

    /// Request pre-filled with a freshly generated password
    pub fn new_random(action: AuthAction, length: usize) -> Self {
        Self {
            action,
            password: Some(generate_random_password(length)),
            ..Self::default()
        }
    }
}

/// Request owned by some other provider; carried so the routing stays total
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenericRequest {
    pub action: AuthAction,
    pub username: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthenticationRequest {
    Password(PasswordRequest),
    TemporaryPassword(TemporaryPasswordRequest),
    Generic(GenericRequest),
}

impl AuthenticationRequest {
    pub fn kind(&self) -> RequestKind {
        match self {
            AuthenticationRequest::Password(_) => RequestKind::Password,
            AuthenticationRequest::TemporaryPassword(_) => RequestKind::TemporaryPassword,
            AuthenticationRequest::Generic(_) => RequestKind::Generic,
        }
    }

    pub fn action(&self) -> AuthAction {
        match self {
            AuthenticationRequest::Password(r) => r.action,
            AuthenticationRequest::TemporaryPassword(r) => r.action,
            AuthenticationRequest::Generic(r) => r.action,
        }
    }

    pub fn username(&self) -> Option<&str> {
        match self {
            AuthenticationRequest::Password(r) => r.username.as_deref(),
            AuthenticationRequest::TemporaryPassword(r) => r.username.as_deref(),
            AuthenticationRequest::Generic(r) => r.username.as_deref(),
        }
    }
}

impl From<PasswordRequest> for AuthenticationRequest {
    fn from(req: PasswordRequest) -> Self {
        AuthenticationRequest::Password(req)
    }
}

impl From<TemporaryPasswordRequest> for AuthenticationRequest {
    fn from(req: TemporaryPasswordRequest) -> Self {
        AuthenticationRequest::TemporaryPassword(req)
    }
}

impl From<GenericRequest> for AuthenticationRequest {
    fn from(req: GenericRequest) -> Self {
        AuthenticationRequest::Generic(req)
    }
}

/// The single password request in `reqs`; `None` when absent or ambiguous
pub fn find_password_request(reqs: &[AuthenticationRequest]) -> Option<&PasswordRequest> {
    let mut found = reqs.iter().filter_map(|r| match r {
        AuthenticationRequest::Password(p) => Some(p),
        _ => None,
    });
    let first = found.next()?;
    found.next().is_none().then_some(first)
}

/// The single temporary-password request in `reqs`; `None` when absent or ambiguous
pub fn find_temporary_password_request(
    reqs: &[AuthenticationRequest],
) -> Option<&TemporaryPasswordRequest> {
    let mut found = reqs.iter().filter_map(|r| match r {
        AuthenticationRequest::TemporaryPassword(t) => Some(t),
        _ => None,
    });
    let first = found.next()?;
    found.next().is_none().then_some(first)
}

/// An account as seen at creation time. The email may not be stored yet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountUser {
    pub name: String,
    pub email: Option<String>,
}

impl AccountUser {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: None,
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn has_email(&self) -> bool {
        self.email.as_deref().map_or(false, |e| !e.trim().is_empty())
    }
}
