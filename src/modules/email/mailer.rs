use std::sync::Mutex;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MailError {
    #[error("invalid address `{address}`: {reason}")]
    Address { address: String, reason: String },
    #[error("failed to build message: {0}")]
    Build(String),
    #[error("failed to send email: {0}")]
    Transport(String),
    #[error("SMTP credentials unavailable: {0}")]
    Credentials(String),
}

/// Outbound mail capability
pub trait Mailer: Send + Sync {
    fn send(&self, to: &str, from: &str, subject: &str, body: &str) -> Result<(), MailError>;
}

/// One message captured by [`RecordingMailer`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMail {
    pub to: String,
    pub from: String,
    pub subject: String,
    pub body: String,
}

/// Mailer that keeps messages in memory instead of delivering them.
///
/// Used by tests and by the CLI's `--print-mail` mode.
#[derive(Debug, Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<SentMail>>,
    failure: Option<String>,
}

impl RecordingMailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every send is still recorded but reported as a transport failure
    pub fn failing(reason: impl Into<String>) -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            failure: Some(reason.into()),
        }
    }

    pub fn sent(&self) -> Vec<SentMail> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }

    pub fn count(&self) -> usize {
        self.sent.lock().map(|s| s.len()).unwrap_or(0)
    }
}

impl Mailer for RecordingMailer {
    fn send(&self, to: &str, from: &str, subject: &str, body: &str) -> Result<(), MailError> {
        let mail = SentMail {
            to: to.to_string(),
            from: from.to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
        };
        self.sent
            .lock()
            .map_err(|_| MailError::Transport("recording mailer lock poisoned".to_string()))?
            .push(mail);

        match &self.failure {
            Some(reason) => Err(MailError::Transport(reason.clone())),
            None => Ok(()),
        }
    }
}
