use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::transport::smtp::client::{Tls, TlsParameters};
use lettre::transport::smtp::PoolConfig;
use lettre::{Message, SmtpTransport, Transport};
use log::info;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::mailer::{MailError, Mailer};
use crate::modules::utils::logging::format_sensitive;

/// Structure to hold SMTP credentials with metadata
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct SmtpCredentials {
    pub username: String,
    pub password: String,
    pub host: String,
    /// Typically 587 for STARTTLS
    pub port: u16,
    pub last_updated: u64,
}

/// [`Mailer`] that relays through an authenticated SMTP server
pub struct SmtpMailer {
    credentials: SmtpCredentials,
    timeout: Duration,
}

impl SmtpMailer {
    pub fn new(credentials: SmtpCredentials) -> Self {
        Self {
            credentials,
            timeout: Duration::from_secs(10),
        }
    }

    /// Mailer using the credentials saved with [`SecureEmailManager`](super::SecureEmailManager)
    pub fn from_keyring() -> Result<Self, MailError> {
        let manager = super::manager::SecureEmailManager::new()?;
        Ok(Self::new(manager.get_credentials()?))
    }

    fn parse_mailbox(address: &str) -> Result<Mailbox, MailError> {
        address.parse().map_err(|e: lettre::address::AddressError| MailError::Address {
            address: address.to_string(),
            reason: e.to_string(),
        })
    }

    fn transport(&self) -> Result<SmtpTransport, MailError> {
        let creds = &self.credentials;
        let tls_parameters = TlsParameters::builder(creds.host.clone())
            .build()
            .map_err(|e| MailError::Transport(format!("failed to build TLS parameters: {}", e)))?;

        Ok(SmtpTransport::relay(&creds.host)
            .map_err(|e| MailError::Transport(format!("failed to create SMTP transport: {}", e)))?
            .credentials(Credentials::new(
                creds.username.clone(),
                creds.password.clone(),
            ))
            .port(creds.port)
            .tls(Tls::Required(tls_parameters))
            .pool_config(PoolConfig::new().max_size(1))
            .timeout(Some(self.timeout))
            .build())
    }
}

impl Mailer for SmtpMailer {
    fn send(&self, to: &str, from: &str, subject: &str, body: &str) -> Result<(), MailError> {
        let email = Message::builder()
            .from(Self::parse_mailbox(from)?)
            .to(Self::parse_mailbox(to)?)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())
            .map_err(|e| MailError::Build(e.to_string()))?;

        self.transport()?
            .send(&email)
            .map_err(|e| MailError::Transport(e.to_string()))?;

        info!("Email sent to {}", format_sensitive(to));
        Ok(())
    }
}
