use keyring::Entry;

use super::mailer::MailError;
use super::smtp::SmtpCredentials;
use crate::modules::utils::time::get_current_timestamp;

const KEYRING_SERVICE: &str = "tempass-email";
const KEYRING_ENTRY: &str = "smtp-credentials";

/// SMTP credentials kept in the system keyring rather than in config files
pub struct SecureEmailManager {
    keyring: Entry,
}

impl SecureEmailManager {
    pub fn new() -> Result<Self, MailError> {
        let keyring = Entry::new(KEYRING_SERVICE, KEYRING_ENTRY)
            .map_err(|e| MailError::Credentials(format!("failed to open keyring entry: {}", e)))?;
        Ok(Self { keyring })
    }

    pub fn store_credentials(
        &self,
        username: &str,
        password: &str,
        host: &str,
        port: u16,
    ) -> Result<(), MailError> {
        let credentials = SmtpCredentials {
            username: username.to_string(),
            password: password.to_string(),
            host: host.to_string(),
            port,
            last_updated: get_current_timestamp(),
        };
        self.keyring
            .set_password(&encode_credentials(&credentials)?)
            .map_err(|e| MailError::Credentials(format!("failed to store credentials: {}", e)))
    }

    pub fn get_credentials(&self) -> Result<SmtpCredentials, MailError> {
        let raw = self
            .keyring
            .get_password()
            .map_err(|e| MailError::Credentials(format!("failed to retrieve credentials: {}", e)))?;
        decode_credentials(&raw)
    }
}

fn encode_credentials(credentials: &SmtpCredentials) -> Result<String, MailError> {
    serde_json::to_string(credentials)
        .map_err(|e| MailError::Credentials(format!("failed to serialize credentials: {}", e)))
}

fn decode_credentials(raw: &str) -> Result<SmtpCredentials, MailError> {
    serde_json::from_str(raw)
        .map_err(|e| MailError::Credentials(format!("failed to parse credentials: {}", e)))
}
