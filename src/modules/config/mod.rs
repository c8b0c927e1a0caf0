use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::ProviderError;
use crate::modules::auth::password::MIN_GENERATED_PASSWORD_LENGTH;

pub const DEFAULT_NEW_PASSWORD_EXPIRY: u64 = 7 * 86400;
pub const DEFAULT_PASSWORD_REMINDER_RESEND_TIME: u64 = 86400;

/// Site-wide settings shared by every component, usually read from a JSON
/// file. Missing keys take their defaults.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct SiteConfig {
    pub enable_email: bool,
    /// Seconds a temporary password stays usable; 0 disables expiry
    pub new_password_expiry: u64,
    /// Seconds between two mailed resets for the same account; 0 disables throttling
    pub password_reminder_resend_time: u64,
    pub allow_requiring_email_for_resets: bool,
    pub password_sender: String,
    pub site_name: String,
    pub server_url: String,
    pub min_password_length: usize,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            enable_email: true,
            new_password_expiry: DEFAULT_NEW_PASSWORD_EXPIRY,
            password_reminder_resend_time: DEFAULT_PASSWORD_REMINDER_RESEND_TIME,
            allow_requiring_email_for_resets: false,
            password_sender: "noreply@localhost".to_string(),
            site_name: "Tempass".to_string(),
            server_url: "http://localhost".to_string(),
            min_password_length: 8,
        }
    }
}

impl SiteConfig {
    /// Load configuration from a JSON file
    pub fn load(path: &Path) -> Result<Self, ProviderError> {
        let raw = fs::read_to_string(path)?;
        let config: SiteConfig = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ProviderError> {
        if self.password_sender.trim().is_empty() {
            return Err(ProviderError::Config(
                "password_sender must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Explicit per-provider overrides; `None` falls back to [`SiteConfig`]
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct ProviderParams {
    pub email_enabled: Option<bool>,
    pub new_password_expiry: Option<u64>,
    pub password_reminder_resend_time: Option<u64>,
    pub allow_requiring_email_for_resets: Option<bool>,
}

/// Settings the provider runs with, fixed at construction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    pub email_enabled: bool,
    pub new_password_expiry: u64,
    pub password_reminder_resend_time: u64,
    pub allow_requiring_email_for_resets: bool,
    pub password_sender: String,
    pub site_name: String,
    pub server_url: String,
    pub min_password_length: usize,
}

impl ProviderConfig {
    /// Explicit params win; everything else comes from the site config
    pub fn resolve(params: &ProviderParams, site: &SiteConfig) -> Self {
        Self {
            email_enabled: params.email_enabled.unwrap_or(site.enable_email),
            new_password_expiry: params
                .new_password_expiry
                .unwrap_or(site.new_password_expiry),
            password_reminder_resend_time: params
                .password_reminder_resend_time
                .unwrap_or(site.password_reminder_resend_time),
            allow_requiring_email_for_resets: params
                .allow_requiring_email_for_resets
                .unwrap_or(site.allow_requiring_email_for_resets),
            password_sender: site.password_sender.clone(),
            site_name: site.site_name.clone(),
            server_url: site.server_url.clone(),
            min_password_length: site.min_password_length,
        }
    }

    /// Length of passwords handed out by the provider
    pub fn generated_password_length(&self) -> usize {
        self.min_password_length.max(MIN_GENERATED_PASSWORD_LENGTH)
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self::resolve(&ProviderParams::default(), &SiteConfig::default())
    }
}
