use log::info;

use super::mailer::MailError;
use super::SecureEmailManager;
use crate::modules::auth::password::read_password;
use crate::modules::utils::io::{is_valid_email, read_line};
use crate::modules::utils::logging::format_sensitive;

/// Basic domain check for the SMTP relay host
fn is_valid_host(host: &str) -> bool {
    !host.is_empty() && host.contains('.') && !host.contains(char::is_whitespace)
}

/// Check the non-secret half of the SMTP settings
pub fn validate_smtp_settings(username: &str, host: &str, port: u16) -> Result<(), MailError> {
    if !is_valid_email(username) {
        return Err(MailError::Address {
            address: username.to_string(),
            reason: "not a valid email address".to_string(),
        });
    }
    if !is_valid_host(host) {
        return Err(MailError::Credentials(format!(
            "invalid SMTP server `{}`",
            host
        )));
    }
    if port == 0 {
        return Err(MailError::Credentials("SMTP port must be non-zero".to_string()));
    }
    Ok(())
}

/// Prompt for the SMTP password and store the settings in the keyring
pub fn setup_email_credentials(username: &str, host: &str, port: u16) -> Result<(), MailError> {
    validate_smtp_settings(username, host, port)?;

    let password = loop {
        println!("Enter email password or app-specific password:");
        let pass = read_password()
            .map_err(|e| MailError::Credentials(format!("failed to read password: {}", e)))?;

        if pass.trim().is_empty() {
            println!("Password cannot be empty. Please try again.");
            continue;
        }

        // Gmail app passwords are 16 characters
        if host.ends_with("gmail.com") && pass.len() != 16 {
            println!("Warning: Gmail app passwords are typically 16 characters long.");
            println!("Are you sure you want to use this password? (y/n)");
            let confirm = read_line()
                .map_err(|e| MailError::Credentials(format!("failed to read input: {}", e)))?;
            if !confirm.eq_ignore_ascii_case("y") {
                continue;
            }
        }

        break pass;
    };

    SecureEmailManager::new()?.store_credentials(username, &password, host, port)?;
    info!(
        "SMTP credentials stored for {} via {}:{}",
        format_sensitive(username),
        host,
        port
    );
    println!("\nEmail configuration saved securely.");
    Ok(())
}
