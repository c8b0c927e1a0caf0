pub mod mailer;
pub mod manager;
pub mod setup;
pub mod smtp;
pub mod templates;

pub use mailer::{MailError, Mailer, RecordingMailer, SentMail};
pub use manager::SecureEmailManager;
pub use setup::{setup_email_credentials, validate_smtp_settings};
pub use smtp::{SmtpCredentials, SmtpMailer};
pub use templates::{account_created_email, password_reset_email, ResetCaller, ResetEmail};
