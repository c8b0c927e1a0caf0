// First, declare the modules folder itself
mod error;
mod modules;

// Re-export everything from modules for easier access
pub use modules::{auth, config, email, hashing, utils};

// Re-export commonly used types
pub use error::{DirectoryError, ProviderError};
pub use modules::auth::provider::TemporaryPasswordProvider;
pub use modules::auth::store::{UserDirectory, UserStore};
pub use modules::config::{ProviderConfig, ProviderParams, SiteConfig};
pub use modules::email::manager::SecureEmailManager;

// Constants
pub const USERS_FILE: &str = "users.json";
pub const LOG_FILE: &str = "tempass.log";

// Type aliases
pub type HmacSha256 = hmac::Hmac<sha2::Sha256>;
