pub mod password;
pub mod provider;
pub mod requests;
pub mod response;
pub mod session;
pub mod status;
pub mod store;

// Re-export the main types and functions
pub use password::{
    generate_random_password, validate_password, DefaultPasswordPolicy, PasswordError,
    PasswordPolicy,
};
pub use provider::TemporaryPasswordProvider;
pub use requests::{
    find_password_request, find_temporary_password_request, AccountUser, AuthAction,
    AuthenticationRequest, GenericRequest, PasswordRequest, RequestKind, TemporaryPasswordRequest,
};
pub use response::{AccountCreationType, AuthenticationResponse, CreationNotice, CreationOutcome};
pub use session::{AuthSession, PasswordResetData, NO_EMAIL_KEY, RESET_PASS_KEY};
pub use status::{Message, MessageParam, Severity, StatusEntry, StatusValue};
pub use store::{
    is_valid_username, normalize_username, TemporaryCredential, UserDirectory, UserRecord,
    UserStore,
};
