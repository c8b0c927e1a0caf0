use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

use super::status::Message;

/// Tells the orchestrator to force a password change after login
pub const RESET_PASS_KEY: &str = "reset-pass";
/// Tells the orchestrator not to send its own account-created mail
pub const NO_EMAIL_KEY: &str = "no-email";

/// Payload stored under [`RESET_PASS_KEY`]
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct PasswordResetData {
    pub msg: Message,
    /// A hard reset cannot be skipped by the user
    pub hard: bool,
}

/// Per-session scratch data shared between the orchestrator and providers.
///
/// Owned by the orchestrator for the length of one authentication flow and
/// lent to the provider at the call boundary.
#[derive(Debug, Clone, Default)]
pub struct AuthSession {
    data: HashMap<String, Value>,
}

impl AuthSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: &str, value: impl Into<Value>) {
        self.data.insert(key.to_string(), value.into());
    }

    /// Store any serializable value under `key`
    pub fn set_serialized<T: Serialize>(&mut self, key: &str, value: &T) -> serde_json::Result<()> {
        let value = serde_json::to_value(value)?;
        self.data.insert(key.to_string(), value);
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    /// Read back a typed value; `None` if missing or of another shape
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.data
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.data.remove(key)
    }

    pub fn clear(&mut self) {
        self.data.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reset_data_round_trip() {
        let mut session = AuthSession::new();
        let reset = PasswordResetData {
            msg: Message::new("resetpass-temp-emailed"),
            hard: true,
        };
        session.set_serialized(RESET_PASS_KEY, &reset).unwrap();

        let stored: PasswordResetData = session.get_as(RESET_PASS_KEY).unwrap();
        assert_eq!(stored, reset);
        assert!(session.get_as::<bool>(RESET_PASS_KEY).is_none());
    }

    #[test]
    fn test_remove_and_clear() {
        let mut session = AuthSession::new();
        session.set(NO_EMAIL_KEY, true);
        session.set("other", "value");
        assert_eq!(session.remove(NO_EMAIL_KEY), Some(Value::Bool(true)));
        assert!(session.get(NO_EMAIL_KEY).is_none());
        session.clear();
        assert!(session.is_empty());
    }
}
