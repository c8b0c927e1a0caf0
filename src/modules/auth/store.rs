use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use crate::error::DirectoryError;
use crate::modules::hashing::INVALID_PASSWORD_HASH;
use crate::modules::utils::io::is_ip_address;
use crate::modules::utils::time::get_current_timestamp;

pub const MAX_USERNAME_LENGTH: usize = 255;
const INVALID_NAME_CHARS: &[char] = &['#', '<', '>', '[', ']', '|', '{', '}', '/'];

/// The temporary-password slot of one account
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct TemporaryCredential {
    pub username: String,
    pub hash: String,
    /// When the hash was written; `None` for legacy rows and cleared slots
    pub set_at: Option<u64>,
}

/// Trim, turn underscores into spaces, squeeze whitespace and uppercase the
/// first character
pub fn normalize_username(name: &str) -> String {
    let spaced = name.replace('_', " ");
    let collapsed = spaced.split_whitespace().collect::<Vec<_>>().join(" ");
    let mut chars = collapsed.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Syntactic check only; says nothing about whether the account exists
pub fn is_valid_username(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= MAX_USERNAME_LENGTH
        && !name
            .chars()
            .any(|c| c.is_control() || INVALID_NAME_CHARS.contains(&c))
        && !is_ip_address(name)
}

/// Account storage as seen by the provider.
///
/// Names passed to the accessor methods are already canonical.
pub trait UserDirectory: Send + Sync {
    fn normalize(&self, name: &str) -> String {
        normalize_username(name)
    }

    fn name_is_valid(&self, name: &str) -> bool {
        is_valid_username(name)
    }

    /// `None` when the account does not exist
    fn get_credential(&self, name: &str) -> Result<Option<TemporaryCredential>, DirectoryError>;

    fn set_credential(&self, name: &str, hash: &str, set_at: Option<u64>)
        -> Result<(), DirectoryError>;

    fn set_invalid_credential(&self, name: &str) -> Result<(), DirectoryError> {
        self.set_credential(name, INVALID_PASSWORD_HASH, None)
    }

    fn get_email(&self, name: &str) -> Result<Option<String>, DirectoryError>;

    /// The user only wants resets from requesters who also know their address
    fn requires_email_for_resets(&self, _name: &str) -> Result<bool, DirectoryError> {
        Ok(false)
    }
}

/// Represents a single account as persisted by [`UserStore`]
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct UserRecord {
    pub username: String,
    pub email: Option<String>,
    pub temp_password_hash: String,
    pub temp_password_set_at: Option<u64>,
    #[serde(default)]
    pub require_email_for_resets: bool,
    pub created_at: u64,
}

#[derive(Serialize, Deserialize, Debug, Default)]
struct UserTable {
    users: HashMap<String, UserRecord>,
}

/// In-memory [`UserDirectory`], optionally mirrored to a JSON file after
/// every write
#[derive(Debug, Default)]
pub struct UserStore {
    table: Mutex<UserTable>,
    path: Option<PathBuf>,
}

impl UserStore {
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Load the store at `path`, starting empty if the file doesn't exist yet
    pub fn open(path: &Path) -> Result<Self, DirectoryError> {
        let table = if path.exists() {
            let raw = fs::read_to_string(path)?;
            serde_json::from_str(&raw)?
        } else {
            UserTable::default()
        };
        Ok(Self {
            table: Mutex::new(table),
            path: Some(path.to_path_buf()),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, UserTable>, DirectoryError> {
        self.table.lock().map_err(|_| DirectoryError::Poisoned)
    }

    fn persist(&self, table: &UserTable) -> Result<(), DirectoryError> {
        if let Some(path) = &self.path {
            let data = serde_json::to_string_pretty(table)?;
            fs::write(path, data)?;
        }
        Ok(())
    }

    /// Create an account with a disabled temporary-password slot and
    /// return its canonical name
    pub fn add_user(&self, username: &str, email: Option<&str>) -> Result<String, DirectoryError> {
        let canonical = self.normalize(username);
        if !self.name_is_valid(&canonical) {
            return Err(DirectoryError::InvalidName(username.to_string()));
        }

        let mut table = self.lock()?;
        if table.users.contains_key(&canonical) {
            return Err(DirectoryError::AlreadyExists(canonical));
        }

        let record = UserRecord {
            username: canonical.clone(),
            email: email.map(str::to_string),
            temp_password_hash: INVALID_PASSWORD_HASH.to_string(),
            temp_password_set_at: None,
            require_email_for_resets: false,
            created_at: get_current_timestamp(),
        };
        table.users.insert(canonical.clone(), record);
        self.persist(&table)?;
        Ok(canonical)
    }

    fn update<F>(&self, name: &str, apply: F) -> Result<(), DirectoryError>
    where
        F: FnOnce(&mut UserRecord),
    {
        let mut table = self.lock()?;
        let record = table
            .users
            .get_mut(name)
            .ok_or_else(|| DirectoryError::NoSuchUser(name.to_string()))?;
        apply(record);
        self.persist(&table)
    }

    pub fn set_email(&self, name: &str, email: Option<&str>) -> Result<(), DirectoryError> {
        let email = email.map(str::to_string);
        self.update(name, |record| record.email = email)
    }

    pub fn set_require_email_for_resets(&self, name: &str, required: bool) -> Result<(), DirectoryError> {
        self.update(name, |record| record.require_email_for_resets = required)
    }

    pub fn len(&self) -> usize {
        self.lock().map(|t| t.users.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl UserDirectory for UserStore {
    fn get_credential(&self, name: &str) -> Result<Option<TemporaryCredential>, DirectoryError> {
        let table = self.lock()?;
        Ok(table.users.get(name).map(|record| TemporaryCredential {
            username: record.username.clone(),
            hash: record.temp_password_hash.clone(),
            set_at: record.temp_password_set_at,
        }))
    }

    fn set_credential(
        &self,
        name: &str,
        hash: &str,
        set_at: Option<u64>,
    ) -> Result<(), DirectoryError> {
        let hash = hash.to_string();
        self.update(name, |record| {
            record.temp_password_hash = hash;
            record.temp_password_set_at = set_at;
        })
    }

    fn get_email(&self, name: &str) -> Result<Option<String>, DirectoryError> {
        let table = self.lock()?;
        Ok(table
            .users
            .get(name)
            .and_then(|record| record.email.clone())
            .filter(|email| !email.trim().is_empty()))
    }

    fn requires_email_for_resets(&self, name: &str) -> Result<bool, DirectoryError> {
        let table = self.lock()?;
        Ok(table
            .users
            .get(name)
            .map_or(false, |record| record.require_email_for_resets))
    }
}
