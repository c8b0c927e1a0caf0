use log::debug;
use pbkdf2::pbkdf2;
use rand::Rng;
use thiserror::Error;

use crate::HmacSha256;

/// Stored in place of a hash to disable the slot; never verifies
pub const INVALID_PASSWORD_HASH: &str = ":null:";

pub const DEFAULT_ITERATIONS: u32 = 100_000;
const SALT_LENGTH: usize = 16;
const KEY_LENGTH: usize = 32;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum HashError {
    #[error("hash string is not in the `:type:...` format")]
    Format,
    #[error("unsupported hash type `{0}`")]
    UnsupportedType(String),
    #[error("invalid iteration count")]
    Iterations,
    #[error("invalid hex encoding")]
    Encoding,
}

/// Converts plaintext into a versioned hash string and back
pub trait PasswordHasher: Send + Sync {
    fn hash(&self, plaintext: &str) -> String;
    fn verify(&self, hash: &str, plaintext: &str) -> bool;

    fn is_invalid_sentinel(&self, hash: &str) -> bool {
        hash == INVALID_PASSWORD_HASH
    }

    /// Whether `hash` could ever verify; false for the sentinel and for
    /// anything this hasher cannot read
    fn is_usable(&self, hash: &str) -> bool {
        !self.is_invalid_sentinel(hash)
    }
}

/// Function to generate a random salt for PBKDF2
pub fn generate_random_salt() -> Vec<u8> {
    let mut rng = rand::thread_rng();
    (0..SALT_LENGTH).map(|_| rng.gen()).collect()
}

/// Function to derive a 32-byte key from the passphrase using PBKDF2
pub fn derive_key_from_passphrase(passphrase: &str, salt: &[u8], iterations: u32) -> Vec<u8> {
    let mut key = vec![0u8; KEY_LENGTH];
    pbkdf2::<HmacSha256>(passphrase.as_bytes(), salt, iterations, &mut key);
    key
}

/// PBKDF2-HMAC-SHA256 hashes serialized as
/// `:pbkdf2:sha256:<iterations>:<salt hex>:<hash hex>`.
///
/// The iteration count travels with each hash, so raising it for new
/// hashes leaves old ones verifiable.
#[derive(Debug, Clone)]
pub struct Pbkdf2Hasher {
    iterations: u32,
}

impl Default for Pbkdf2Hasher {
    fn default() -> Self {
        Self::new(DEFAULT_ITERATIONS)
    }
}

struct ParsedHash {
    iterations: u32,
    salt: Vec<u8>,
    key: Vec<u8>,
}

impl Pbkdf2Hasher {
    pub fn new(iterations: u32) -> Self {
        Self {
            iterations: iterations.max(1),
        }
    }

    fn parse(hash: &str) -> Result<ParsedHash, HashError> {
        let parts: Vec<&str> = hash.split(':').collect();
        // Leading ':' yields an empty first segment
        if parts.len() < 3 || !parts[0].is_empty() {
            return Err(HashError::Format);
        }
        if parts[1] != "pbkdf2" {
            return Err(HashError::UnsupportedType(parts[1].to_string()));
        }
        if parts.len() != 6 || parts[2] != "sha256" {
            return Err(HashError::Format);
        }
        let iterations: u32 = parts[3].parse().map_err(|_| HashError::Iterations)?;
        if iterations == 0 {
            return Err(HashError::Iterations);
        }
        let salt = hex::decode(parts[4]).map_err(|_| HashError::Encoding)?;
        let key = hex::decode(parts[5]).map_err(|_| HashError::Encoding)?;
        Ok(ParsedHash {
            iterations,
            salt,
            key,
        })
    }
}

impl PasswordHasher for Pbkdf2Hasher {
    fn hash(&self, plaintext: &str) -> String {
        let salt = generate_random_salt();
        let key = derive_key_from_passphrase(plaintext, &salt, self.iterations);
        format!(
            ":pbkdf2:sha256:{}:{}:{}",
            self.iterations,
            hex::encode(&salt),
            hex::encode(key)
        )
    }

    fn is_usable(&self, hash: &str) -> bool {
        !self.is_invalid_sentinel(hash) && Self::parse(hash).is_ok()
    }

    fn verify(&self, hash: &str, plaintext: &str) -> bool {
        if self.is_invalid_sentinel(hash) {
            return false;
        }
        let parsed = match Self::parse(hash) {
            Ok(parsed) => parsed,
            Err(e) => {
                debug!("Unusable password hash: {}", e);
                return false;
            }
        };
        let candidate = derive_key_from_passphrase(plaintext, &parsed.salt, parsed.iterations);
        if candidate.len() != parsed.key.len() {
            return false;
        }
        // Compare every byte so the time taken does not depend on the prefix
        candidate
            .iter()
            .zip(parsed.key.iter())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
    }
}
