pub mod codec;

pub use codec::{
    derive_key_from_passphrase, generate_random_salt, HashError, PasswordHasher, Pbkdf2Hasher,
    INVALID_PASSWORD_HASH,
};
