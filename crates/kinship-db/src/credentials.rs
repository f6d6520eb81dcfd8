use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};

use crate::error::{Result, StoreError};

/// Stored for accounts that have never set a password. It is not a valid
/// PHC string, so no verifier will ever accept it.
pub const UNUSABLE_HASH: &str = "!";

/// Opaque password hashing capability. The store only ever hands it
/// plaintext to hash or to check against a stored hash.
pub trait CredentialVerifier: Send + Sync {
    fn hash(&self, plaintext: &str) -> Result<String>;

    /// Must return `false` for malformed hashes, including [`UNUSABLE_HASH`].
    fn verify(&self, hash: &str, plaintext: &str) -> bool;
}

/// Argon2id with the crate's default parameters.
#[derive(Default)]
pub struct Argon2Verifier {
    argon2: Argon2<'static>,
}

impl CredentialVerifier for Argon2Verifier {
    fn hash(&self, plaintext: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        self.argon2
            .hash_password(plaintext.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| StoreError::Credential(e.to_string()))
    }

    fn verify(&self, hash: &str, plaintext: &str) -> bool {
        let Ok(parsed) = PasswordHash::new(hash) else {
            return false;
        };
        self.argon2
            .verify_password(plaintext.as_bytes(), &parsed)
            .is_ok()
    }
}
