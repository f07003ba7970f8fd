//! Salted, slow password hashing (Argon2id, PHC string format).

use argon2::{
    password_hash::{self, SaltString},
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
};
use base64ct::{Base64UrlUnpadded, Encoding};
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};
use std::sync::OnceLock;

pub const MIN_PASSWORD_LENGTH: usize = 6;

/// Hash a plaintext password with a fresh random salt.
///
/// # Errors
/// Returns an error if Argon2 rejects the input or parameters.
pub fn hash(plaintext: &str) -> Result<String, password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default().hash_password(plaintext.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

/// Check a plaintext password against a stored PHC hash.
///
/// A stored value that does not parse is a failed verification.
#[must_use]
pub fn verify(plaintext: &str, stored: &str) -> bool {
    PasswordHash::new(stored).is_ok_and(|parsed| {
        Argon2::default()
            .verify_password(plaintext.as_bytes(), &parsed)
            .is_ok()
    })
}

/// Run a verification that always fails, at the same cost as a real one.
///
/// Used when there is no stored hash to compare against.
pub fn verify_dummy(plaintext: &str) {
    static DUMMY: OnceLock<Option<String>> = OnceLock::new();
    if let Some(stored) = DUMMY.get_or_init(|| hash("dummy-password").ok()) {
        let _ = verify(plaintext, stored);
    }
}

/// Short fingerprint of a stored hash, embedded in activation tokens.
///
/// Changes whenever the password hash is replaced.
#[must_use]
pub fn stamp(stored: &str) -> String {
    let digest = Sha256::digest(stored.as_bytes());
    Base64UrlUnpadded::encode_string(&digest[..16])
}
