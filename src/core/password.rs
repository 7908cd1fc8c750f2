//! Access password hashing using Argon2id.
//!
//! Group access passwords are stored as PHC strings and only ever compared
//! through [`verify_password`], which delegates to the constant-time check in
//! the `argon2` crate.

use crate::errors::{Error, Result};
use argon2::password_hash::SaltString;
use argon2::password_hash::rand_core::OsRng;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};

/// Hashes a plaintext password into an Argon2id PHC string with a fresh salt.
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| Error::PasswordHash {
            message: format!("hashing failed: {e}"),
        })
}

/// Verifies a plaintext password against a stored PHC string.
///
/// Returns `Ok(true)` on match, `Ok(false)` on mismatch, or
/// `Err(Error::PasswordHash)` if the stored hash is malformed.
pub fn verify_password(password: &str, hash: &str) -> Result<bool> {
    let parsed_hash = PasswordHash::new(hash).map_err(|e| Error::PasswordHash {
        message: format!("invalid hash format: {e}"),
    })?;

    match Argon2::default().verify_password(password.as_bytes(), &parsed_hash) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(Error::PasswordHash {
            message: format!("verify error: {e}"),
        }),
    }
}
