//! Password hashing and verification using Argon2id.
//!
//! Hashes are PHC strings of the form
//! `$argon2id$v=19$m=65536,t=3,p=2$<b64 salt>$<b64 hash>` with raw
//! (unpadded) base64. Verification parses the encoded string, rejects a
//! foreign algorithm or version, recomputes the hash under the encoded
//! parameters, and compares in constant time.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};

/// Memory cost in KiB (64 MiB).
const MEMORY_KIB: u32 = 64 * 1024;

/// Number of iterations.
const ITERATIONS: u32 = 3;

/// Degree of parallelism.
const PARALLELISM: u32 = 2;

/// Derived key length in bytes.
const KEY_LENGTH: usize = 32;

/// Errors produced while hashing or verifying passwords.
#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    /// The stored hash string cannot be parsed, or hashing failed.
    #[error("password hash error: {0}")]
    Hash(argon2::password_hash::Error),
}

impl From<argon2::password_hash::Error> for PasswordError {
    fn from(err: argon2::password_hash::Error) -> Self {
        Self::Hash(err)
    }
}

fn hasher() -> Argon2<'static> {
    // Params::new only fails on out-of-range values; these are compile-time
    // constants within the documented ranges.
    let params = Params::new(MEMORY_KIB, ITERATIONS, PARALLELISM, Some(KEY_LENGTH))
        .expect("argon2 parameters are in range");
    Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
}

/// Hash a password with Argon2id and a random 16-byte salt.
///
/// # Errors
///
/// Returns an error if the underlying hash computation fails.
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = hasher().hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

/// Verify a password against a stored PHC-encoded Argon2id hash.
///
/// A failed comparison yields `Ok(false)`; only a malformed or
/// foreign-algorithm hash string is an error.
///
/// # Errors
///
/// Returns an error if the encoded hash cannot be parsed.
pub fn verify_password(password: &str, encoded: &str) -> Result<bool, PasswordError> {
    let parsed = PasswordHash::new(encoded)?;
    Ok(hasher()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_and_verify() {
        let hash = hash_password("sikret").unwrap();
        assert!(verify_password("sikret", &hash).unwrap());
        assert!(!verify_password("wrongpassword", &hash).unwrap());
    }

    #[test]
    fn encoded_form_carries_parameters() {
        let hash = hash_password("sikret").unwrap();
        assert!(hash.starts_with("$argon2id$v=19$m=65536,t=3,p=2$"));
    }

    #[test]
    fn different_passwords_different_hashes() {
        let h1 = hash_password("password1").unwrap();
        let h2 = hash_password("password2").unwrap();
        assert_ne!(h1, h2);
    }

    #[test]
    fn malformed_hash_is_an_error() {
        assert!(verify_password("anything", "not-a-phc-string").is_err());
    }
}
