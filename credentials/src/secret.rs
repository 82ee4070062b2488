//! Session secret hashing with Argon2id.
//!
//! Only the PHC string (algorithm, parameters, salt and hash) is stored.
//! Both functions are CPU bound; async callers run them on a blocking
//! thread.

use crate::error::{AuthError, Result};
use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
};
use rand::rngs::OsRng;

/// Hash a session secret.
///
/// # Errors
///
/// Returns [`AuthError::Hashing`] if Argon2 rejects the input.
pub fn hash_secret(secret: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(secret.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AuthError::Hashing(format!("failed to hash session secret: {e}")))
}

/// Check a session secret against a stored PHC hash.
///
/// # Errors
///
/// Returns [`AuthError::Hashing`] if the stored hash is not a valid PHC
/// string. A wrong secret is `Ok(false)`, not an error.
pub fn verify_secret(secret: &str, phc_hash: &str) -> Result<bool> {
    let parsed = PasswordHash::new(phc_hash)
        .map_err(|e| AuthError::Hashing(format!("stored hash unreadable: {e}")))?;

    Ok(Argon2::default()
        .verify_password(secret.as_bytes(), &parsed)
        .is_ok())
}
