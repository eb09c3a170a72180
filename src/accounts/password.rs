// Password hashing and verification service

use crate::accounts::error::AccountError;
use argon2::{
    password_hash::SaltString, Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
};
use rand::rngs::OsRng;

/// Password service for hashing and verification
///
/// Wraps Argon2id so the state machine never touches the algorithm
/// directly; swapping the hash only changes this file.
pub struct PasswordService;

impl PasswordService {
    /// Hash a password using Argon2id with a fresh random salt
    pub fn hash_password(password: &str) -> Result<String, AccountError> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| {
                tracing::error!("argon2 hash_password error: {}", e);
                AccountError::PasswordHash
            })?
            .to_string();
        Ok(hash)
    }

    /// Verify a password against a stored hash
    pub fn verify_password(password: &str, hash: &str) -> Result<bool, AccountError> {
        let parsed = PasswordHash::new(hash).map_err(|e| {
            tracing::error!("argon2 parse hash error: {}", e);
            AccountError::PasswordHash
        })?;
        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify_roundtrip() {
        let password = "secret1";
        let hash = PasswordService::hash_password(password).expect("hashing should succeed");
        assert!(PasswordService::verify_password(password, &hash).expect("verify should succeed"));
    }

    #[test]
    fn test_verify_rejects_wrong_password() {
        let hash = PasswordService::hash_password("correct-password").unwrap();
        assert!(!PasswordService::verify_password("wrong-password", &hash).unwrap());
    }

    #[test]
    fn test_hash_is_not_plaintext() {
        let password = "secret1";
        let hash = PasswordService::hash_password(password).unwrap();
        assert_ne!(hash, password);
        assert!(!hash.contains(password));
    }

    #[test]
    fn test_same_password_hashes_differently() {
        // Fresh salt per hash
        let first = PasswordService::hash_password("secret1").unwrap();
        let second = PasswordService::hash_password("secret1").unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn test_verify_errors_on_malformed_hash() {
        assert!(PasswordService::verify_password("anything", "not-a-valid-hash").is_err());
    }
}
