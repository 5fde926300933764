//! services/api/src/credentials.rs
//!
//! Password hashing for account credentials.
//!
//! Hashes are PBKDF2-HMAC-SHA256 with 100,000 rounds, a 32-byte random salt and
//! a 32-byte output, stored as PHC strings
//! (`$pbkdf2-sha256$i=100000,l=32$<salt>$<hash>`).

use pbkdf2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Params, Pbkdf2,
};
use rand::{rngs::OsRng, RngCore};

pub const PBKDF2_ROUNDS: u32 = 100_000;
const SALT_LEN: usize = 32;
const OUTPUT_LEN: usize = 32;

#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    #[error("Failed to hash password: {0}")]
    Hash(String),
    #[error("Stored password hash is unreadable: {0}")]
    InvalidStoredHash(String),
}

/// Hashes `password` with a fresh random salt.
pub fn hash_password(password: &str) -> Result<String, CredentialError> {
    let mut salt_bytes = [0u8; SALT_LEN];
    OsRng.fill_bytes(&mut salt_bytes);
    let salt = SaltString::encode_b64(&salt_bytes).map_err(|e| CredentialError::Hash(e.to_string()))?;

    let params = Params {
        rounds: PBKDF2_ROUNDS,
        output_length: OUTPUT_LEN,
    };
    let hash = Pbkdf2
        .hash_password_customized(
            password.as_bytes(),
            Some(Algorithm::Pbkdf2Sha256.ident()),
            None,
            params,
            &salt,
        )
        .map_err(|e| CredentialError::Hash(e.to_string()))?;
    Ok(hash.to_string())
}

/// Checks `password` against a stored PHC string. The digest comparison is
/// constant-time.
pub fn verify_password(password: &str, stored_hash: &str) -> Result<bool, CredentialError> {
    let parsed = PasswordHash::new(stored_hash)
        .map_err(|e| CredentialError::InvalidStoredHash(e.to_string()))?;
    Ok(Pbkdf2.verify_password(password.as_bytes(), &parsed).is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn correct_password_verifies() {
        let stored = hash_password("correct horse battery").unwrap();
        assert!(verify_password("correct horse battery", &stored).unwrap());
    }

    #[test]
    fn wrong_password_is_rejected() {
        let stored = hash_password("correct horse battery").unwrap();
        assert!(!verify_password("correct horse battery!", &stored).unwrap());
        assert!(!verify_password("", &stored).unwrap());
    }

    #[test]
    fn hash_is_a_salted_phc_string() {
        let first = hash_password("secret-password").unwrap();
        let second = hash_password("secret-password").unwrap();

        assert!(first.starts_with("$pbkdf2-sha256$i=100000,l=32$"), "{first}");
        assert_ne!(first, second);
        assert!(!first.contains("secret-password"));
    }

    #[test]
    fn garbage_stored_hash_is_an_error() {
        assert!(matches!(
            verify_password("anything", "not-a-phc-string"),
            Err(CredentialError::InvalidStoredHash(_))
        ));
    }
}
