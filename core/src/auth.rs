use std::sync::LazyLock;

use argon2::Argon2;
use password_hash::rand_core::OsRng;
use password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use rand::Rng;
use sha2::{Digest, Sha256};

pub const ACCESS_TOKEN_PREFIX: &str = "melvis_at_";
pub const MIN_PASSWORD_LEN: usize = 8;

#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    #[error("failed to hash password: {0}")]
    Hash(password_hash::Error),
    #[error("stored password hash is invalid: {0}")]
    InvalidHash(password_hash::Error),
}

/// Generate a session access token. Returns `(full_token, sha256_hash)`.
/// Format: `melvis_at_` + 32 random bytes hex-encoded.
pub fn generate_access_token() -> (String, String) {
    let raw = random_hex(32);
    let full_token = format!("{ACCESS_TOKEN_PREFIX}{raw}");
    let hash = hash_token(&full_token);
    (full_token, hash)
}

/// SHA-256 hex digest of a token string.
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

/// Hash a password with Argon2id and a random salt.
pub fn hash_password(password: &str) -> Result<String, CredentialError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(CredentialError::Hash)
}

/// Verify a password against an Argon2id hash.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, CredentialError> {
    let parsed = PasswordHash::new(hash).map_err(CredentialError::InvalidHash)?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

static DUMMY_HASH: LazyLock<Option<String>> =
    LazyLock::new(|| hash_password("melvis-unknown-account").ok());

/// Run a full Argon2 verification against a throwaway hash and report failure.
/// Login calls this when no account matches the email.
pub fn verify_against_dummy(password: &str) -> bool {
    if let Some(hash) = DUMMY_HASH.as_deref() {
        let _ = verify_password(password, hash);
    }
    false
}

/// Lowercased, trimmed form used to compare email addresses.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Generate `n` random bytes and return as hex string.
fn random_hex(n: usize) -> String {
    let bytes: Vec<u8> = (0..n).map(|_| rand::thread_rng().r#gen::<u8>()).collect();
    hex::encode(&bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn access_token_roundtrip() {
        let (token, hash) = generate_access_token();
        assert!(token.starts_with(ACCESS_TOKEN_PREFIX));
        assert_eq!(token.len(), ACCESS_TOKEN_PREFIX.len() + 64);
        assert_eq!(hash, hash_token(&token));
    }

    #[test]
    fn tokens_are_unique() {
        let (a, _) = generate_access_token();
        let (b, _) = generate_access_token();
        assert_ne!(a, b);
    }

    #[test]
    fn password_roundtrip() {
        let password = "calm_waters_42";
        let hash = hash_password(password).unwrap();
        assert!(verify_password(password, &hash).unwrap());
        assert!(!verify_password("wrong_password", &hash).unwrap());
    }

    #[test]
    fn garbage_hash_is_an_error() {
        assert!(matches!(
            verify_password("whatever", "not-a-phc-string"),
            Err(CredentialError::InvalidHash(_))
        ));
    }

    #[test]
    fn dummy_verification_always_fails() {
        assert!(DUMMY_HASH.is_some());
        assert!(!verify_against_dummy("melvis-unknown-account"));
        assert!(!verify_against_dummy("anything_else"));
    }

    #[test]
    fn email_normalization() {
        assert_eq!(normalize_email("  Ada@Example.COM "), "ada@example.com");
    }
}
