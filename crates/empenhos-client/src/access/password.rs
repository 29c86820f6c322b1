//! Salted Argon2id password hashing.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Argon2, PasswordHash};

use crate::{ClientError, ClientResult};

/// Hashes `password` with a fresh random salt into a PHC string.
pub fn hash_password(password: &str) -> ClientResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|error| ClientError::internal_password_hash(&error.to_string()))
}

/// `false` for a wrong password and for a stored hash that does not parse.
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(stored_hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::{hash_password, verify_password};

    #[test]
    fn hashes_are_salted_argon2id() {
        let first = hash_password("senha-forte");
        let second = hash_password("senha-forte");
        assert!(first.is_ok() && second.is_ok());
        if let (Ok(first), Ok(second)) = (first, second) {
            assert!(first.starts_with("$argon2id$"));
            assert_ne!(first, second);
            assert!(!first.contains("senha-forte"));
        }
    }

    #[test]
    fn verifies_only_the_original_password() {
        let hash = hash_password("senha-forte");
        assert!(hash.is_ok());
        if let Ok(hash) = hash {
            assert!(verify_password("senha-forte", &hash));
            assert!(!verify_password("senha-fraca", &hash));
        }
    }

    #[test]
    fn plaintext_or_garbage_hash_never_verifies() {
        assert!(!verify_password("1234", "1234"));
        assert!(!verify_password("", ""));
    }
}
