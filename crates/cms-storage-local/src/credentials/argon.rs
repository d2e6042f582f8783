use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use cms_core::{CmsError, PasswordHasher};
use tracing::warn;

/// Argon2id password hashing producing PHC strings
/// (`$argon2id$v=19$m=...,t=...,p=...$salt$hash`).
///
/// Verification reads the parameters back out of the stored string, so
/// digests created with other cost settings still verify.
#[derive(Clone, Default)]
pub struct Argon2Hasher {
    argon2: Argon2<'static>,
}

impl Argon2Hasher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use explicit cost parameters for new hashes.
    pub fn with_params(params: Params) -> Self {
        Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        }
    }
}

impl PasswordHasher for Argon2Hasher {
    fn hash(&self, password: &str) -> Result<String, CmsError> {
        let salt = SaltString::generate(&mut OsRng);
        self.argon2
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| CmsError::Internal(format!("Failed to hash password: {}", e)))
    }

    fn verify(&self, password: &str, digest: &str) -> bool {
        match PasswordHash::new(digest) {
            Ok(parsed) => self
                .argon2
                .verify_password(password.as_bytes(), &parsed)
                .is_ok(),
            Err(e) => {
                warn!("Stored password hash is malformed: {}", e);
                false
            }
        }
    }
}

#[cfg(test)]
pub(crate) fn fast_hasher() -> Argon2Hasher {
    // Minimum cost keeps tests quick; production uses the crate defaults.
    Argon2Hasher::with_params(Params::new(Params::MIN_M_COST, 1, 1, None).unwrap())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let hasher = fast_hasher();
        let digest = hasher.hash("secret").unwrap();

        assert!(digest.starts_with("$argon2id$"));
        assert!(!digest.contains("secret"));
        assert!(hasher.verify("secret", &digest));
        assert!(!hasher.verify("Secret", &digest));
        assert!(!hasher.verify("", &digest));
    }

    #[test]
    fn test_hashes_are_salted() {
        let hasher = fast_hasher();
        let a = hasher.hash("same password").unwrap();
        let b = hasher.hash("same password").unwrap();
        assert_ne!(a, b);
        assert!(hasher.verify("same password", &a));
        assert!(hasher.verify("same password", &b));
    }

    #[test]
    fn test_verifies_digest_from_other_params() {
        let digest = fast_hasher().hash("portable").unwrap();
        assert!(Argon2Hasher::new().verify("portable", &digest));
    }

    #[test]
    fn test_malformed_digest_never_verifies() {
        let hasher = fast_hasher();
        assert!(!hasher.verify("secret", "secret"));
        assert!(!hasher.verify("secret", ""));
    }
}
