use std::sync::Arc;

use async_trait::async_trait;

use crate::error::CmsError;

/// Minimum accepted password length, in characters.
pub const MIN_PASSWORD_LEN: usize = 6;

/// One-way password hashing.
///
/// Implementations must be slow and salted, and `verify` must compare in
/// constant time. Digests are self-describing strings so the algorithm can be
/// swapped without touching callers.
pub trait PasswordHasher: Send + Sync {
    /// Hash a plaintext password into a storable digest.
    fn hash(&self, password: &str) -> Result<String, CmsError>;

    /// Check a plaintext password against a stored digest. A malformed
    /// digest never verifies.
    fn verify(&self, password: &str, digest: &str) -> bool;
}

/// Run a (deliberately slow) verification on the blocking pool.
pub async fn verify_blocking(
    hasher: Arc<dyn PasswordHasher>,
    password: &str,
    digest: String,
) -> Result<bool, CmsError> {
    let password = password.to_string();
    tokio::task::spawn_blocking(move || hasher.verify(&password, &digest))
        .await
        .map_err(|e| CmsError::Internal(format!("Password verification panicked: {}", e)))
}

/// A throwaway digest verified against when the username is unknown, so a
/// miss costs the same hashing work as a wrong password.
///
/// The digest is computed up front; a rejection only pays for one verify.
pub struct TimingDecoy {
    hasher: Arc<dyn PasswordHasher>,
    digest: String,
}

impl TimingDecoy {
    pub fn new(hasher: Arc<dyn PasswordHasher>) -> Result<Self, CmsError> {
        let digest = hasher.hash("timing-decoy-password")?;
        Ok(Self { hasher, digest })
    }

    /// Burn one verification and report failure.
    pub async fn reject(&self, password: &str) -> Result<bool, CmsError> {
        verify_blocking(Arc::clone(&self.hasher), password, self.digest.clone()).await?;
        Ok(false)
    }
}

/// Username to password-hash store.
#[async_trait]
pub trait CredentialBackend: Send + Sync {
    /// Returns the backend identifier (e.g., "file", "memory").
    fn backend_name(&self) -> &'static str;

    /// All registered usernames.
    async fn usernames(&self) -> Result<Vec<String>, CmsError>;

    /// Whether `password` matches the stored hash for `username`.
    ///
    /// Unknown users yield `false`, taking about as long as a wrong password.
    async fn verify(&self, username: &str, password: &str) -> Result<bool, CmsError>;

    /// Hash and persist a new credential. Callers validate first with
    /// [`validate_signup`]; the store does not re-check.
    async fn add(&self, username: &str, password: &str) -> Result<(), CmsError>;
}

/// Check a signup request. Failures in priority order: empty username,
/// duplicate username, weak password.
pub fn validate_signup<S: AsRef<str>>(
    username: &str,
    password: &str,
    existing: &[S],
) -> Result<(), CmsError> {
    if username.trim().is_empty() {
        return Err(CmsError::EmptyUsername);
    }
    if existing.iter().any(|u| u.as_ref() == username) {
        return Err(CmsError::DuplicateUsername(username.to_string()));
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(CmsError::WeakPassword);
    }
    Ok(())
}
