//! Naming policy for new documents.

use crate::document::{is_flat_name, DocumentKind};
use crate::error::CmsError;

/// Why a candidate document name was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NameValidationError {
    EmptyName,
    /// Not a single, non-hidden file name.
    InvalidName(String),
    InvalidExtension(String),
    AlreadyExists(String),
}

impl From<NameValidationError> for CmsError {
    fn from(err: NameValidationError) -> Self {
        match err {
            NameValidationError::EmptyName => CmsError::EmptyName,
            NameValidationError::InvalidName(name) => CmsError::InvalidName(name),
            NameValidationError::InvalidExtension(name) => CmsError::InvalidExtension(name),
            NameValidationError::AlreadyExists(name) => CmsError::AlreadyExists(name),
        }
    }
}

/// Check whether `name` may be used for a new document.
///
/// Failures are reported in priority order: empty, malformed, bad
/// extension, taken. `existing` is the current listing of the store.
pub fn validate_for_create<S: AsRef<str>>(
    name: &str,
    existing: &[S],
) -> Result<(), NameValidationError> {
    if name.trim().is_empty() {
        return Err(NameValidationError::EmptyName);
    }
    if !is_flat_name(name) {
        return Err(NameValidationError::InvalidName(name.to_string()));
    }
    if DocumentKind::from_name(name).is_none() {
        return Err(NameValidationError::InvalidExtension(name.to_string()));
    }
    if existing.iter().any(|n| n.as_ref() == name) {
        return Err(NameValidationError::AlreadyExists(name.to_string()));
    }
    Ok(())
}
