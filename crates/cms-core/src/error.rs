use thiserror::Error;

/// Errors produced by the document service.
///
/// Display strings are user-facing and are surfaced verbatim as flash
/// messages or form errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CmsError {
    #[error("{0} does not exist.")]
    NotFound(String),

    #[error("A valid name is required.")]
    EmptyName,

    #[error("A valid name is required.")]
    InvalidName(String),

    #[error("A valid name is required.")]
    InvalidExtension(String),

    #[error("{0} already exists.")]
    AlreadyExists(String),

    #[error("You must be signed in to do that.")]
    Unauthorized,

    #[error("Invalid credentials.")]
    InvalidCredentials,

    #[error("A username is required.")]
    EmptyUsername,

    #[error("The username {0} is already taken.")]
    DuplicateUsername(String),

    #[error("Passwords must be at least {min} characters long.", min = crate::credentials::MIN_PASSWORD_LEN)]
    WeakPassword,

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// How the outer layer should recover from an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Send the visitor back to the index with the message flashed.
    Redirect,
    /// Re-display the submitted form with the message.
    Rerender,
    /// Not recoverable for this request.
    Fatal,
}

impl CmsError {
    pub fn disposition(&self) -> Disposition {
        match self {
            CmsError::NotFound(_) | CmsError::Unauthorized => Disposition::Redirect,
            CmsError::EmptyName
            | CmsError::InvalidName(_)
            | CmsError::InvalidExtension(_)
            | CmsError::AlreadyExists(_)
            | CmsError::InvalidCredentials
            | CmsError::EmptyUsername
            | CmsError::DuplicateUsername(_)
            | CmsError::WeakPassword => Disposition::Rerender,
            CmsError::Storage(_) | CmsError::Config(_) | CmsError::Internal(_) => {
                Disposition::Fatal
            }
        }
    }

    /// Stable machine-readable code for API clients.
    pub fn code(&self) -> &'static str {
        match self {
            CmsError::NotFound(_) => "NOT_FOUND",
            CmsError::EmptyName => "EMPTY_NAME",
            CmsError::InvalidName(_) => "INVALID_NAME",
            CmsError::InvalidExtension(_) => "INVALID_EXTENSION",
            CmsError::AlreadyExists(_) => "ALREADY_EXISTS",
            CmsError::Unauthorized => "UNAUTHORIZED",
            CmsError::InvalidCredentials => "INVALID_CREDENTIALS",
            CmsError::EmptyUsername => "EMPTY_USERNAME",
            CmsError::DuplicateUsername(_) => "DUPLICATE_USERNAME",
            CmsError::WeakPassword => "WEAK_PASSWORD",
            CmsError::Storage(_) => "STORAGE_ERROR",
            CmsError::Config(_) => "CONFIG_ERROR",
            CmsError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

pub type Result<T> = std::result::Result<T, CmsError>;
