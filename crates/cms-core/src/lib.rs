//! Core types, policies and traits for the cms document service.
//!
//! This crate is transport agnostic. It defines:
//! - `DocumentBackend`: list, read, write, delete and duplicate documents
//! - `CredentialBackend` / `PasswordHasher`: signup and signin
//! - `AccessGuard`: the session-derived authorization check
//! - `CmsService`: the boundary operations composed from the above

mod credentials;
mod document;
mod error;
pub mod markdown;
mod memory;
mod service;
mod session;
mod storage;
mod validation;

pub use credentials::{
    validate_signup, verify_blocking, CredentialBackend, PasswordHasher, TimingDecoy,
    MIN_PASSWORD_LEN,
};
pub use document::{
    extension, is_document_name, Document, DocumentKind, RenderedDocument, ALLOWED_EXTENSIONS,
};
pub use error::{CmsError, Disposition, Result};
pub use memory::{MemoryCredentialStore, MemoryDocumentStore};
pub use service::CmsService;
pub use session::{AccessGuard, AuthState, Session, SIGNED_OUT_MESSAGE, WELCOME_MESSAGE};
pub use storage::DocumentBackend;
pub use validation::{validate_for_create, NameValidationError};
