//! Local filesystem backends for the cms document service.
//!
//! - `LocalDocumentStore`: one flat directory of `.txt` / `.md` files
//! - `FileCredentialStore`: a JSON credential file with Argon2id hashes
//! - `NameLocks`: per-document write serialization

mod credentials;
mod lock;
mod storage;

pub use credentials::{Argon2Hasher, FileCredentialStore};
pub use lock::NameLocks;
pub use storage::LocalDocumentStore;
