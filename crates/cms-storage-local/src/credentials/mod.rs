mod argon;
mod file;

pub use argon::Argon2Hasher;
pub use file::FileCredentialStore;
