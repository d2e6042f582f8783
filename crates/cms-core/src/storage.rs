use async_trait::async_trait;

use crate::document::Document;
use crate::error::CmsError;
use crate::validation::validate_for_create;

/// Document repository over a single flat namespace.
///
/// Every write is all-or-nothing from the point of view of concurrent
/// readers, and writers to one name are serialized.
#[async_trait]
pub trait DocumentBackend: Send + Sync {
    /// Returns the backend identifier (e.g., "local", "memory").
    fn backend_name(&self) -> &'static str;

    /// Names of all stored documents, in no particular order.
    async fn list(&self) -> Result<Vec<String>, CmsError>;

    /// Load a document. Fails with `NotFound` if absent.
    async fn read(&self, name: &str) -> Result<Document, CmsError>;

    /// Create or replace a document's entire content.
    async fn write(&self, name: &str, content: &str) -> Result<(), CmsError>;

    /// Create a document, failing with `AlreadyExists` if the name is taken.
    async fn create(&self, name: &str, content: &str) -> Result<(), CmsError>;

    /// Replace the content of an existing document, failing with `NotFound`
    /// if it is absent. The existence check and the write are atomic with
    /// respect to other writers and deleters of the same name.
    async fn replace(&self, name: &str, content: &str) -> Result<(), CmsError>;

    /// Remove a document. Fails with `NotFound` if absent.
    async fn delete(&self, name: &str) -> Result<(), CmsError>;

    /// Check if a document exists.
    async fn exists(&self, name: &str) -> Result<bool, CmsError>;

    /// Copy `source` verbatim into a new document named `destination`.
    ///
    /// A missing source is reported before any problem with the destination
    /// name. The source is never modified.
    async fn duplicate(&self, source: &str, destination: &str) -> Result<(), CmsError> {
        let original = self.read(source).await?;
        let existing = self.list().await?;
        validate_for_create(destination, &existing)?;
        self.create(destination, &original.content).await
    }
}
