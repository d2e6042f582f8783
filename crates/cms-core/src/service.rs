//! Boundary operations of the document service.
//!
//! Every mutating operation checks the session with [`AccessGuard`] before it
//! looks at any other argument, so anonymous callers always see
//! `Unauthorized`.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use crate::credentials::{validate_signup, CredentialBackend};
use crate::document::{Document, RenderedDocument};
use crate::error::CmsError;
use crate::session::{AccessGuard, Session};
use crate::storage::DocumentBackend;
use crate::validation::validate_for_create;

/// Front door for the transport layer.
#[derive(Clone)]
pub struct CmsService {
    documents: Arc<dyn DocumentBackend>,
    credentials: Arc<dyn CredentialBackend>,
    /// Serializes signup validation with the add that follows it.
    signup_gate: Arc<Mutex<()>>,
}

impl CmsService {
    pub fn new(
        documents: Arc<dyn DocumentBackend>,
        credentials: Arc<dyn CredentialBackend>,
    ) -> Self {
        Self {
            documents,
            credentials,
            signup_gate: Arc::new(Mutex::new(())),
        }
    }

    pub fn documents(&self) -> &Arc<dyn DocumentBackend> {
        &self.documents
    }

    // =========================================================================
    // Documents
    // =========================================================================

    /// All document names, sorted.
    pub async fn list_documents(&self) -> Result<Vec<String>, CmsError> {
        let mut names = self.documents.list().await?;
        names.sort();
        Ok(names)
    }

    /// View a document. Open to anonymous visitors.
    #[instrument(skip(self), level = "debug")]
    pub async fn read_document(&self, name: &str) -> Result<RenderedDocument, CmsError> {
        let document = self.documents.read(name).await?;
        Ok(document.render())
    }

    /// Load raw content for the edit form.
    #[instrument(skip(self, session), level = "debug")]
    pub async fn edit_document(&self, session: &Session, name: &str) -> Result<Document, CmsError> {
        AccessGuard::require_signed_in(session)?;
        self.documents.read(name).await
    }

    /// Create an empty document.
    #[instrument(skip(self, session), level = "debug")]
    pub async fn create_document(&self, session: &mut Session, name: &str) -> Result<(), CmsError> {
        let user = AccessGuard::require_signed_in(session)?.to_string();

        let existing = self.documents.list().await?;
        validate_for_create(name, &existing)?;
        self.documents.create(name, "").await?;

        info!("{} created {}", user, name);
        session.flash(format!("{} was created.", name));
        Ok(())
    }

    /// Replace a document's content. The document must already exist.
    #[instrument(skip(self, session, content), level = "debug", fields(content_len = content.len()))]
    pub async fn update_document(
        &self,
        session: &mut Session,
        name: &str,
        content: &str,
    ) -> Result<(), CmsError> {
        let user = AccessGuard::require_signed_in(session)?.to_string();

        self.documents.replace(name, content).await?;

        info!("{} updated {}", user, name);
        session.flash(format!("{} has been updated.", name));
        Ok(())
    }

    #[instrument(skip(self, session), level = "debug")]
    pub async fn delete_document(&self, session: &mut Session, name: &str) -> Result<(), CmsError> {
        let user = AccessGuard::require_signed_in(session)?.to_string();

        self.documents.delete(name).await?;

        info!("{} deleted {}", user, name);
        session.flash(format!("{} was deleted.", name));
        Ok(())
    }

    #[instrument(skip(self, session), level = "debug")]
    pub async fn duplicate_document(
        &self,
        session: &mut Session,
        source: &str,
        destination: &str,
    ) -> Result<(), CmsError> {
        let user = AccessGuard::require_signed_in(session)?.to_string();

        self.documents.duplicate(source, destination).await?;

        info!("{} duplicated {} as {}", user, source, destination);
        session.flash(format!("{} was created from {}.", destination, source));
        Ok(())
    }

    // =========================================================================
    // Users
    // =========================================================================

    /// Check credentials and authenticate the session.
    ///
    /// Unknown users and wrong passwords produce the same error.
    #[instrument(skip(self, session, password), level = "debug")]
    pub async fn sign_in(
        &self,
        session: &mut Session,
        username: &str,
        password: &str,
    ) -> Result<(), CmsError> {
        if !self.credentials.verify(username, password).await? {
            warn!("Failed sign-in attempt");
            return Err(CmsError::InvalidCredentials);
        }
        AccessGuard::sign_in(session, username);
        info!("{} signed in", username);
        Ok(())
    }

    pub fn sign_out(&self, session: &mut Session) {
        if let Some(username) = session.username.as_deref() {
            debug!("{} signed out", username);
        }
        AccessGuard::sign_out(session);
    }

    /// Register a new user and sign them in.
    #[instrument(skip(self, session, password), level = "debug")]
    pub async fn sign_up(
        &self,
        session: &mut Session,
        username: &str,
        password: &str,
    ) -> Result<(), CmsError> {
        {
            let _gate = self.signup_gate.lock().await;
            let existing = self.credentials.usernames().await?;
            validate_signup(username, password, &existing)?;
            self.credentials.add(username, password).await?;
        }

        info!("Registered user {}", username);
        AccessGuard::sign_in(session, username);
        Ok(())
    }
}
