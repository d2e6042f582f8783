//! In-memory backends for tests and embedding.
//!
//! Both stores keep their data in a `BTreeMap` behind a `tokio::sync::RwLock`.
//! Data is lost when the store is dropped.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::credentials::{verify_blocking, CredentialBackend, PasswordHasher, TimingDecoy};
use crate::document::{is_document_name, Document};
use crate::error::CmsError;
use crate::storage::DocumentBackend;

/// An in-memory implementation of [`DocumentBackend`].
#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    documents: RwLock<BTreeMap<String, String>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn check_name(name: &str) -> Result<(), CmsError> {
        if is_document_name(name) {
            Ok(())
        } else {
            Err(CmsError::InvalidName(name.to_string()))
        }
    }
}

#[async_trait]
impl DocumentBackend for MemoryDocumentStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn list(&self) -> Result<Vec<String>, CmsError> {
        Ok(self.documents.read().await.keys().cloned().collect())
    }

    async fn read(&self, name: &str) -> Result<Document, CmsError> {
        let documents = self.documents.read().await;
        documents
            .get(name)
            .and_then(|content| Document::new(name, content.as_str()))
            .ok_or_else(|| CmsError::NotFound(name.to_string()))
    }

    async fn write(&self, name: &str, content: &str) -> Result<(), CmsError> {
        Self::check_name(name)?;
        self.documents
            .write()
            .await
            .insert(name.to_string(), content.to_string());
        Ok(())
    }

    async fn create(&self, name: &str, content: &str) -> Result<(), CmsError> {
        Self::check_name(name)?;
        let mut documents = self.documents.write().await;
        if documents.contains_key(name) {
            return Err(CmsError::AlreadyExists(name.to_string()));
        }
        documents.insert(name.to_string(), content.to_string());
        Ok(())
    }

    async fn replace(&self, name: &str, content: &str) -> Result<(), CmsError> {
        let mut documents = self.documents.write().await;
        let current = documents
            .get_mut(name)
            .ok_or_else(|| CmsError::NotFound(name.to_string()))?;
        *current = content.to_string();
        Ok(())
    }

    async fn delete(&self, name: &str) -> Result<(), CmsError> {
        self.documents
            .write()
            .await
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| CmsError::NotFound(name.to_string()))
    }

    async fn exists(&self, name: &str) -> Result<bool, CmsError> {
        Ok(self.documents.read().await.contains_key(name))
    }
}

/// An in-memory implementation of [`CredentialBackend`].
pub struct MemoryCredentialStore {
    users: RwLock<BTreeMap<String, String>>,
    hasher: Arc<dyn PasswordHasher>,
    decoy: TimingDecoy,
}

impl MemoryCredentialStore {
    pub fn new(hasher: Arc<dyn PasswordHasher>) -> Result<Self, CmsError> {
        Ok(Self {
            users: RwLock::new(BTreeMap::new()),
            decoy: TimingDecoy::new(Arc::clone(&hasher))?,
            hasher,
        })
    }
}

#[async_trait]
impl CredentialBackend for MemoryCredentialStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn usernames(&self) -> Result<Vec<String>, CmsError> {
        Ok(self.users.read().await.keys().cloned().collect())
    }

    async fn verify(&self, username: &str, password: &str) -> Result<bool, CmsError> {
        let digest = self.users.read().await.get(username).cloned();
        match digest {
            Some(digest) => verify_blocking(Arc::clone(&self.hasher), password, digest).await,
            None => self.decoy.reject(password).await,
        }
    }

    async fn add(&self, username: &str, password: &str) -> Result<(), CmsError> {
        let digest = self.hasher.hash(password)?;
        self.users.write().await.insert(username.to_string(), digest);
        Ok(())
    }
}

/// Cheap, insecure hasher for unit tests.
#[cfg(test)]
pub(crate) struct ReversingHasher;

#[cfg(test)]
impl PasswordHasher for ReversingHasher {
    fn hash(&self, password: &str) -> Result<String, CmsError> {
        Ok(format!("rev${}", password.chars().rev().collect::<String>()))
    }

    fn verify(&self, password: &str, digest: &str) -> bool {
        self.hash(password).is_ok_and(|d| d == digest)
    }
}
