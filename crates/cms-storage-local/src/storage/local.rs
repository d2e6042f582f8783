use std::path::{Path, PathBuf};

use async_trait::async_trait;
use cms_core::{is_document_name, CmsError, Document, DocumentBackend};
use tokio::fs;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use crate::lock::NameLocks;

/// Local filesystem document store.
///
/// Documents are the direct entries of one directory:
/// ```text
/// {data_dir}/
///   about.md
///   changes.txt
///   .{name}.{uuid}.tmp    (in-flight writes, never listed)
/// ```
#[derive(Debug)]
pub struct LocalDocumentStore {
    data_dir: PathBuf,
    locks: NameLocks,
}

impl LocalDocumentStore {
    /// Create a new LocalDocumentStore over the given directory.
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        Self {
            data_dir: data_dir.as_ref().to_path_buf(),
            locks: NameLocks::new(),
        }
    }

    /// Path of a document, or `None` if the name cannot address one.
    fn document_path(&self, name: &str) -> Option<PathBuf> {
        is_document_name(name).then(|| self.data_dir.join(name))
    }

    /// Hidden sibling used to stage a write.
    fn temp_path(&self, name: &str) -> PathBuf {
        self.data_dir
            .join(format!(".{}.{}.tmp", name, Uuid::new_v4().simple()))
    }

    /// Ensure the data directory exists.
    async fn ensure_data_dir(&self) -> Result<(), CmsError> {
        fs::create_dir_all(&self.data_dir).await.map_err(|e| {
            CmsError::Storage(format!(
                "Failed to create data dir {}: {}",
                self.data_dir.display(),
                e
            ))
        })
    }

    /// Stage `content` in a temp file and rename it over `path`.
    /// Callers hold the name's write lock.
    async fn write_atomic(&self, name: &str, path: &Path, content: &str) -> Result<(), CmsError> {
        let temp_path = self.temp_path(name);
        fs::write(&temp_path, content).await.map_err(|e| {
            CmsError::Storage(format!("Failed to write {}: {}", temp_path.display(), e))
        })?;

        if let Err(e) = fs::rename(&temp_path, path).await {
            if let Err(cleanup) = fs::remove_file(&temp_path).await {
                warn!("Failed to remove temp file {}: {}", temp_path.display(), cleanup);
            }
            return Err(CmsError::Storage(format!(
                "Failed to rename to {}: {}",
                path.display(),
                e
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentBackend for LocalDocumentStore {
    fn backend_name(&self) -> &'static str {
        "local"
    }

    #[instrument(skip(self), level = "debug")]
    async fn list(&self) -> Result<Vec<String>, CmsError> {
        let mut entries = match fs::read_dir(&self.data_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(vec![]),
            Err(e) => {
                return Err(CmsError::Storage(format!(
                    "Failed to read dir {}: {}",
                    self.data_dir.display(),
                    e
                )))
            }
        };

        let mut names = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| CmsError::Storage(format!("Failed to read dir entry: {}", e)))?
        {
            let file_type = entry
                .file_type()
                .await
                .map_err(|e| CmsError::Storage(format!("Failed to get file type: {}", e)))?;
            if !file_type.is_file() {
                continue;
            }

            match entry.file_name().into_string() {
                Ok(name) if is_document_name(&name) => names.push(name),
                _ => {}
            }
        }

        debug!("Listed {} documents", names.len());
        Ok(names)
    }

    #[instrument(skip(self), level = "debug")]
    async fn read(&self, name: &str) -> Result<Document, CmsError> {
        let path = self
            .document_path(name)
            .ok_or_else(|| CmsError::NotFound(name.to_string()))?;

        let bytes = match fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(CmsError::NotFound(name.to_string()))
            }
            Err(e) => {
                return Err(CmsError::Storage(format!(
                    "Failed to read {}: {}",
                    path.display(),
                    e
                )))
            }
        };

        let content = String::from_utf8(bytes)
            .map_err(|_| CmsError::Storage(format!("{} is not valid UTF-8 text", name)))?;
        debug!("Loaded {} ({} bytes)", name, content.len());

        Document::new(name, content).ok_or_else(|| CmsError::NotFound(name.to_string()))
    }

    #[instrument(skip(self, content), level = "debug", fields(content_len = content.len()))]
    async fn write(&self, name: &str, content: &str) -> Result<(), CmsError> {
        let path = self
            .document_path(name)
            .ok_or_else(|| CmsError::InvalidName(name.to_string()))?;
        self.ensure_data_dir().await?;

        let _guard = self.locks.acquire(name).await;
        self.write_atomic(name, &path, content).await?;

        debug!("Saved {} ({} bytes)", name, content.len());
        Ok(())
    }

    #[instrument(skip(self, content), level = "debug", fields(content_len = content.len()))]
    async fn create(&self, name: &str, content: &str) -> Result<(), CmsError> {
        let path = self
            .document_path(name)
            .ok_or_else(|| CmsError::InvalidName(name.to_string()))?;
        self.ensure_data_dir().await?;

        let _guard = self.locks.acquire(name).await;
        let taken = fs::try_exists(&path).await.map_err(|e| {
            CmsError::Storage(format!("Failed to stat {}: {}", path.display(), e))
        })?;
        if taken {
            return Err(CmsError::AlreadyExists(name.to_string()));
        }
        self.write_atomic(name, &path, content).await?;

        debug!("Created {} ({} bytes)", name, content.len());
        Ok(())
    }

    #[instrument(skip(self, content), level = "debug", fields(content_len = content.len()))]
    async fn replace(&self, name: &str, content: &str) -> Result<(), CmsError> {
        let path = self
            .document_path(name)
            .ok_or_else(|| CmsError::NotFound(name.to_string()))?;

        let _guard = self.locks.acquire(name).await;
        let present = fs::try_exists(&path).await.map_err(|e| {
            CmsError::Storage(format!("Failed to stat {}: {}", path.display(), e))
        })?;
        if !present {
            return Err(CmsError::NotFound(name.to_string()));
        }
        self.write_atomic(name, &path, content).await?;

        debug!("Replaced {} ({} bytes)", name, content.len());
        Ok(())
    }

    #[instrument(skip(self), level = "debug")]
    async fn delete(&self, name: &str) -> Result<(), CmsError> {
        let path = self
            .document_path(name)
            .ok_or_else(|| CmsError::NotFound(name.to_string()))?;

        let _guard = self.locks.acquire(name).await;
        match fs::remove_file(&path).await {
            Ok(()) => {
                debug!("Deleted {}", name);
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(CmsError::NotFound(name.to_string()))
            }
            Err(e) => Err(CmsError::Storage(format!(
                "Failed to delete {}: {}",
                path.display(),
                e
            ))),
        }
    }

    #[instrument(skip(self), level = "debug")]
    async fn exists(&self, name: &str) -> Result<bool, CmsError> {
        let Some(path) = self.document_path(name) else {
            return Ok(false);
        };
        match fs::metadata(&path).await {
            Ok(metadata) => Ok(metadata.is_file()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(CmsError::Storage(format!(
                "Failed to stat {}: {}",
                path.display(),
                e
            ))),
        }
    }
}
