use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use cms_core::{verify_blocking, CmsError, CredentialBackend, PasswordHasher, TimingDecoy};
use fs2::FileExt;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument};
use uuid::Uuid;

type CredentialMap = BTreeMap<String, String>;

/// Credentials persisted as one JSON object of username → password hash:
/// ```json
/// {
///   "admin": "$argon2id$v=19$m=19456,t=2,p=1$..."
/// }
/// ```
///
/// The file is read once at startup and rewritten wholesale on every add,
/// via temp file + rename while holding an exclusive OS lock on
/// `{file}.lock`.
pub struct FileCredentialStore {
    path: PathBuf,
    users: RwLock<CredentialMap>,
    hasher: Arc<dyn PasswordHasher>,
    decoy: TimingDecoy,
}

impl FileCredentialStore {
    /// Load a provisioned credential file.
    ///
    /// A missing or unparseable file is a configuration error: the store has
    /// to exist before the service starts.
    pub fn load(path: impl AsRef<Path>, hasher: Arc<dyn PasswordHasher>) -> Result<Self, CmsError> {
        let path = path.as_ref().to_path_buf();
        let json = std::fs::read_to_string(&path).map_err(|e| {
            CmsError::Config(format!(
                "Failed to read credentials file {}: {}",
                path.display(),
                e
            ))
        })?;
        let users: CredentialMap = serde_json::from_str(&json).map_err(|e| {
            CmsError::Config(format!(
                "Failed to parse credentials file {}: {}",
                path.display(),
                e
            ))
        })?;

        info!("Loaded {} credentials from {}", users.len(), path.display());
        Ok(Self {
            path,
            users: RwLock::new(users),
            decoy: TimingDecoy::new(Arc::clone(&hasher))?,
            hasher,
        })
    }

    /// Load the credential file, provisioning an empty one first if absent.
    pub fn create_or_load(
        path: impl AsRef<Path>,
        hasher: Arc<dyn PasswordHasher>,
    ) -> Result<Self, CmsError> {
        let path = path.as_ref();
        if !path.exists() {
            write_locked(path, &CredentialMap::new())?;
            info!("Provisioned empty credentials file {}", path.display());
        }
        Self::load(path, hasher)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn persist(&self, users: CredentialMap) -> Result<(), CmsError> {
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || write_locked(&path, &users))
            .await
            .map_err(|e| CmsError::Internal(format!("Credential writer panicked: {}", e)))?
    }
}

/// Rewrite the credential file atomically under its lock file.
fn write_locked(path: &Path, users: &CredentialMap) -> Result<(), CmsError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| {
            CmsError::Storage(format!("Failed to create dir {}: {}", parent.display(), e))
        })?;
    }

    let lock_file = open_lock_file(path)?;
    lock_file
        .lock_exclusive()
        .map_err(|e| CmsError::Storage(format!("Failed to lock credentials file: {}", e)))?;

    let json = serde_json::to_string_pretty(users)
        .map_err(|e| CmsError::Storage(format!("Failed to serialize credentials: {}", e)))?;

    let temp_path = path.with_extension(format!("{}.tmp", Uuid::new_v4().simple()));
    let result = std::fs::write(&temp_path, json)
        .and_then(|()| std::fs::rename(&temp_path, path))
        .map_err(|e| {
            let _ = std::fs::remove_file(&temp_path);
            CmsError::Storage(format!(
                "Failed to write credentials file {}: {}",
                path.display(),
                e
            ))
        });

    let _ = FileExt::unlock(&lock_file);
    result
}

fn open_lock_file(path: &Path) -> Result<File, CmsError> {
    let mut lock_name = path.file_name().unwrap_or_default().to_os_string();
    lock_name.push(".lock");
    let lock_path = path.with_file_name(lock_name);

    OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(&lock_path)
        .map_err(|e| {
            CmsError::Storage(format!(
                "Failed to open lock file {}: {}",
                lock_path.display(),
                e
            ))
        })
}

#[async_trait]
impl CredentialBackend for FileCredentialStore {
    fn backend_name(&self) -> &'static str {
        "file"
    }

    async fn usernames(&self) -> Result<Vec<String>, CmsError> {
        Ok(self.users.read().await.keys().cloned().collect())
    }

    #[instrument(skip(self, password), level = "debug")]
    async fn verify(&self, username: &str, password: &str) -> Result<bool, CmsError> {
        let digest = self.users.read().await.get(username).cloned();
        let Some(digest) = digest else {
            debug!("No credential for user");
            return self.decoy.reject(password).await;
        };

        verify_blocking(Arc::clone(&self.hasher), password, digest).await
    }

    #[instrument(skip(self, password), level = "debug")]
    async fn add(&self, username: &str, password: &str) -> Result<(), CmsError> {
        let hasher = Arc::clone(&self.hasher);
        let plaintext = password.to_string();
        let digest = tokio::task::spawn_blocking(move || hasher.hash(&plaintext))
            .await
            .map_err(|e| CmsError::Internal(format!("Password hashing panicked: {}", e)))??;

        let mut users = self.users.write().await;
        let mut updated = users.clone();
        updated.insert(username.to_string(), digest);
        self.persist(updated.clone()).await?;
        *users = updated;

        debug!("Persisted {} credentials", users.len());
        Ok(())
    }
}
