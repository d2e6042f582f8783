use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;

/// Per-document write locks.
///
/// Writers to the same name queue on one async mutex; writers to different
/// names never contend. Readers take no lock: writes land via rename, so a
/// reader always sees a whole file.
#[derive(Debug, Default)]
pub struct NameLocks {
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl NameLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive write access to `name`. Dropping the guard
    /// releases it.
    pub async fn acquire(&self, name: &str) -> OwnedMutexGuard<()> {
        let lock = self.locks.entry(name.to_string()).or_default().clone();
        let guard = lock.lock_owned().await;
        debug!("Acquired write lock on {}", name);
        guard
    }

    /// Number of names that have ever been locked.
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}
