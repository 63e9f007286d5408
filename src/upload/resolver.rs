//! Find-or-create resolution of nested remote folders.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, Weak};

use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, info};

use crate::storage::{FolderHandle, ListQuery, NewEntry, RemoteStorage};
use crate::{Result, SyncError};

/// Maximum folder name length in bytes.
pub const MAX_FOLDER_NAME_LENGTH: usize = 255;

/// Check that `name` can be used as a single remote folder name.
pub fn validate_folder_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(SyncError::Validation(
            "folder name must not be empty".to_string(),
        ));
    }
    if name.len() > MAX_FOLDER_NAME_LENGTH {
        return Err(SyncError::Validation(format!(
            "folder name too long ({} bytes, max {})",
            name.len(),
            MAX_FOLDER_NAME_LENGTH
        )));
    }
    if name.contains('/') || name.chars().any(|c| c.is_control()) {
        return Err(SyncError::Validation(format!(
            "invalid folder name: {name:?}"
        )));
    }
    Ok(())
}

type LockKey = (String, String);

/// Resolves folder names under a parent, creating missing folders.
///
/// Find-then-create for the same `(parent, name)` pair is serialized inside
/// this resolver, so concurrent requests sharing one resolver never create
/// duplicate folders. Separate processes are not coordinated.
pub struct FolderResolver {
    storage: Arc<dyn RemoteStorage>,
    locks: Mutex<HashMap<LockKey, Weak<AsyncMutex<()>>>>,
}

impl FolderResolver {
    /// Create a resolver on top of `storage`.
    pub fn new(storage: Arc<dyn RemoteStorage>) -> Self {
        Self {
            storage,
            locks: Mutex::new(HashMap::new()),
        }
    }

    fn lock_for(&self, parent_id: &str, name: &str) -> Arc<AsyncMutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        locks.retain(|_, lock| lock.strong_count() > 0);

        let key = (parent_id.to_string(), name.to_string());
        if let Some(lock) = locks.get(&key).and_then(Weak::upgrade) {
            return lock;
        }

        let lock = Arc::new(AsyncMutex::new(()));
        locks.insert(key, Arc::downgrade(&lock));
        lock
    }

    /// Return the folder named `name` directly under `parent_id`, creating it if absent.
    pub async fn resolve(&self, parent_id: &str, name: &str) -> Result<FolderHandle> {
        validate_folder_name(name)?;

        let lock = self.lock_for(parent_id, name);
        let _guard = lock.lock().await;

        let existing = self
            .storage
            .list(&ListQuery::folders_named(parent_id, name))
            .await?;

        // With pre-existing duplicates the oldest folder wins
        if let Some(folder) = existing.into_iter().next() {
            debug!(parent = %parent_id, name = %name, id = %folder.id, "Folder found");
            return Ok(FolderHandle {
                id: folder.id,
                name: folder.name,
                parent_id: parent_id.to_string(),
            });
        }

        let created = self
            .storage
            .create(&NewEntry::folder(name, parent_id), None)
            .await?;
        info!(parent = %parent_id, name = %name, id = %created.id, "Folder created");

        Ok(FolderHandle {
            id: created.id,
            name: created.name,
            parent_id: parent_id.to_string(),
        })
    }

    /// Resolve each segment in turn under `root_id` and return the innermost folder.
    pub async fn resolve_path<S: AsRef<str>>(
        &self,
        root_id: &str,
        segments: &[S],
    ) -> Result<FolderHandle> {
        let mut current: Option<FolderHandle> = None;

        for segment in segments {
            let parent_id = current.as_ref().map_or(root_id, |f| f.id.as_str());
            let folder = self.resolve(parent_id, segment.as_ref()).await?;
            current = Some(folder);
        }

        current.ok_or_else(|| SyncError::Validation("folder path is empty".to_string()))
    }
}
