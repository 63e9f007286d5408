//! Shared helpers for integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use drivesync::config::Config;
use drivesync::storage::MemoryStorage;
use drivesync::upload::{FolderResolver, UploadDispatcher};

/// Root folder id used by the tests.
pub const ROOT: &str = "root";

/// Configuration pointing at [`ROOT`].
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.drive.root_folder_id = ROOT.to_string();
    config
}

/// A dispatcher over a fresh in-memory storage.
pub fn create_dispatcher(config: &Config) -> (Arc<MemoryStorage>, Arc<UploadDispatcher>) {
    let storage = Arc::new(MemoryStorage::new());
    let resolver = Arc::new(FolderResolver::new(storage.clone()));
    let dispatcher = Arc::new(UploadDispatcher::new(storage.clone(), resolver, config));
    (storage, dispatcher)
}

/// Walk `names` from `parent_id` and return the id of the last folder.
pub fn folder_path(storage: &MemoryStorage, parent_id: &str, names: &[&str]) -> Option<String> {
    let mut current = parent_id.to_string();
    for name in names {
        let matches: Vec<_> = storage
            .children(&current)
            .into_iter()
            .filter(|e| e.is_folder() && e.name == *name)
            .collect();
        if matches.len() != 1 {
            return None;
        }
        current = matches[0].id.clone();
    }
    Some(current)
}
