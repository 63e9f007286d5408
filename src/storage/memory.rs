//! In-process [`RemoteStorage`] backend.
//!
//! Keeps entries in memory and counts every remote call, which makes it the
//! test double for the poller, the resolver and the dispatcher.

use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Duration, TimeZone, Utc};
use futures::stream;
use tokio::io::AsyncReadExt;

use super::{
    ByteStream, ListQuery, NewEntry, RemoteEntry, RemoteStorage, SortOrder, UploadBody,
    FOLDER_MIME_TYPE,
};
use crate::{Result, SyncError};

/// Number of calls made against a [`MemoryStorage`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallCounts {
    /// `list` calls.
    pub list: usize,
    /// `create` calls.
    pub create: usize,
    /// `download` calls.
    pub download: usize,
}

impl CallCounts {
    /// Total number of remote calls.
    pub fn total(&self) -> usize {
        self.list + self.create + self.download
    }
}

#[derive(Debug, Clone)]
struct StoredEntry {
    entry: RemoteEntry,
    parent_id: String,
    content: Vec<u8>,
    trashed: bool,
}

#[derive(Debug, Default)]
struct MemoryState {
    entries: Vec<StoredEntry>,
    next_id: u64,
    calls: CallCounts,
    failing_downloads: HashSet<String>,
    fail_creates: Option<String>,
}

/// Remote storage held in memory.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    state: Mutex<MemoryState>,
}

fn epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0)
        .single()
        .unwrap_or_default()
}

impl MemoryStorage {
    /// Create an empty storage.
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn insert(
        state: &mut MemoryState,
        parent_id: &str,
        name: &str,
        mime_type: &str,
        content: Vec<u8>,
    ) -> RemoteEntry {
        state.next_id += 1;
        let id = format!("mem-{}", state.next_id);
        // Strictly increasing creation times keep listing order deterministic
        let created_time = epoch() + Duration::seconds(state.next_id as i64);
        let entry = RemoteEntry {
            web_view_link: Some(format!("memory://{id}")),
            id,
            name: name.to_string(),
            mime_type: mime_type.to_string(),
            created_time: Some(created_time),
        };
        state.entries.push(StoredEntry {
            entry: entry.clone(),
            parent_id: parent_id.to_string(),
            content,
            trashed: false,
        });
        entry
    }

    /// Seed a file under `parent_id` without counting a call.
    pub fn add_file(&self, parent_id: &str, name: &str, content: impl Into<Vec<u8>>) -> String {
        let mut state = self.state();
        Self::insert(
            &mut state,
            parent_id,
            name,
            "application/octet-stream",
            content.into(),
        )
        .id
    }

    /// Seed a folder under `parent_id` without counting a call.
    pub fn add_folder(&self, parent_id: &str, name: &str) -> String {
        let mut state = self.state();
        Self::insert(&mut state, parent_id, name, FOLDER_MIME_TYPE, Vec::new()).id
    }

    /// Move an entry to the trash.
    pub fn trash(&self, id: &str) {
        let mut state = self.state();
        if let Some(stored) = state.entries.iter_mut().find(|e| e.entry.id == id) {
            stored.trashed = true;
        }
    }

    /// Make downloads of entries named `name` fail mid-stream.
    pub fn fail_downloads_of(&self, name: &str) {
        self.state().failing_downloads.insert(name.to_string());
    }

    /// Make every subsequent `create` fail with `message`.
    pub fn fail_creates(&self, message: &str) {
        self.state().fail_creates = Some(message.to_string());
    }

    /// Calls made so far.
    pub fn calls(&self) -> CallCounts {
        self.state().calls
    }

    /// Non-trashed entries directly under `parent_id`, in creation order.
    pub fn children(&self, parent_id: &str) -> Vec<RemoteEntry> {
        self.state()
            .entries
            .iter()
            .filter(|e| !e.trashed && e.parent_id == parent_id)
            .map(|e| e.entry.clone())
            .collect()
    }

    /// Content of the entry `id`.
    pub fn content(&self, id: &str) -> Option<Vec<u8>> {
        self.state()
            .entries
            .iter()
            .find(|e| e.entry.id == id)
            .map(|e| e.content.clone())
    }

    /// Total number of entries, trashed ones included.
    pub fn len(&self) -> usize {
        self.state().entries.len()
    }

    /// Whether the storage holds no entries at all.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl RemoteStorage for MemoryStorage {
    async fn list(&self, query: &ListQuery) -> Result<Vec<RemoteEntry>> {
        // Let concurrent callers interleave between list and create
        tokio::task::yield_now().await;

        let mut state = self.state();
        state.calls.list += 1;

        let mut entries: Vec<RemoteEntry> = state
            .entries
            .iter()
            .filter(|e| !e.trashed && e.parent_id == query.parent_id)
            .filter(|e| query.name.as_ref().map_or(true, |n| &e.entry.name == n))
            .filter(|e| {
                query
                    .mime_type
                    .as_ref()
                    .map_or(true, |m| &e.entry.mime_type == m)
            })
            .map(|e| e.entry.clone())
            .collect();

        entries.sort_by_key(|e| e.created_time);
        if query.order == SortOrder::NewestFirst {
            entries.reverse();
        }
        Ok(entries)
    }

    async fn create(&self, entry: &NewEntry, body: Option<UploadBody>) -> Result<RemoteEntry> {
        let content = match body {
            Some(mut body) => {
                let mut buf = Vec::with_capacity(body.len as usize);
                body.file.read_to_end(&mut buf).await?;
                buf
            }
            None => Vec::new(),
        };

        tokio::task::yield_now().await;

        let mut state = self.state();
        state.calls.create += 1;

        if let Some(message) = state.fail_creates.clone() {
            return Err(SyncError::Remote {
                status: Some(500),
                message,
            });
        }

        let mime_type = entry
            .mime_type
            .clone()
            .unwrap_or_else(|| "application/octet-stream".to_string());
        Ok(Self::insert(
            &mut state,
            &entry.parent_id,
            &entry.name,
            &mime_type,
            content,
        ))
    }

    async fn download(&self, id: &str) -> Result<ByteStream> {
        let mut state = self.state();
        state.calls.download += 1;

        let stored = state
            .entries
            .iter()
            .find(|e| e.entry.id == id && !e.trashed)
            .cloned()
            .ok_or_else(|| SyncError::Remote {
                status: Some(404),
                message: format!("File not found: {id}"),
            })?;

        let content = Bytes::from(stored.content);
        let chunks: Vec<std::io::Result<Bytes>> =
            if state.failing_downloads.contains(&stored.entry.name) {
                // Deliver some bytes before failing so a partial file gets written
                vec![
                    Ok(content.slice(..content.len() / 2)),
                    Err(std::io::Error::other("connection reset")),
                ]
            } else {
                let mid = content.len() / 2;
                vec![Ok(content.slice(..mid)), Ok(content.slice(mid..))]
            };

        Ok(Box::pin(stream::iter(chunks)))
    }
}
