//! Remote storage abstraction for drivesync.
//!
//! The mirror poller and the upload dispatcher only talk to the remote
//! service through [`RemoteStorage`]:
//! - list non-trashed entries under a parent, with name/type filters
//! - create a file or folder entry by metadata, optionally with a body
//! - fetch an entry's content as a byte stream

mod drive;
mod memory;
mod token;

use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::Stream;

use crate::Result;

pub use drive::{build_query, DriveClient};
pub use memory::{CallCounts, MemoryStorage};
pub use token::{token_provider_from_config, StaticToken, TokenFile, TokenProvider};

/// MIME type the Drive API uses for folders.
pub const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";

/// Byte stream returned by [`RemoteStorage::download`].
pub type ByteStream = Pin<Box<dyn Stream<Item = std::io::Result<Bytes>> + Send>>;

/// An entry (file or folder) owned by the remote storage service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteEntry {
    /// Opaque identifier.
    pub id: String,
    /// Entry name. Used as the key for local-presence checks.
    pub name: String,
    /// MIME type reported by the service.
    pub mime_type: String,
    /// Creation time, if reported.
    pub created_time: Option<DateTime<Utc>>,
    /// Shareable link, if reported.
    pub web_view_link: Option<String>,
}

impl RemoteEntry {
    /// Whether this entry is a folder.
    pub fn is_folder(&self) -> bool {
        self.mime_type == FOLDER_MIME_TYPE
    }
}

/// A resolved remote folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderHandle {
    /// Folder id.
    pub id: String,
    /// Folder name.
    pub name: String,
    /// Id of the folder it lives in.
    pub parent_id: String,
}

/// Ordering of a listing by creation time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    /// Most recently created first.
    #[default]
    NewestFirst,
    /// Oldest first.
    OldestFirst,
}

/// Filter for [`RemoteStorage::list`].
///
/// Trashed entries are always excluded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery {
    /// Parent folder id.
    pub parent_id: String,
    /// Exact name to match.
    pub name: Option<String>,
    /// Exact MIME type to match.
    pub mime_type: Option<String>,
    /// Ordering by creation time.
    pub order: SortOrder,
}

impl ListQuery {
    /// All non-trashed entries directly under `parent_id`, newest first.
    pub fn children_of(parent_id: impl Into<String>) -> Self {
        Self {
            parent_id: parent_id.into(),
            name: None,
            mime_type: None,
            order: SortOrder::NewestFirst,
        }
    }

    /// Folders named exactly `name` directly under `parent_id`, oldest first.
    pub fn folders_named(parent_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self::children_of(parent_id)
            .with_name(name)
            .with_mime_type(FOLDER_MIME_TYPE)
            .with_order(SortOrder::OldestFirst)
    }

    /// Match an exact name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Match an exact MIME type.
    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    /// Set the ordering.
    pub fn with_order(mut self, order: SortOrder) -> Self {
        self.order = order;
        self
    }
}

/// Metadata for a new remote entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEntry {
    /// Entry name.
    pub name: String,
    /// Parent folder id.
    pub parent_id: String,
    /// MIME type. `None` lets the service infer it.
    pub mime_type: Option<String>,
}

impl NewEntry {
    /// A folder named `name` under `parent_id`.
    pub fn folder(name: impl Into<String>, parent_id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parent_id: parent_id.into(),
            mime_type: Some(FOLDER_MIME_TYPE.to_string()),
        }
    }

    /// A file named `name` under `parent_id`.
    pub fn file(
        name: impl Into<String>,
        parent_id: impl Into<String>,
        mime_type: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            parent_id: parent_id.into(),
            mime_type: Some(mime_type.into()),
        }
    }
}

/// Content for a new file entry, read from a local file.
#[derive(Debug)]
pub struct UploadBody {
    /// Open handle positioned at the start of the content.
    pub file: tokio::fs::File,
    /// Content length in bytes.
    pub len: u64,
}

/// Remote object-storage operations.
#[async_trait]
pub trait RemoteStorage: Send + Sync {
    /// List non-trashed entries matching `query`.
    async fn list(&self, query: &ListQuery) -> Result<Vec<RemoteEntry>>;

    /// Create a file or folder entry.
    async fn create(&self, entry: &NewEntry, body: Option<UploadBody>) -> Result<RemoteEntry>;

    /// Fetch the content of the entry `id` as a byte stream.
    async fn download(&self, id: &str) -> Result<ByteStream>;
}
