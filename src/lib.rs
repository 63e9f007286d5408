//! drivesync - Google Drive folder mirror and upload dispatcher.
//!
//! One direction polls a remote folder and downloads new files into a local
//! directory. The other accepts uploads over HTTP and files them under
//! `root / category / date / classification`, creating folders as needed.

pub mod config;
pub mod datetime;
pub mod error;
pub mod logging;
pub mod mirror;
pub mod storage;
pub mod upload;
pub mod web;

pub use config::Config;
pub use error::{Result, SyncError};
pub use mirror::{start_mirror_poller, MirrorPoller, PollFailure, PollReport};
pub use storage::{
    DriveClient, FolderHandle, ListQuery, MemoryStorage, NewEntry, RemoteEntry, RemoteStorage,
    TokenProvider,
};
pub use upload::{FolderResolver, StagedUpload, UploadDispatcher, UploadRequest, UploadResult};
pub use web::WebServer;
