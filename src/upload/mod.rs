//! Upload side: folder resolution and dispatch of inbound payloads.
//!
//! Every upload lands in `root / category / YYYY-MM-DD / classification`,
//! with each level found or created on demand.

mod dispatcher;
mod resolver;
mod staged;

pub use dispatcher::{UploadDispatcher, UploadRequest, UploadResult};
pub use resolver::{validate_folder_name, FolderResolver, MAX_FOLDER_NAME_LENGTH};
pub use staged::StagedUpload;
