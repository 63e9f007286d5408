//! API handlers.

pub mod upload;

use std::sync::Arc;

use crate::config::WebConfig;
use crate::upload::UploadDispatcher;

pub use upload::{sanitize_filename, upload};

/// Shared state for the API handlers.
pub struct AppState {
    /// Dispatcher that places uploads into remote storage.
    pub dispatcher: Arc<UploadDispatcher>,
    /// Maximum accepted file size in bytes.
    pub max_upload_size: u64,
}

impl AppState {
    /// Create the handler state.
    pub fn new(dispatcher: Arc<UploadDispatcher>, config: &WebConfig) -> Self {
        Self {
            dispatcher,
            max_upload_size: config.max_upload_size_bytes(),
        }
    }

    /// Override the maximum upload size.
    pub fn with_max_upload_size(mut self, bytes: u64) -> Self {
        self.max_upload_size = bytes;
        self
    }
}
