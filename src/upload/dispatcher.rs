//! Upload dispatcher: places an uploaded payload into
//! `root / category / date bucket / classification`.

use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use super::resolver::{validate_folder_name, FolderResolver};
use super::staged::StagedUpload;
use crate::config::Config;
use crate::datetime::today_bucket;
use crate::storage::{NewEntry, RemoteStorage};
use crate::{Result, SyncError};

/// One inbound upload.
#[derive(Debug, Default)]
pub struct UploadRequest {
    /// Staged payload, `None` when the request carried no file.
    pub payload: Option<StagedUpload>,
    /// Classification tag (e.g., a print size such as "4x6").
    pub classification: Option<String>,
}

impl UploadRequest {
    /// Request for `payload` with an optional classification.
    pub fn new(payload: StagedUpload, classification: Option<String>) -> Self {
        Self {
            payload: Some(payload),
            classification,
        }
    }
}

/// The created remote file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadResult {
    /// Remote id.
    pub id: String,
    /// Remote name.
    pub name: String,
    /// Shareable link, when the service returns one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

/// Resolves the target folder for an upload and creates the file in it.
pub struct UploadDispatcher {
    storage: Arc<dyn RemoteStorage>,
    resolver: Arc<FolderResolver>,
    root_folder_id: Option<String>,
    category: String,
    default_classification: String,
    timezone: String,
}

impl UploadDispatcher {
    /// Create a dispatcher.
    ///
    /// `resolver` should be shared by every dispatcher using the same
    /// storage so folder creation stays serialized.
    pub fn new(
        storage: Arc<dyn RemoteStorage>,
        resolver: Arc<FolderResolver>,
        config: &Config,
    ) -> Self {
        let root = config.drive.root_folder_id.trim();
        Self {
            storage,
            resolver,
            root_folder_id: (!root.is_empty()).then(|| root.to_string()),
            category: config.upload.category.clone(),
            default_classification: config.upload.default_classification.clone(),
            timezone: config.upload.timezone.clone(),
        }
    }

    /// Dispatch using today's date bucket in the configured timezone.
    pub async fn dispatch(&self, request: UploadRequest) -> Result<UploadResult> {
        let date_bucket = today_bucket(&self.timezone);
        self.dispatch_on(request, &date_bucket).await
    }

    /// Dispatch into an explicit date bucket.
    ///
    /// The staged payload is owned by this call and removed when it returns,
    /// whether the upload succeeded or not.
    pub async fn dispatch_on(
        &self,
        request: UploadRequest,
        date_bucket: &str,
    ) -> Result<UploadResult> {
        let UploadRequest {
            payload,
            classification,
        } = request;

        let root_id = self
            .root_folder_id
            .as_deref()
            .ok_or_else(|| SyncError::Config("root folder id is not configured".to_string()))?;

        let mut payload = payload
            .filter(|p| !p.is_empty())
            .ok_or(SyncError::MissingFile)?;

        let classification = self.classification_for(classification.as_deref())?;

        let folder = self
            .resolver
            .resolve_path(root_id, &[self.category.as_str(), date_bucket, classification])
            .await?;

        let body = payload.open_body().await?;
        let entry = NewEntry::file(payload.filename(), &folder.id, payload.mime_type());
        let created = self.storage.create(&entry, Some(body)).await?;

        info!(
            id = %created.id,
            name = %created.name,
            folder = %folder.id,
            bytes = payload.size(),
            "Upload stored in {}/{}/{}",
            self.category,
            date_bucket,
            classification
        );

        Ok(UploadResult {
            id: created.id,
            name: created.name,
            link: created.web_view_link,
        })
    }

    fn classification_for<'a>(&'a self, requested: Option<&'a str>) -> Result<&'a str> {
        let classification = requested
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or(self.default_classification.as_str());
        validate_folder_name(classification)?;
        Ok(classification)
    }
}
