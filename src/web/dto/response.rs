//! Response DTOs for the Web API.

use serde::Serialize;

use crate::upload::UploadResult;

/// Successful upload response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadResponse {
    /// Always `true`.
    pub ok: bool,
    /// Remote id of the created file.
    pub id: String,
    /// Remote name of the created file.
    pub name: String,
    /// Shareable link, when the storage service returns one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

impl From<UploadResult> for UploadResponse {
    fn from(result: UploadResult) -> Self {
        Self {
            ok: true,
            id: result.id,
            name: result.name,
            link: result.link,
        }
    }
}
