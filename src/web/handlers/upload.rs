//! Upload handler.

use std::sync::Arc;

use axum::{
    extract::{multipart::MultipartError, Multipart, State},
    http::StatusCode,
    Json,
};

use crate::upload::{StagedUpload, UploadRequest};
use crate::web::dto::UploadResponse;
use crate::web::error::ApiError;

use super::AppState;

/// Reduce a client-supplied filename to its final path component.
///
/// Falls back to `upload-<uuid>.bin` when nothing usable remains.
pub fn sanitize_filename(raw: Option<&str>) -> String {
    let candidate: String = raw
        .unwrap_or("")
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or("")
        .chars()
        .filter(|c| !c.is_control())
        .collect();
    let candidate = candidate.trim();

    if candidate.is_empty() || candidate == "." || candidate == ".." {
        format!("upload-{}.bin", uuid::Uuid::new_v4())
    } else {
        candidate.to_string()
    }
}

fn multipart_error(e: MultipartError) -> ApiError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return ApiError::payload_too_large("File too large");
    }
    tracing::warn!("Failed to read multipart field: {}", e);
    ApiError::bad_request("Invalid multipart data")
}

/// POST /api/upload - Upload a file into today's folder.
///
/// Request body: multipart/form-data with a "file" field and an optional
/// "size" field (also accepted as "classification").
pub async fn upload(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let mut payload: Option<StagedUpload> = None;
    let mut classification: Option<String> = None;

    while let Some(mut field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or("").to_string();

        match name.as_str() {
            "file" => {
                let filename = sanitize_filename(field.file_name());
                let mime_type = field
                    .content_type()
                    .map(str::to_string)
                    .unwrap_or_else(|| {
                        mime_guess::from_path(&filename)
                            .first_or_octet_stream()
                            .to_string()
                    });

                let mut staged = StagedUpload::new(filename, mime_type)?;
                while let Some(chunk) = field.chunk().await.map_err(multipart_error)? {
                    if staged.size() + chunk.len() as u64 > state.max_upload_size {
                        let max_mb = state.max_upload_size / 1024 / 1024;
                        return Err(ApiError::payload_too_large(format!(
                            "File too large (max {}MB)",
                            max_mb
                        )));
                    }
                    staged.write_chunk(&chunk).await?;
                }
                payload = Some(staged);
            }
            "size" | "classification" => {
                classification = Some(field.text().await.map_err(multipart_error)?);
            }
            _ => {}
        }
    }

    let result = state
        .dispatcher
        .dispatch(UploadRequest {
            payload,
            classification,
        })
        .await?;

    Ok(Json(UploadResponse::from(result)))
}
