//! Google Drive v3 REST client.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::{StreamExt, TryStreamExt};
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE, LOCATION};
use reqwest::{Client, Response};
use serde::Deserialize;
use serde_json::json;

use super::{
    ByteStream, ListQuery, NewEntry, RemoteEntry, RemoteStorage, SortOrder, TokenProvider,
    UploadBody,
};
use crate::config::DriveConfig;
use crate::datetime::parse_rfc3339;
use crate::{Result, SyncError};

/// Fields requested for every file resource.
const FILE_FIELDS: &str = "id,name,mimeType,createdTime,webViewLink";

/// Page size for listings (Drive maximum).
const PAGE_SIZE: &str = "1000";

/// User agent string for Drive requests.
const USER_AGENT: &str = "drivesync/0.1";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileList {
    #[serde(default)]
    files: Vec<DriveFile>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DriveFile {
    id: String,
    name: String,
    #[serde(default)]
    mime_type: String,
    created_time: Option<String>,
    web_view_link: Option<String>,
}

impl From<DriveFile> for RemoteEntry {
    fn from(f: DriveFile) -> Self {
        RemoteEntry {
            created_time: f.created_time.as_deref().and_then(parse_rfc3339),
            id: f.id,
            name: f.name,
            mime_type: f.mime_type,
            web_view_link: f.web_view_link,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorMessage,
}

#[derive(Debug, Deserialize)]
struct ErrorMessage {
    message: String,
}

/// Escape a value for use inside a single-quoted Drive query literal.
fn escape_query_value(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

/// Build the Drive `q` search expression for a listing.
pub fn build_query(query: &ListQuery) -> String {
    let mut q = format!(
        "'{}' in parents and trashed = false",
        escape_query_value(&query.parent_id)
    );
    if let Some(name) = &query.name {
        q.push_str(&format!(" and name = '{}'", escape_query_value(name)));
    }
    if let Some(mime_type) = &query.mime_type {
        q.push_str(&format!(" and mimeType = '{}'", escape_query_value(mime_type)));
    }
    q
}

fn order_by(order: SortOrder) -> &'static str {
    match order {
        SortOrder::NewestFirst => "createdTime desc",
        SortOrder::OldestFirst => "createdTime",
    }
}

/// Turn a non-success response into a remote error carrying the service's message.
async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let text = response.text().await.unwrap_or_default();
    let message = match serde_json::from_str::<ErrorEnvelope>(&text) {
        Ok(envelope) => envelope.error.message,
        Err(_) if text.trim().is_empty() => status.to_string(),
        Err(_) => text,
    };

    Err(SyncError::Remote {
        status: Some(status.as_u16()),
        message,
    })
}

/// Drive v3 implementation of [`RemoteStorage`].
pub struct DriveClient {
    http: Client,
    api_base: String,
    upload_base: String,
    tokens: Arc<dyn TokenProvider>,
}

impl DriveClient {
    /// Create a client from configuration.
    pub fn new(config: &DriveConfig, tokens: Arc<dyn TokenProvider>) -> Result<Self> {
        for base in [&config.api_base_url, &config.upload_base_url] {
            url::Url::parse(base)
                .map_err(|e| SyncError::Config(format!("invalid Drive URL {base}: {e}")))?;
        }

        let mut builder = Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .user_agent(USER_AGENT);
        if config.timeout_secs > 0 {
            builder = builder.timeout(Duration::from_secs(config.timeout_secs));
        }
        let http = builder
            .build()
            .map_err(|e| SyncError::Config(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            http,
            api_base: config.api_base_url.trim_end_matches('/').to_string(),
            upload_base: config.upload_base_url.trim_end_matches('/').to_string(),
            tokens,
        })
    }

    fn files_url(&self) -> String {
        format!("{}/files", self.api_base)
    }

    async fn create_metadata_only(&self, entry: &NewEntry, token: &str) -> Result<RemoteEntry> {
        let response = self
            .http
            .post(self.files_url())
            .bearer_auth(token)
            .query(&[("fields", FILE_FIELDS)])
            .json(&metadata_json(entry))
            .send()
            .await?;

        let file: DriveFile = check_status(response).await?.json().await?;
        Ok(file.into())
    }

    /// Resumable upload: start a session with the metadata, then stream the body.
    async fn create_with_body(
        &self,
        entry: &NewEntry,
        body: UploadBody,
        token: &str,
    ) -> Result<RemoteEntry> {
        let content_type = entry
            .mime_type
            .clone()
            .unwrap_or_else(|| "application/octet-stream".to_string());

        let response = self
            .http
            .post(format!("{}/files", self.upload_base))
            .bearer_auth(token)
            .query(&[("uploadType", "resumable"), ("fields", FILE_FIELDS)])
            .header("X-Upload-Content-Type", &content_type)
            .header("X-Upload-Content-Length", body.len)
            .json(&metadata_json(entry))
            .send()
            .await?;

        let response = check_status(response).await?;
        let session_url = response
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| SyncError::remote("upload session has no Location header"))?;

        tracing::debug!(name = %entry.name, bytes = body.len, "Upload session started");

        let response = self
            .http
            .put(session_url)
            .bearer_auth(token)
            .header(CONTENT_TYPE, &content_type)
            .header(CONTENT_LENGTH, body.len)
            .body(reqwest::Body::from(body.file))
            .send()
            .await?;

        let file: DriveFile = check_status(response).await?.json().await?;
        Ok(file.into())
    }
}

fn metadata_json(entry: &NewEntry) -> serde_json::Value {
    let mut metadata = json!({
        "name": entry.name,
        "parents": [entry.parent_id],
    });
    if let Some(mime_type) = &entry.mime_type {
        metadata["mimeType"] = json!(mime_type);
    }
    metadata
}

#[async_trait]
impl RemoteStorage for DriveClient {
    async fn list(&self, query: &ListQuery) -> Result<Vec<RemoteEntry>> {
        let token = self.tokens.access_token().await?;
        let q = build_query(query);
        let fields = format!("nextPageToken,files({FILE_FIELDS})");

        let mut entries = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut params = vec![
                ("q", q.as_str()),
                ("fields", fields.as_str()),
                ("orderBy", order_by(query.order)),
                ("pageSize", PAGE_SIZE),
            ];
            if let Some(next) = page_token.as_deref() {
                params.push(("pageToken", next));
            }

            let response = self
                .http
                .get(self.files_url())
                .bearer_auth(&token)
                .query(&params)
                .send()
                .await?;

            let page: FileList = check_status(response).await?.json().await?;
            entries.extend(page.files.into_iter().map(RemoteEntry::from));

            match page.next_page_token {
                Some(next) if !next.is_empty() => page_token = Some(next),
                _ => break,
            }
        }

        Ok(entries)
    }

    async fn create(&self, entry: &NewEntry, body: Option<UploadBody>) -> Result<RemoteEntry> {
        let token = self.tokens.access_token().await?;
        match body {
            Some(body) => self.create_with_body(entry, body, &token).await,
            None => self.create_metadata_only(entry, &token).await,
        }
    }

    async fn download(&self, id: &str) -> Result<ByteStream> {
        let token = self.tokens.access_token().await?;

        let response = self
            .http
            .get(format!("{}/{}", self.files_url(), id))
            .bearer_auth(&token)
            .query(&[("alt", "media")])
            .send()
            .await?;

        let stream = check_status(response)
            .await?
            .bytes_stream()
            .map_err(|e| std::io::Error::other(e.to_string()))
            .boxed();

        Ok(stream)
    }
}
