//! Local staging of inbound upload payloads.

use std::path::Path;

use tempfile::NamedTempFile;
use tokio::io::AsyncWriteExt;

use crate::storage::UploadBody;
use crate::Result;

/// An uploaded payload buffered in a temporary file.
///
/// The temporary file is deleted when the value is dropped, so whoever owns
/// the `StagedUpload` releases the local copy on every exit path.
#[derive(Debug)]
pub struct StagedUpload {
    // Declared before `file` so the handle closes before the file is removed
    writer: tokio::fs::File,
    file: NamedTempFile,
    filename: String,
    mime_type: String,
    size: u64,
}

impl StagedUpload {
    /// Create an empty staged payload in the system temp directory.
    pub fn new(filename: impl Into<String>, mime_type: impl Into<String>) -> Result<Self> {
        let file = tempfile::Builder::new()
            .prefix("drivesync-upload-")
            .tempfile()?;
        let writer = tokio::fs::File::from_std(file.as_file().try_clone()?);

        Ok(Self {
            writer,
            file,
            filename: filename.into(),
            mime_type: mime_type.into(),
            size: 0,
        })
    }

    /// Stage a payload that is already in memory.
    pub async fn from_bytes(
        filename: impl Into<String>,
        mime_type: impl Into<String>,
        content: &[u8],
    ) -> Result<Self> {
        let mut staged = Self::new(filename, mime_type)?;
        staged.write_chunk(content).await?;
        Ok(staged)
    }

    /// Append a chunk of payload.
    pub async fn write_chunk(&mut self, chunk: &[u8]) -> Result<()> {
        self.writer.write_all(chunk).await?;
        self.size += chunk.len() as u64;
        Ok(())
    }

    /// Flush buffered writes and open the content for reading from the start.
    pub async fn open_body(&mut self) -> Result<UploadBody> {
        self.writer.flush().await?;
        let reader = self.file.reopen()?;
        Ok(UploadBody {
            file: tokio::fs::File::from_std(reader),
            len: self.size,
        })
    }

    /// Suggested filename of the payload.
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Declared MIME type of the payload.
    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    /// Payload size in bytes.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Whether no bytes were staged.
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Location of the temporary file.
    pub fn path(&self) -> &Path {
        self.file.path()
    }
}
