//! Bearer credential providers.
//!
//! Token acquisition and refresh happen outside this crate (the OAuth
//! bootstrap tool writes `tokens.json`); these providers only hand the
//! current token to the storage client.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;

use crate::config::DriveConfig;
use crate::{Result, SyncError};

/// Supplies a bearer token before each remote call.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// The access token to send as `Authorization: Bearer <token>`.
    async fn access_token(&self) -> Result<String>;
}

/// A fixed token.
#[derive(Debug, Clone)]
pub struct StaticToken(String);

impl StaticToken {
    /// Create a provider that always returns `token`.
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

#[async_trait]
impl TokenProvider for StaticToken {
    async fn access_token(&self) -> Result<String> {
        if self.0.is_empty() {
            return Err(SyncError::Config("access token is empty".to_string()));
        }
        Ok(self.0.clone())
    }
}

/// Token file layout written by the OAuth bootstrap tool.
#[derive(Debug, Deserialize)]
struct StoredTokens {
    access_token: Option<String>,
    /// Expiry as milliseconds since the Unix epoch.
    expiry_date: Option<i64>,
}

/// Reads the access token from a `tokens.json` file on every call.
///
/// Re-reading means a token refreshed externally is picked up without a
/// restart.
#[derive(Debug, Clone)]
pub struct TokenFile {
    path: PathBuf,
}

impl TokenFile {
    /// Create a provider backed by the file at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the token file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl TokenProvider for TokenFile {
    async fn access_token(&self) -> Result<String> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(SyncError::Config(format!(
                    "token file not found: {}",
                    self.path.display()
                )));
            }
            Err(e) => return Err(e.into()),
        };

        let tokens: StoredTokens = serde_json::from_str(&content)
            .map_err(|e| SyncError::Auth(format!("invalid token file: {e}")))?;

        if let Some(expiry) = tokens.expiry_date {
            if expiry <= Utc::now().timestamp_millis() {
                tracing::warn!(
                    "Access token in {} has expired; remote calls may be rejected",
                    self.path.display()
                );
            }
        }

        tokens
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| SyncError::Auth("token file has no access_token".to_string()))
    }
}

/// Pick the credential provider for a Drive configuration.
///
/// A non-empty `access_token` wins over `token_file`.
pub fn token_provider_from_config(config: &DriveConfig) -> Arc<dyn TokenProvider> {
    if config.access_token.is_empty() {
        Arc::new(TokenFile::new(&config.token_file))
    } else {
        Arc::new(StaticToken::new(&config.access_token))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_tokens(dir: &TempDir, content: &str) -> PathBuf {
        let path = dir.path().join("tokens.json");
        std::fs::write(&path, content).unwrap();
        path
    }

    #[tokio::test]
    async fn test_static_token() {
        let provider = StaticToken::new("abc");
        assert_eq!(provider.access_token().await.unwrap(), "abc");
    }

    #[tokio::test]
    async fn test_static_token_empty() {
        let provider = StaticToken::new("");
        assert!(matches!(
            provider.access_token().await,
            Err(SyncError::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_token_file_reads_access_token() {
        let dir = TempDir::new().unwrap();
        let path = write_tokens(
            &dir,
            r#"{"access_token":"ya29.abc","refresh_token":"1//r","scope":"drive.file","token_type":"Bearer","expiry_date":4102444800000}"#,
        );

        let provider = TokenFile::new(&path);
        assert_eq!(provider.access_token().await.unwrap(), "ya29.abc");
    }

    #[tokio::test]
    async fn test_token_file_expired_still_returned() {
        let dir = TempDir::new().unwrap();
        let path = write_tokens(&dir, r#"{"access_token":"old","expiry_date":1}"#);

        let provider = TokenFile::new(&path);
        assert_eq!(provider.access_token().await.unwrap(), "old");
    }

    #[tokio::test]
    async fn test_token_file_missing() {
        let provider = TokenFile::new("/nonexistent/tokens.json");
        assert!(matches!(
            provider.access_token().await,
            Err(SyncError::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_token_file_without_access_token() {
        let dir = TempDir::new().unwrap();
        let path = write_tokens(&dir, r#"{"refresh_token":"1//r"}"#);

        let provider = TokenFile::new(&path);
        assert!(matches!(
            provider.access_token().await,
            Err(SyncError::Auth(_))
        ));
    }

    #[tokio::test]
    async fn test_token_file_invalid_json() {
        let dir = TempDir::new().unwrap();
        let path = write_tokens(&dir, "not json");

        let provider = TokenFile::new(&path);
        assert!(matches!(
            provider.access_token().await,
            Err(SyncError::Auth(_))
        ));
    }

    #[tokio::test]
    async fn test_provider_from_config_prefers_static_token() {
        let config = DriveConfig {
            access_token: "configured".to_string(),
            token_file: "/nonexistent/tokens.json".to_string(),
            ..Default::default()
        };

        let provider = token_provider_from_config(&config);
        assert_eq!(provider.access_token().await.unwrap(), "configured");
    }

    #[tokio::test]
    async fn test_provider_from_config_falls_back_to_file() {
        let config = DriveConfig {
            token_file: "/nonexistent/tokens.json".to_string(),
            ..Default::default()
        };

        let provider = token_provider_from_config(&config);
        assert!(provider.access_token().await.is_err());
    }
}
