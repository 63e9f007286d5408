//! Configuration module for drivesync.

use serde::Deserialize;
use std::path::Path;

use crate::{Result, SyncError};

/// Remote storage (Google Drive) configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DriveConfig {
    /// Identifier of the root folder that is mirrored and uploaded into.
    #[serde(default)]
    pub root_folder_id: String,
    /// Base URL of the Drive metadata API.
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    /// Base URL of the Drive upload API.
    #[serde(default = "default_upload_base_url")]
    pub upload_base_url: String,
    /// Static bearer token. Takes precedence over `token_file` when set.
    #[serde(default)]
    pub access_token: String,
    /// Path to the `tokens.json` written by the OAuth bootstrap tool.
    #[serde(default = "default_token_file")]
    pub token_file: String,
    /// Connection timeout in seconds.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    /// Total request timeout in seconds (0 = no limit).
    #[serde(default = "default_request_timeout")]
    pub timeout_secs: u64,
}

fn default_api_base_url() -> String {
    "https://www.googleapis.com/drive/v3".to_string()
}

fn default_upload_base_url() -> String {
    "https://www.googleapis.com/upload/drive/v3".to_string()
}

fn default_token_file() -> String {
    "tokens.json".to_string()
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_request_timeout() -> u64 {
    300
}

impl Default for DriveConfig {
    fn default() -> Self {
        Self {
            root_folder_id: String::new(),
            api_base_url: default_api_base_url(),
            upload_base_url: default_upload_base_url(),
            access_token: String::new(),
            token_file: default_token_file(),
            connect_timeout_secs: default_connect_timeout(),
            timeout_secs: default_request_timeout(),
        }
    }
}

/// Mirror poller configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct MirrorConfig {
    /// Whether the poller runs at all.
    #[serde(default = "default_mirror_enabled")]
    pub enabled: bool,
    /// Polling interval in seconds.
    #[serde(default = "default_mirror_interval")]
    pub interval_secs: u64,
    /// Local directory that receives downloaded files.
    #[serde(default = "default_download_dir")]
    pub download_dir: String,
}

fn default_mirror_enabled() -> bool {
    true
}

fn default_mirror_interval() -> u64 {
    60
}

fn default_download_dir() -> String {
    "downloads".to_string()
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            enabled: default_mirror_enabled(),
            interval_secs: default_mirror_interval(),
            download_dir: default_download_dir(),
        }
    }
}

/// Upload dispatcher configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct UploadConfig {
    /// First folder level under the root.
    #[serde(default = "default_category")]
    pub category: String,
    /// Classification used when a request does not carry one.
    #[serde(default = "default_classification")]
    pub default_classification: String,
    /// Timezone used to compute the date bucket (e.g., "Asia/Seoul", "UTC").
    #[serde(default = "default_timezone")]
    pub timezone: String,
}

fn default_category() -> String {
    "MAIN".to_string()
}

fn default_classification() -> String {
    "4x6".to_string()
}

fn default_timezone() -> String {
    "Asia/Seoul".to_string()
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            category: default_category(),
            default_classification: default_classification(),
            timezone: default_timezone(),
        }
    }
}

/// Web (upload endpoint) configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct WebConfig {
    /// Host address to bind.
    #[serde(default = "default_web_host")]
    pub host: String,
    /// Port number to listen on.
    #[serde(default = "default_web_port")]
    pub port: u16,
    /// CORS allowed origins.
    #[serde(default)]
    pub cors_origins: Vec<String>,
    /// Maximum upload size in megabytes.
    #[serde(default = "default_max_upload_size")]
    pub max_upload_size_mb: u64,
}

fn default_web_host() -> String {
    "0.0.0.0".to_string()
}

fn default_web_port() -> u16 {
    10000
}

fn default_max_upload_size() -> u64 {
    50
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            host: default_web_host(),
            port: default_web_port(),
            cors_origins: vec![],
            max_upload_size_mb: default_max_upload_size(),
        }
    }
}

impl WebConfig {
    /// Maximum upload size in bytes.
    pub fn max_upload_size_bytes(&self) -> u64 {
        self.max_upload_size_mb.saturating_mul(1024 * 1024)
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Path to the log file.
    #[serde(default = "default_log_file")]
    pub file: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_file() -> String {
    "logs/drivesync.log".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: default_log_file(),
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// Remote storage configuration.
    #[serde(default)]
    pub drive: DriveConfig,
    /// Mirror poller configuration.
    #[serde(default)]
    pub mirror: MirrorConfig,
    /// Upload dispatcher configuration.
    #[serde(default)]
    pub upload: UploadConfig,
    /// Web configuration.
    #[serde(default)]
    pub web: WebConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(SyncError::Io)?;
        Self::parse(&content)
    }

    /// Load configuration from a TOML file and apply environment variable overrides.
    pub fn load_with_env<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| SyncError::Config(format!("config parse error: {e}")))
    }

    /// Apply environment variable overrides to the configuration.
    ///
    /// Supported environment variables:
    /// - `ROOT_FOLDER_ID`: Drive root folder id
    /// - `GOOGLE_ACCESS_TOKEN`: static bearer token
    /// - `DRIVESYNC_TOKEN_FILE`: path to `tokens.json`
    /// - `DRIVESYNC_DOWNLOAD_DIR`: local mirror directory
    /// - `PORT`: web port
    ///
    /// Empty values are ignored.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("ROOT_FOLDER_ID") {
            self.drive.root_folder_id = v;
        }
        if let Some(v) = get("GOOGLE_ACCESS_TOKEN") {
            self.drive.access_token = v;
        }
        if let Some(v) = get("DRIVESYNC_TOKEN_FILE") {
            self.drive.token_file = v;
        }
        if let Some(v) = get("DRIVESYNC_DOWNLOAD_DIR") {
            self.mirror.download_dir = v;
        }
        if let Some(v) = get("PORT") {
            match v.parse() {
                Ok(port) => self.web.port = port,
                Err(_) => tracing::warn!("Ignoring invalid PORT value: {}", v),
            }
        }
    }

    /// Validate the configuration.
    ///
    /// A missing root folder id is not rejected here: each operation
    /// reports it as its own configuration error.
    pub fn validate(&self) -> Result<()> {
        if self.mirror.interval_secs == 0 {
            return Err(SyncError::Config(
                "mirror.interval_secs must be greater than zero".to_string(),
            ));
        }
        if self.upload.timezone.parse::<chrono_tz::Tz>().is_err() {
            return Err(SyncError::Config(format!(
                "unknown timezone: {}",
                self.upload.timezone
            )));
        }
        if self.upload.category.trim().is_empty() {
            return Err(SyncError::Config(
                "upload.category must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert!(config.drive.root_folder_id.is_empty());
        assert_eq!(
            config.drive.api_base_url,
            "https://www.googleapis.com/drive/v3"
        );
        assert_eq!(
            config.drive.upload_base_url,
            "https://www.googleapis.com/upload/drive/v3"
        );
        assert!(config.drive.access_token.is_empty());
        assert_eq!(config.drive.token_file, "tokens.json");
        assert_eq!(config.drive.connect_timeout_secs, 10);
        assert_eq!(config.drive.timeout_secs, 300);

        assert!(config.mirror.enabled);
        assert_eq!(config.mirror.interval_secs, 60);
        assert_eq!(config.mirror.download_dir, "downloads");

        assert_eq!(config.upload.category, "MAIN");
        assert_eq!(config.upload.default_classification, "4x6");
        assert_eq!(config.upload.timezone, "Asia/Seoul");

        assert_eq!(config.web.host, "0.0.0.0");
        assert_eq!(config.web.port, 10000);
        assert!(config.web.cors_origins.is_empty());
        assert_eq!(config.web.max_upload_size_mb, 50);

        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.file, "logs/drivesync.log");
    }

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
[drive]
root_folder_id = "root-123"
api_base_url = "http://localhost:9000/drive/v3"
upload_base_url = "http://localhost:9000/upload/drive/v3"
access_token = "ya29.token"
token_file = "secrets/tokens.json"
connect_timeout_secs = 5
timeout_secs = 60

[mirror]
enabled = false
interval_secs = 30
download_dir = "D:/photoprint/downloads"

[upload]
category = "PRINT"
default_classification = "5x7"
timezone = "UTC"

[web]
host = "127.0.0.1"
port = 8080
cors_origins = ["http://localhost:5173"]
max_upload_size_mb = 20

[logging]
level = "debug"
file = "custom/logs/app.log"
"#;

        let config = Config::parse(toml).unwrap();

        assert_eq!(config.drive.root_folder_id, "root-123");
        assert_eq!(config.drive.api_base_url, "http://localhost:9000/drive/v3");
        assert_eq!(
            config.drive.upload_base_url,
            "http://localhost:9000/upload/drive/v3"
        );
        assert_eq!(config.drive.access_token, "ya29.token");
        assert_eq!(config.drive.token_file, "secrets/tokens.json");
        assert_eq!(config.drive.connect_timeout_secs, 5);
        assert_eq!(config.drive.timeout_secs, 60);

        assert!(!config.mirror.enabled);
        assert_eq!(config.mirror.interval_secs, 30);
        assert_eq!(config.mirror.download_dir, "D:/photoprint/downloads");

        assert_eq!(config.upload.category, "PRINT");
        assert_eq!(config.upload.default_classification, "5x7");
        assert_eq!(config.upload.timezone, "UTC");

        assert_eq!(config.web.host, "127.0.0.1");
        assert_eq!(config.web.port, 8080);
        assert_eq!(config.web.cors_origins, vec!["http://localhost:5173"]);
        assert_eq!(config.web.max_upload_size_mb, 20);
        assert_eq!(config.web.max_upload_size_bytes(), 20 * 1024 * 1024);

        let huge = WebConfig {
            max_upload_size_mb: u64::MAX,
            ..Default::default()
        };
        assert_eq!(huge.max_upload_size_bytes(), u64::MAX);

        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.file, "custom/logs/app.log");
    }

    #[test]
    fn test_parse_partial_config() {
        let toml = r#"
[drive]
root_folder_id = "abc"
"#;

        let config = Config::parse(toml).unwrap();

        assert_eq!(config.drive.root_folder_id, "abc");
        assert_eq!(config.mirror.interval_secs, 60);
        assert_eq!(config.web.port, 10000);
        assert_eq!(config.upload.category, "MAIN");
    }

    #[test]
    fn test_parse_empty_config() {
        let config = Config::parse("").unwrap();
        assert!(config.drive.root_folder_id.is_empty());
        assert_eq!(config.web.port, 10000);
    }

    #[test]
    fn test_parse_invalid_config() {
        let result = Config::parse("this is not valid toml [[[");

        assert!(result.is_err());
        if let Err(SyncError::Config(msg)) = result {
            assert!(msg.contains("config parse error"));
        } else {
            panic!("Expected Config error");
        }
    }

    #[test]
    fn test_load_nonexistent_file() {
        let result = Config::load("nonexistent.toml");
        assert!(matches!(result, Err(SyncError::Io(_))));
    }

    #[test]
    fn test_apply_overrides() {
        let env: HashMap<&str, &str> = [
            ("ROOT_FOLDER_ID", "env-root"),
            ("GOOGLE_ACCESS_TOKEN", "env-token"),
            ("DRIVESYNC_TOKEN_FILE", "/etc/drivesync/tokens.json"),
            ("DRIVESYNC_DOWNLOAD_DIR", "/srv/downloads"),
            ("PORT", "12345"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.drive.root_folder_id, "env-root");
        assert_eq!(config.drive.access_token, "env-token");
        assert_eq!(config.drive.token_file, "/etc/drivesync/tokens.json");
        assert_eq!(config.mirror.download_dir, "/srv/downloads");
        assert_eq!(config.web.port, 12345);
    }

    #[test]
    fn test_apply_overrides_ignores_empty_and_invalid() {
        let mut config = Config::default();
        config.drive.root_folder_id = "from-file".to_string();

        config.apply_overrides(|key| match key {
            "ROOT_FOLDER_ID" => Some("  ".to_string()),
            "PORT" => Some("not-a-port".to_string()),
            _ => None,
        });

        assert_eq!(config.drive.root_folder_id, "from-file");
        assert_eq!(config.web.port, 10000);
    }

    #[test]
    fn test_validate_default() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_validate_zero_interval() {
        let mut config = Config::default();
        config.mirror.interval_secs = 0;
        assert!(matches!(config.validate(), Err(SyncError::Config(_))));
    }

    #[test]
    fn test_validate_unknown_timezone() {
        let mut config = Config::default();
        config.upload.timezone = "Mars/Olympus".to_string();

        let result = config.validate();
        if let Err(SyncError::Config(msg)) = result {
            assert!(msg.contains("Mars/Olympus"));
        } else {
            panic!("Expected Config error");
        }
    }
}
