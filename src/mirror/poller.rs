//! Background poller that mirrors a remote folder into a local directory.
//!
//! Each cycle lists the remote folder and downloads every entry whose name
//! is not yet present locally. Presence is decided by name only.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::StreamExt;
use tokio::io::AsyncWriteExt;
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration, Interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::storage::{ListQuery, RemoteEntry, RemoteStorage};
use crate::{Result, SyncError};

/// Default polling interval in seconds.
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 60;

/// A file that could not be mirrored in a cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollFailure {
    /// Remote entry name.
    pub name: String,
    /// Error description.
    pub error: String,
}

/// Outcome of one polling cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PollReport {
    /// Entries returned by the listing.
    pub listed: usize,
    /// Names downloaded in this cycle, in processing order.
    pub downloaded: Vec<String>,
    /// Entries skipped (already present locally, or folders).
    pub skipped: usize,
    /// Entries that failed.
    pub failed: Vec<PollFailure>,
}

impl PollReport {
    /// Whether every entry was handled without error.
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Local path for a remote entry name.
///
/// Rejects names that are not a single plain path component, so a remote
/// name can never escape `dir`.
pub fn local_path_for(dir: &Path, name: &str) -> Result<PathBuf> {
    let invalid = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains('/')
        || name.contains('\\')
        || name.chars().any(|c| c.is_control());
    if invalid {
        return Err(SyncError::Validation(format!(
            "unsafe local file name: {name:?}"
        )));
    }
    Ok(dir.join(name))
}

/// Remote folder mirror poller.
pub struct MirrorPoller {
    storage: Arc<dyn RemoteStorage>,
    root_folder_id: String,
    download_dir: PathBuf,
    interval: Duration,
}

impl MirrorPoller {
    /// Create a poller for `root_folder_id` writing into `download_dir`.
    ///
    /// The download directory is created if it doesn't exist.
    pub fn new(
        storage: Arc<dyn RemoteStorage>,
        root_folder_id: impl Into<String>,
        download_dir: impl Into<PathBuf>,
    ) -> Result<Self> {
        let download_dir = download_dir.into();
        std::fs::create_dir_all(&download_dir)?;

        Ok(Self {
            storage,
            root_folder_id: root_folder_id.into(),
            download_dir,
            interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
        })
    }

    /// Create a poller from configuration.
    pub fn from_config(storage: Arc<dyn RemoteStorage>, config: &Config) -> Result<Self> {
        Ok(Self::new(
            storage,
            config.drive.root_folder_id.trim(),
            &config.mirror.download_dir,
        )?
        .with_interval(config.mirror.interval_secs))
    }

    /// Set the polling interval.
    pub fn with_interval(mut self, interval_secs: u64) -> Self {
        self.interval = Duration::from_secs(interval_secs.max(1));
        self
    }

    /// Polling interval.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Local download directory.
    pub fn download_dir(&self) -> &Path {
        &self.download_dir
    }

    /// Cycle timer. A cycle that overruns the interval pushes the next one
    /// back instead of triggering catch-up cycles.
    fn poll_timer(&self) -> Interval {
        let mut timer = interval(self.interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        timer
    }

    /// Run the poller loop.
    ///
    /// The first cycle runs immediately, then one per interval. A failed
    /// cycle is logged and the loop carries on.
    pub async fn run(&self) {
        info!(
            "Mirror poller started (folder: {}, interval: {} seconds, target: {})",
            self.root_folder_id,
            self.interval.as_secs(),
            self.download_dir.display()
        );

        let mut timer = self.poll_timer();

        loop {
            timer.tick().await;
            match self.poll_once().await {
                Ok(report) if !report.is_clean() => {
                    warn!(
                        "Polling cycle finished with {} failure(s), {} downloaded",
                        report.failed.len(),
                        report.downloaded.len()
                    );
                }
                Ok(_) => {}
                Err(e) => error!("Polling cycle failed: {}", e),
            }
        }
    }

    /// Run one polling cycle.
    ///
    /// Returns an error only when the folder could not be listed. Per-file
    /// failures are collected in the report and do not stop the cycle.
    pub async fn poll_once(&self) -> Result<PollReport> {
        if self.root_folder_id.is_empty() {
            return Err(SyncError::Config(
                "root folder id is not configured".to_string(),
            ));
        }

        debug!("Checking remote folder {}", self.root_folder_id);

        let entries = self
            .storage
            .list(&ListQuery::children_of(&self.root_folder_id))
            .await?;

        let mut report = PollReport {
            listed: entries.len(),
            ..Default::default()
        };

        if entries.is_empty() {
            info!("No files in remote folder");
            return Ok(report);
        }

        for entry in entries {
            if entry.is_folder() {
                debug!("Skipping folder {}", entry.name);
                report.skipped += 1;
                continue;
            }

            match self.mirror_entry(&entry).await {
                Ok(true) => report.downloaded.push(entry.name),
                Ok(false) => report.skipped += 1,
                Err(e) => {
                    warn!("Failed to download {}: {}", entry.name, e);
                    report.failed.push(PollFailure {
                        name: entry.name,
                        error: e.to_string(),
                    });
                }
            }
        }

        if !report.downloaded.is_empty() {
            info!("Downloaded {} new file(s)", report.downloaded.len());
        }

        Ok(report)
    }

    /// Download `entry` unless a local file with its name exists.
    ///
    /// Returns `true` when a download happened.
    async fn mirror_entry(&self, entry: &RemoteEntry) -> Result<bool> {
        let local_path = local_path_for(&self.download_dir, &entry.name)?;
        if tokio::fs::try_exists(&local_path).await? {
            return Ok(false);
        }

        info!("New file detected, downloading: {}", entry.name);
        self.download(entry, &local_path).await?;
        info!("Download complete: {}", entry.name);
        Ok(true)
    }

    /// Stream the entry into a hidden temporary file in the download
    /// directory, then move it into place.
    ///
    /// The temporary name is short and fixed-length, so any name that fits
    /// as a final path also downloads. It is removed if the copy fails.
    async fn download(&self, entry: &RemoteEntry, local_path: &Path) -> Result<()> {
        let part = tempfile::Builder::new()
            .prefix(".")
            .suffix(".part")
            .tempfile_in(&self.download_dir)?;

        let mut stream = self.storage.download(&entry.id).await?;
        let mut file = tokio::fs::File::from_std(part.as_file().try_clone()?);

        while let Some(chunk) = stream.next().await {
            file.write_all(&chunk?).await?;
        }
        file.flush().await?;
        file.sync_all().await?;
        drop(file);

        part.persist(local_path).map_err(|e| SyncError::Io(e.error))?;
        Ok(())
    }
}

/// Start the poller as a background task.
pub fn start_mirror_poller(poller: MirrorPoller) -> JoinHandle<()> {
    tokio::spawn(async move {
        poller.run().await;
    })
}
