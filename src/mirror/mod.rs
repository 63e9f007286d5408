//! Remote folder mirroring.
//!
//! The [`MirrorPoller`] periodically lists the configured root folder and
//! downloads every file not yet present in the local download directory.

mod poller;

pub use poller::{
    local_path_for, start_mirror_poller, MirrorPoller, PollFailure, PollReport,
    DEFAULT_POLL_INTERVAL_SECS,
};
