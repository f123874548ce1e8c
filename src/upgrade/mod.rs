//! In-place upgrade of a compose deployment.
//!
//! The [`Upgrader`] walks a fixed sequence and stops at the first fatal step:
//!
//! ```text
//! Idle
//!  └─ CheckedVersions   read compose tag, ask registry, compare
//!      ├─ (up to date) ─────────────────────────────── Done
//!      └─ Confirmed     operator says y
//!          ├─ (declined) ───────────────────────────── Aborted
//!          ├─ Pulling       docker pull image:new
//!          ├─ Stopping      docker compose down
//!          ├─ Rewriting     compose file → image:new
//!          ├─ Starting      docker compose up -d
//!          ├─ WatchingLogs  look for the setup link (never fatal)
//!          ├─ CleaningUp    docker rmi image:old (never fatal)
//!          └─ Done
//! ```
//!
//! Any error in pull, stop, rewrite or start moves the run to `Failed`. A pull
//! or stop failure leaves the compose file untouched. A start failure happens
//! after the old containers are gone and the file already names the new tag;
//! nothing is rolled back, the error tells the operator how to recover.

mod orchestrator;

#[cfg(test)]
mod tests;

pub use orchestrator::Upgrader;

use std::fmt;

use crate::logwatch::WatchOutcome;
use crate::version::TagVersion;

/// Where a run currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpgradeState {
    Idle,
    CheckedVersions,
    Confirmed,
    Pulling,
    Stopping,
    Rewriting,
    Starting,
    WatchingLogs,
    CleaningUp,
    Done,
    /// The operator declined
    Aborted,
    /// A fatal step failed
    Failed,
}

impl fmt::Display for UpgradeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::CheckedVersions => "checked versions",
            Self::Confirmed => "confirmed",
            Self::Pulling => "pulling",
            Self::Stopping => "stopping",
            Self::Rewriting => "rewriting",
            Self::Starting => "starting",
            Self::WatchingLogs => "watching logs",
            Self::CleaningUp => "cleaning up",
            Self::Done => "done",
            Self::Aborted => "aborted",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Result of comparing the deployed tag with the registry.
#[derive(Debug, Clone)]
pub struct VersionCheck {
    /// Tag found in the compose file
    pub current: String,
    /// Highest valid tag on the registry
    pub latest: TagVersion,
    /// `latest` is strictly newer than `current`
    pub update_available: bool,
}

/// What a completed upgrade did.
#[derive(Debug, Clone)]
pub struct UpgradeReport {
    pub previous_tag: String,
    pub new_tag: String,
    /// Number of image references rewritten in the compose file
    pub references_rewritten: usize,
    /// How the log watch ended; `None` if the log follower could not start
    pub setup: Option<WatchOutcome>,
    pub old_image_removed: bool,
}

impl UpgradeReport {
    /// The setup link, if the logs carried one.
    #[must_use]
    pub fn setup_url(&self) -> Option<&str> {
        self.setup.as_ref().and_then(WatchOutcome::setup_url)
    }
}

/// How a run ended, short of a fatal error.
#[derive(Debug, Clone)]
pub enum UpgradeOutcome {
    /// Nothing newer on the registry
    UpToDate { current: String },
    /// A newer tag exists but the operator said no
    Declined { current: String, latest: String },
    /// The deployment now runs the new tag
    Upgraded(UpgradeReport),
}
