//! Global constants used throughout the updater.
//!
//! Default values for [`UpdaterConfig`](crate::config::UpdaterConfig) live here
//! so that the config layer, the CLI help text, and the tests agree on them.

use std::time::Duration;

/// Image reference the updater manages unless configured otherwise.
pub const DEFAULT_IMAGE: &str = "jetbrains/youtrack";

/// Base URL of the public registry API (Docker Hub).
pub const DEFAULT_REGISTRY_URL: &str = "https://hub.docker.com";

/// Number of tags requested from the registry.
///
/// Only this single page is ever inspected. A newer tag that the registry
/// orders outside the first page is not seen.
pub const DEFAULT_PAGE_SIZE: u32 = 100;

/// Compose file looked up in the current directory.
pub const DEFAULT_COMPOSE_FILE: &str = "docker-compose.yml";

/// Container engine binary.
pub const DEFAULT_ENGINE: &str = "docker";

/// Substring that identifies the log line carrying the setup wizard link.
pub const DEFAULT_SETUP_MARKER: &str = "wizard_token";

/// How long to follow the new deployment's logs looking for the setup link.
pub const DEFAULT_LOG_TIMEOUT_SECS: u64 = 60;

/// Timeout for the registry HTTP request.
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// Upper bound for removing the previous image.
pub const REMOVE_IMAGE_TIMEOUT_SECS: u64 = 120;

/// User agent sent to the registry.
pub const USER_AGENT: &str = concat!("youtrack-updater/", env!("CARGO_PKG_VERSION"));

/// Environment variable pointing at an alternative config file.
pub const CONFIG_PATH_ENV: &str = "YOUTRACK_UPDATER_CONFIG";

/// Environment variable that disables spinners when set.
pub const NO_PROGRESS_ENV: &str = "YOUTRACK_UPDATER_NO_PROGRESS";

/// Exit code used when the run is interrupted with Ctrl-C.
pub const INTERRUPTED_EXIT_CODE: i32 = 130;

/// Default log-watch timeout as a [`Duration`].
pub const fn default_log_timeout() -> Duration {
    Duration::from_secs(DEFAULT_LOG_TIMEOUT_SECS)
}
