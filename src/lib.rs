//! youtrack-updater - upgrade a self-hosted YouTrack running under docker compose
//!
//! The updater reads the `jetbrains/youtrack:<tag>` reference from a compose
//! file, asks Docker Hub for the newest published tag, and if it is newer and
//! the operator agrees, performs the upgrade in place:
//!
//! 1. pull the new image
//! 2. `docker compose down`
//! 3. rewrite the tag in the compose file
//! 4. `docker compose up -d`
//! 5. follow the logs until the one-time setup link shows up
//! 6. remove the old image
//!
//! # Modules
//!
//! ## Upgrade pipeline
//! - [`compose`] - read and rewrite the image tag in the compose file
//! - [`registry`] - list tags on Docker Hub and pick the newest version
//! - [`version`] - tag parsing and semantic version comparison
//! - [`engine`] - `docker` / `docker compose` invocations
//! - [`logwatch`] - bounded scan of the container logs for the setup link
//! - [`upgrade`] - the orchestrator tying the steps together
//!
//! ## Surface
//! - [`cli`] - argument parsing and the confirmation prompt
//! - [`config`] - `~/.youtrack-updater/config.toml` and defaults
//! - [`core`] - error types and user-facing error rendering
//! - [`utils`] - atomic writes, path expansion, spinners
//!
//! # Command-Line Usage
//!
//! ```bash
//! # Check and upgrade ./docker-compose.yml
//! youtrack-updater
//!
//! # Explicit compose file, wait longer for the setup link
//! youtrack-updater --compose-file ~/youtrack/docker-compose.yml --log-timeout 120
//! ```
//!
//! # Configuration
//!
//! ```toml
//! # ~/.youtrack-updater/config.toml
//! compose_file = "~/youtrack/docker-compose.yml"
//! log_timeout_secs = 120
//! ```

// Upgrade pipeline
pub mod compose;
pub mod engine;
pub mod logwatch;
pub mod registry;
pub mod upgrade;
pub mod version;

// Surface
pub mod cli;
pub mod config;
pub mod constants;
pub mod core;
pub mod utils;

// test_utils module is available for both unit tests and integration tests
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
