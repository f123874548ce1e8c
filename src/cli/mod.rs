//! Command-line interface.
//!
//! The updater has no subcommands: one invocation is one check-and-upgrade
//! run against one compose file.
//!
//! # Usage
//!
//! ```bash
//! # Upgrade the deployment in ./docker-compose.yml
//! youtrack-updater
//!
//! # Another compose file, no questions asked
//! youtrack-updater --compose-file /srv/youtrack/docker-compose.yml --yes
//!
//! # Debug logging, no spinner
//! youtrack-updater --verbose --no-progress
//! ```
//!
//! # Exit codes
//!
//! - `0` upgraded, already up to date, or declined
//! - `1` any fatal error
//! - `130` interrupted with Ctrl-C

pub mod prompt;

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

use crate::config::{ConfigOverrides, UpdaterConfig};
use crate::engine::DockerEngine;
use crate::registry::RegistryClient;
use crate::upgrade::{UpgradeOutcome, Upgrader};
use crate::utils::disable_progress;
use prompt::{AssumeYes, Prompt, StdinPrompt};

/// Settings derived from the global flags before anything runs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CliConfig {
    /// Filter directive for the tracing subscriber when `RUST_LOG` is unset
    pub log_level: String,

    /// Hide spinners
    pub no_progress: bool,
}

impl CliConfig {
    /// Apply process-wide settings.
    pub fn apply(&self) {
        if self.no_progress {
            disable_progress();
        }
    }
}

/// Check Docker Hub for a newer YouTrack image and upgrade a compose deployment in place.
#[derive(Parser, Debug)]
#[command(
    name = "youtrack-updater",
    version,
    about,
    long_about = "Compares the jetbrains/youtrack tag pinned in a docker compose file with the \
                  newest tag on Docker Hub. If a newer version exists and you confirm, the new \
                  image is pulled, the deployment is recreated on it, the one-time setup link \
                  is printed, and the old image is removed."
)]
pub struct Cli {
    /// Compose file of the deployment [default: docker-compose.yml]
    #[arg(short = 'f', long, value_name = "PATH")]
    compose_file: Option<String>,

    /// Config file [default: ~/.youtrack-updater/config.toml]
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Seconds to wait for the setup link in the new container's logs [default: 60]
    #[arg(long, value_name = "SECS")]
    log_timeout: Option<u64>,

    /// Upgrade without asking for confirmation
    #[arg(short, long)]
    yes: bool,

    /// Enable debug logging
    #[arg(short, long, conflicts_with = "quiet")]
    verbose: bool,

    /// Only log errors
    #[arg(short, long)]
    quiet: bool,

    /// Disable spinners
    #[arg(long)]
    no_progress: bool,
}

impl Cli {
    /// Translate the global flags into a [`CliConfig`].
    #[must_use]
    pub fn build_config(&self) -> CliConfig {
        let log_level = if self.verbose {
            "debug"
        } else if self.quiet {
            "error"
        } else {
            "warn"
        };

        CliConfig {
            log_level: log_level.to_string(),
            no_progress: self.no_progress,
        }
    }

    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            compose_file: self.compose_file.clone(),
            log_timeout_secs: self.log_timeout,
        }
    }

    /// Load settings and perform one upgrade run.
    ///
    /// # Errors
    ///
    /// Any configuration or fatal upgrade error.
    pub async fn execute(self) -> Result<UpgradeOutcome> {
        self.build_config().apply();

        let config = UpdaterConfig::load(self.config.as_deref())
            .await?
            .with_overrides(self.overrides());
        config.validate()?;
        tracing::debug!("Effective config: {config:?}");

        if self.yes {
            run_upgrade(&config, AssumeYes).await
        } else {
            run_upgrade(&config, StdinPrompt).await
        }
    }
}

async fn run_upgrade<P: Prompt>(config: &UpdaterConfig, prompt: P) -> Result<UpgradeOutcome> {
    let engine = DockerEngine::new(&config.engine, config.compose_path()?);
    let registry = RegistryClient::new(config)?;

    let mut upgrader = Upgrader::new(config, engine, registry, prompt)?;
    upgrader.run().await
}
