//! Updater settings.
//!
//! Everything the run needs to know about its environment is gathered into an
//! [`UpdaterConfig`] value that is handed to the orchestrator. Values come from,
//! in order of precedence:
//!
//! 1. command-line flags ([`ConfigOverrides`])
//! 2. the file given with `--config`
//! 3. the file named by `YOUTRACK_UPDATER_CONFIG`
//! 4. `~/.youtrack-updater/config.toml`, if it exists
//! 5. built-in defaults
//!
//! Only the first config file found is read; files are not merged.
//!
//! # File format
//!
//! ```toml
//! image = "jetbrains/youtrack"
//! registry_url = "https://hub.docker.com"
//! page_size = 100
//! compose_file = "~/youtrack/docker-compose.yml"
//! engine = "docker"
//! log_timeout_secs = 60
//! setup_marker = "wizard_token"
//! http_timeout_secs = 30
//! ```
//!
//! Every key is optional.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;

use crate::constants::{
    CONFIG_PATH_ENV, DEFAULT_COMPOSE_FILE, DEFAULT_ENGINE, DEFAULT_HTTP_TIMEOUT_SECS,
    DEFAULT_IMAGE, DEFAULT_LOG_TIMEOUT_SECS, DEFAULT_PAGE_SIZE, DEFAULT_REGISTRY_URL,
    DEFAULT_SETUP_MARKER,
};
use crate::core::UpdaterError;
use crate::utils::resolve_path;

/// Settings for one updater run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdaterConfig {
    /// Image name without tag, `<namespace>/<name>`
    pub image: String,

    /// Base URL of the registry API
    pub registry_url: String,

    /// Number of tags requested (single page)
    pub page_size: u32,

    /// Compose file describing the deployment; `~/` and `$VAR` are expanded
    pub compose_file: String,

    /// Container engine binary
    pub engine: String,

    /// Seconds to follow logs for the setup link
    pub log_timeout_secs: u64,

    /// Substring identifying the setup link line
    pub setup_marker: String,

    /// Registry request timeout in seconds
    pub http_timeout_secs: u64,
}

impl Default for UpdaterConfig {
    fn default() -> Self {
        Self {
            image: DEFAULT_IMAGE.to_string(),
            registry_url: DEFAULT_REGISTRY_URL.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            compose_file: DEFAULT_COMPOSE_FILE.to_string(),
            engine: DEFAULT_ENGINE.to_string(),
            log_timeout_secs: DEFAULT_LOG_TIMEOUT_SECS,
            setup_marker: DEFAULT_SETUP_MARKER.to_string(),
            http_timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
        }
    }
}

/// Values supplied on the command line, applied on top of a loaded config.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    /// `--compose-file`
    pub compose_file: Option<String>,
    /// `--log-timeout`
    pub log_timeout_secs: Option<u64>,
}

impl UpdaterConfig {
    /// Load the config following the precedence described in the module docs.
    ///
    /// An explicitly named file (flag or environment variable) must exist; the
    /// default location is optional.
    ///
    /// # Errors
    ///
    /// - [`UpdaterError::ConfigError`] if an explicit file is missing
    /// - [`UpdaterError::ConfigParseError`] if a file is not valid config TOML
    pub async fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load_required(path).await;
        }

        if let Ok(env_path) = std::env::var(CONFIG_PATH_ENV) {
            if !env_path.is_empty() {
                tracing::debug!("Using config from {CONFIG_PATH_ENV}={env_path}");
                return Self::load_required(Path::new(&env_path)).await;
            }
        }

        match Self::default_path() {
            Ok(path) if path.exists() => Self::load_from(&path).await,
            Ok(_) => Ok(Self::default()),
            Err(e) => {
                tracing::debug!("No default config location: {e}");
                Ok(Self::default())
            }
        }
    }

    /// Parse the config file at `path`.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be read or parsed.
    pub async fn load_from(path: &Path) -> Result<Self> {
        tracing::debug!("Loading config from {}", path.display());

        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        toml::from_str(&content).map_err(|e| {
            UpdaterError::ConfigParseError {
                file: path.display().to_string(),
                reason: e.to_string(),
            }
            .into()
        })
    }

    async fn load_required(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(UpdaterError::ConfigError {
                message: format!("Config file not found: {}", path.display()),
            }
            .into());
        }
        Self::load_from(path).await
    }

    /// `~/.youtrack-updater/config.toml`
    ///
    /// # Errors
    ///
    /// Fails when the home directory cannot be determined.
    pub fn default_path() -> Result<PathBuf> {
        let home =
            dirs::home_dir().ok_or_else(|| anyhow::anyhow!("Unable to determine home directory"))?;
        Ok(home.join(".youtrack-updater").join("config.toml"))
    }

    /// Apply command-line values over the loaded ones.
    #[must_use]
    pub fn with_overrides(mut self, overrides: ConfigOverrides) -> Self {
        if let Some(compose_file) = overrides.compose_file {
            self.compose_file = compose_file;
        }
        if let Some(secs) = overrides.log_timeout_secs {
            self.log_timeout_secs = secs;
        }
        self
    }

    /// Reject settings the updater cannot work with.
    ///
    /// # Errors
    ///
    /// [`UpdaterError::ConfigError`] naming the first bad field.
    pub fn validate(&self) -> Result<()> {
        let fail = |message: &str| -> Result<()> {
            Err(UpdaterError::ConfigError {
                message: message.to_string(),
            }
            .into())
        };

        if self.image.trim().is_empty() {
            return fail("image must not be empty");
        }
        if !self.image.contains('/') {
            return fail("image must be of the form <namespace>/<name>, e.g. jetbrains/youtrack");
        }
        if self.image.contains(':') {
            return fail("image must not include a tag");
        }
        if self.page_size == 0 {
            return fail("page_size must be greater than 0");
        }
        if self.log_timeout_secs == 0 {
            return fail("log_timeout_secs must be greater than 0");
        }
        if self.http_timeout_secs == 0 {
            return fail("http_timeout_secs must be greater than 0");
        }
        if self.engine.trim().is_empty() {
            return fail("engine must not be empty");
        }
        if self.setup_marker.is_empty() {
            return fail("setup_marker must not be empty");
        }
        if self.compose_file.trim().is_empty() {
            return fail("compose_file must not be empty");
        }
        Ok(())
    }

    /// Compose file path with `~/` and environment variables expanded.
    ///
    /// # Errors
    ///
    /// Fails on unsupported `~user` paths or undefined variables.
    pub fn compose_path(&self) -> Result<PathBuf> {
        resolve_path(&self.compose_file)
    }

    /// Log watch timeout as a [`Duration`].
    #[must_use]
    pub const fn log_timeout(&self) -> Duration {
        Duration::from_secs(self.log_timeout_secs)
    }

    /// Registry request timeout as a [`Duration`].
    #[must_use]
    pub const fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}
