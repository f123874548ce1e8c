//! Error handling for the updater
//!
//! This module provides the typed error taxonomy and the user-facing error
//! rendering used by the CLI. The error system follows two rules:
//! 1. **Strongly-typed errors** so the orchestrator and tests can match on the
//!    exact failure
//! 2. **User-friendly messages** with an actionable suggestion when the run is
//!    aborted
//!
//! # Architecture
//!
//! - [`UpdaterError`] - every fatal failure the updater can report
//! - [`ErrorContext`] - wrapper adding details and a suggestion for display
//!
//! # Error Categories
//!
//! - **Configuration**: [`UpdaterError::ComposeFileNotFound`],
//!   [`UpdaterError::ImageNotFound`], [`UpdaterError::ConfigError`]
//! - **Registry**: [`UpdaterError::RegistryUnavailable`],
//!   [`UpdaterError::NoValidVersion`]
//! - **Versions**: [`UpdaterError::InvalidVersion`]
//! - **Container engine**: [`UpdaterError::EngineNotFound`],
//!   [`UpdaterError::PullFailed`], [`UpdaterError::StopFailed`],
//!   [`UpdaterError::StartFailed`], [`UpdaterError::EngineCommandError`]
//! - **File system**: [`UpdaterError::FileSystemError`], [`UpdaterError::IoError`]
//!
//! Removing the old image and watching the logs never produce an
//! [`UpdaterError`]; those steps only warn.
//!
//! # Examples
//!
//! ```rust,no_run
//! use youtrack_updater::core::{UpdaterError, user_friendly_error};
//!
//! let error = UpdaterError::ComposeFileNotFound {
//!     path: "docker-compose.yml".to_string(),
//! };
//! let ctx = user_friendly_error(anyhow::Error::from(error));
//! ctx.display(); // colored error, details and suggestion on stderr
//! ```

use colored::Colorize;
use std::fmt;
use thiserror::Error;

/// The main error type for updater operations
///
/// Each variant maps to one fatal outcome of a run. The CLI turns any of them
/// into exit code 1 after printing an [`ErrorContext`].
#[derive(Error, Debug)]
pub enum UpdaterError {
    /// The compose file does not exist
    #[error("Compose file not found: {path}")]
    ComposeFileNotFound {
        /// Path that was looked up
        path: String,
    },

    /// The compose file has no `<namespace>/<image>:<tag>` reference
    #[error("No {image} image found in {path}")]
    ImageNotFound {
        /// Image name that was searched for
        image: String,
        /// Compose file that was searched
        path: String,
    },

    /// Invalid updater configuration
    #[error("Configuration error: {message}")]
    ConfigError {
        /// Description of the problem
        message: String,
    },

    /// The config file is not valid TOML or has wrongly typed fields
    #[error("Invalid config file syntax in {file}")]
    ConfigParseError {
        /// Config file path
        file: String,
        /// Parser message
        reason: String,
    },

    /// The registry could not be reached or answered with something unusable
    #[error("Failed to check the registry at {url}")]
    RegistryUnavailable {
        /// Requested URL
        url: String,
        /// Transport, status or decoding failure
        reason: String,
    },

    /// None of the tags returned by the registry parse as a version
    #[error("No valid version tags found for {image}")]
    NoValidVersion {
        /// Image whose tags were listed
        image: String,
    },

    /// A tag could not be parsed as a semantic version
    #[error("Invalid version tag: {tag}")]
    InvalidVersion {
        /// The offending tag
        tag: String,
    },

    /// The container engine binary is not on PATH
    #[error("Container engine '{command}' is not installed or not found in PATH")]
    EngineNotFound {
        /// Binary that was looked up
        command: String,
    },

    /// Pulling the new image returned a non-zero exit code
    #[error("Failed to pull image {reference} (exit code {code})")]
    PullFailed {
        /// Full image reference
        reference: String,
        /// Exit code, -1 when terminated by a signal
        code: i32,
    },

    /// Bringing the old deployment down returned a non-zero exit code
    #[error("Failed to stop the current deployment (exit code {code})")]
    StopFailed {
        /// Exit code, -1 when terminated by a signal
        code: i32,
    },

    /// Bringing the new deployment up returned a non-zero exit code
    #[error("Failed to start the new deployment (exit code {code})")]
    StartFailed {
        /// Exit code, -1 when terminated by a signal
        code: i32,
        /// Tag the compose file pointed at before the rewrite
        previous_tag: String,
        /// Compose file that now references the new tag
        compose_file: String,
    },

    /// An engine command could not be spawned at all
    #[error("Container engine command failed: {operation}")]
    EngineCommandError {
        /// Command line that was attempted
        operation: String,
        /// Underlying reason
        reason: String,
    },

    /// File system operation failed
    #[error("File system error: {operation}")]
    FileSystemError {
        /// Operation that failed
        operation: String,
        /// Path involved
        path: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Other error
    #[error("{message}")]
    Other {
        /// Generic error message
        message: String,
    },
}

impl Clone for UpdaterError {
    fn clone(&self) -> Self {
        match self {
            Self::ComposeFileNotFound {
                path,
            } => Self::ComposeFileNotFound {
                path: path.clone(),
            },
            Self::ImageNotFound {
                image,
                path,
            } => Self::ImageNotFound {
                image: image.clone(),
                path: path.clone(),
            },
            Self::ConfigError {
                message,
            } => Self::ConfigError {
                message: message.clone(),
            },
            Self::ConfigParseError {
                file,
                reason,
            } => Self::ConfigParseError {
                file: file.clone(),
                reason: reason.clone(),
            },
            Self::RegistryUnavailable {
                url,
                reason,
            } => Self::RegistryUnavailable {
                url: url.clone(),
                reason: reason.clone(),
            },
            Self::NoValidVersion {
                image,
            } => Self::NoValidVersion {
                image: image.clone(),
            },
            Self::InvalidVersion {
                tag,
            } => Self::InvalidVersion {
                tag: tag.clone(),
            },
            Self::EngineNotFound {
                command,
            } => Self::EngineNotFound {
                command: command.clone(),
            },
            Self::PullFailed {
                reference,
                code,
            } => Self::PullFailed {
                reference: reference.clone(),
                code: *code,
            },
            Self::StopFailed {
                code,
            } => Self::StopFailed {
                code: *code,
            },
            Self::StartFailed {
                code,
                previous_tag,
                compose_file,
            } => Self::StartFailed {
                code: *code,
                previous_tag: previous_tag.clone(),
                compose_file: compose_file.clone(),
            },
            Self::EngineCommandError {
                operation,
                reason,
            } => Self::EngineCommandError {
                operation: operation.clone(),
                reason: reason.clone(),
            },
            Self::FileSystemError {
                operation,
                path,
            } => Self::FileSystemError {
                operation: operation.clone(),
                path: path.clone(),
            },
            // io::Error is not Clone
            Self::IoError(e) => Self::Other {
                message: format!("IO error: {e}"),
            },
            Self::Other {
                message,
            } => Self::Other {
                message: message.clone(),
            },
        }
    }
}

/// Error context wrapper that provides user-friendly error information
///
/// Shown on stderr by the CLI entry point: the error in red, details in
/// yellow, the suggestion in green.
///
/// ```rust,no_run
/// use youtrack_updater::core::{ErrorContext, UpdaterError};
///
/// let context = ErrorContext::new(UpdaterError::EngineNotFound {
///     command: "docker".to_string(),
/// })
/// .with_suggestion("Install Docker Engine with the compose plugin")
/// .with_details("The updater drives the deployment through the docker CLI");
///
/// context.display();
/// ```
#[derive(Debug)]
pub struct ErrorContext {
    /// The underlying error
    pub error: UpdaterError,
    /// Optional suggestion for resolving the error
    pub suggestion: Option<String>,
    /// Optional additional details about the error
    pub details: Option<String>,
}

impl ErrorContext {
    /// Create a new error context with no suggestion or details
    #[must_use]
    pub const fn new(error: UpdaterError) -> Self {
        Self {
            error,
            suggestion: None,
            details: None,
        }
    }

    /// Add a suggestion for resolving the error
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Add additional details explaining the error
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Display the error context to stderr with terminal colors
    pub fn display(&self) {
        eprintln!("{}: {}", "error".red().bold(), self.error);

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

impl std::error::Error for ErrorContext {}

/// Convert any error to a user-friendly [`ErrorContext`] with actionable suggestions
///
/// The whole `anyhow` chain is searched for an [`UpdaterError`], so errors
/// that picked up extra `.context(...)` layers on the way up are still
/// recognised. IO errors get file-system guidance; anything else is shown with
/// its cause chain.
#[must_use]
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    for cause in error.chain() {
        if let Some(updater_error) = cause.downcast_ref::<UpdaterError>() {
            return create_error_context(updater_error.clone());
        }
    }

    if let Some(io_error) = error.downcast_ref::<std::io::Error>() {
        match io_error.kind() {
            std::io::ErrorKind::PermissionDenied => {
                return ErrorContext::new(UpdaterError::FileSystemError {
                    operation: "file access (permission denied)".to_string(),
                    path: "unknown".to_string(),
                })
                .with_suggestion(
                    "Check ownership of the compose file or run the updater as the user that manages the deployment",
                )
                .with_details("The updater must be able to read and rewrite the compose file");
            }
            std::io::ErrorKind::NotFound => {
                return ErrorContext::new(UpdaterError::FileSystemError {
                    operation: "file access".to_string(),
                    path: "unknown".to_string(),
                })
                .with_suggestion("Check that the file or directory exists and the path is correct")
                .with_details(
                    "This error occurs when a required file or directory cannot be found",
                );
            }
            _ => {}
        }
    }

    // Generic error - include the full error chain for better diagnostics
    let mut message = error.to_string();

    let chain: Vec<String> =
        error.chain().skip(1).map(std::string::ToString::to_string).collect();

    if !chain.is_empty() {
        message.push_str("\n\nCaused by:");
        for (i, cause) in chain.iter().enumerate() {
            message.push_str(&format!("\n  {}: {}", i + 1, cause));
        }
    }

    ErrorContext::new(UpdaterError::Other {
        message,
    })
}

/// Map each [`UpdaterError`] variant to tailored details and a suggestion
fn create_error_context(error: UpdaterError) -> ErrorContext {
    match &error {
        UpdaterError::ComposeFileNotFound { path } => ErrorContext::new(error.clone())
            .with_suggestion(format!(
                "Run the updater from the directory holding your compose file, or pass --compose-file (looked for '{path}')"
            ))
            .with_details("The current image tag is read from the compose file"),

        UpdaterError::ImageNotFound { image, path } => ErrorContext::new(error.clone())
            .with_suggestion(format!(
                "Make sure {path} contains a line like 'image: {image}:<version>'"
            ))
            .with_details("The image reference must use an explicit version tag"),

        UpdaterError::ConfigParseError { file, reason } => ErrorContext::new(error.clone())
            .with_suggestion(format!("Check the TOML syntax in {file}"))
            .with_details(reason.clone()),

        UpdaterError::RegistryUnavailable { reason, .. } => ErrorContext::new(error.clone())
            .with_suggestion("Check your internet connection and that Docker Hub is reachable, then try again")
            .with_details(reason.clone()),

        UpdaterError::NoValidVersion { image } => ErrorContext::new(error.clone())
            .with_suggestion(format!(
                "Check https://hub.docker.com/r/{image}/tags - only the first page of tags is inspected"
            ))
            .with_details("Tags that do not parse as versions (e.g. 'latest') are ignored"),

        UpdaterError::InvalidVersion { tag } => ErrorContext::new(error.clone())
            .with_suggestion(format!(
                "Pin the image in the compose file to a numeric version instead of '{tag}'"
            ))
            .with_details("Versions are compared as major.minor.patch[-prerelease]"),

        UpdaterError::EngineNotFound { .. } => ErrorContext::new(error.clone())
            .with_suggestion("Install Docker Engine with the compose plugin (https://docs.docker.com/engine/install/)")
            .with_details("Pulling images and managing the deployment is done through the docker CLI"),

        UpdaterError::PullFailed { reference, .. } => ErrorContext::new(error.clone())
            .with_suggestion(format!("Try 'docker pull {reference}' manually to see the full error"))
            .with_details("Nothing was changed: the running deployment is untouched"),

        UpdaterError::StopFailed { .. } => ErrorContext::new(error.clone())
            .with_suggestion("Inspect the deployment with 'docker compose ps' and stop it manually before retrying")
            .with_details("The compose file has not been modified"),

        UpdaterError::StartFailed { previous_tag, compose_file, .. } => ErrorContext::new(error.clone())
            .with_suggestion(format!(
                "Check 'docker compose -f {compose_file} logs'. To go back, set the image tag in {compose_file} to {previous_tag} and run 'docker compose -f {compose_file} up -d'"
            ))
            .with_details("The old container was already removed, so no deployment is running right now"),

        UpdaterError::EngineCommandError { reason, .. } => ErrorContext::new(error.clone())
            .with_details(reason.clone()),

        _ => ErrorContext::new(error),
    }
}
