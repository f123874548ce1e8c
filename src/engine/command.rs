//! Builder for container engine invocations.
//!
//! Every `docker ...` call made by the updater goes through [`EngineCommand`]
//! so that command lines are logged the same way and spawn failures map to
//! [`UpdaterError::EngineCommandError`].

use anyhow::Result;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::{Child, Command};
use tokio::time::timeout;

use crate::core::UpdaterError;

/// Fluent builder for one engine process.
///
/// ```rust,no_run
/// use youtrack_updater::engine::command::EngineCommand;
///
/// # async fn example() -> anyhow::Result<()> {
/// let code = EngineCommand::new("docker")
///     .args(["pull", "jetbrains/youtrack:2023.2.9999"])
///     .inherit_stdio()
///     .status()
///     .await?;
/// assert_eq!(code, 0);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct EngineCommand {
    /// Engine binary, e.g. `docker`
    program: String,

    /// Arguments after the binary
    args: Vec<String>,

    /// Inherit stdio (true) or discard output (false)
    inherit_stdio: bool,

    /// Maximum duration to wait for completion (None = no timeout)
    timeout_duration: Option<Duration>,
}

impl EngineCommand {
    /// New command for `program` with no arguments.
    ///
    /// Output is discarded and there is no timeout until configured otherwise.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            inherit_stdio: false,
            timeout_duration: None,
        }
    }

    /// Append one argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Let the process write straight to the operator's terminal.
    pub const fn inherit_stdio(mut self) -> Self {
        self.inherit_stdio = true;
        self
    }

    /// Set a timeout for [`status`](Self::status) (None for no timeout).
    pub const fn with_timeout(mut self, duration: Option<Duration>) -> Self {
        self.timeout_duration = duration;
        self
    }

    /// Full command line, for logs and error messages.
    #[must_use]
    pub fn display(&self) -> String {
        if self.args.is_empty() {
            self.program.clone()
        } else {
            format!("{} {}", self.program, self.args.join(" "))
        }
    }

    /// Run to completion and return the exit code.
    ///
    /// A non-zero exit is not an error here; callers decide what it means.
    /// A process killed by a signal reports `-1`.
    ///
    /// # Errors
    ///
    /// [`UpdaterError::EngineCommandError`] if the process cannot be spawned
    /// or exceeds the timeout.
    pub async fn status(self) -> Result<i32> {
        let command_line = self.display();
        tracing::debug!(target: "engine", "Executing command: {command_line}");

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args).stdin(Stdio::null());
        if self.inherit_stdio {
            cmd.stdout(Stdio::inherit()).stderr(Stdio::inherit());
        } else {
            cmd.stdout(Stdio::null()).stderr(Stdio::null());
        }
        cmd.kill_on_drop(true);

        let start = std::time::Instant::now();
        let status_future = cmd.status();

        let status = if let Some(duration) = self.timeout_duration {
            match timeout(duration, status_future).await {
                Ok(result) => result,
                Err(_) => {
                    tracing::warn!(
                        target: "engine",
                        "Command timed out after {} seconds: {command_line}",
                        duration.as_secs()
                    );
                    return Err(UpdaterError::EngineCommandError {
                        operation: command_line,
                        reason: format!("timed out after {} seconds", duration.as_secs()),
                    }
                    .into());
                }
            }
        } else {
            status_future.await
        };

        let status = status.map_err(|e| UpdaterError::EngineCommandError {
            operation: command_line.clone(),
            reason: e.to_string(),
        })?;

        let code = status.code().unwrap_or(-1);
        tracing::debug!(
            target: "engine",
            "Command exited with code {code} after {:.2}s",
            start.elapsed().as_secs_f64()
        );

        Ok(code)
    }

    /// Spawn with stdout and stderr piped, for streaming consumers.
    ///
    /// The child is killed if it is dropped while still running.
    ///
    /// # Errors
    ///
    /// [`UpdaterError::EngineCommandError`] if the process cannot be spawned.
    pub fn spawn_piped(self) -> Result<Child> {
        let command_line = self.display();
        tracing::debug!(target: "engine", "Spawning command: {command_line}");

        Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                UpdaterError::EngineCommandError {
                    operation: command_line,
                    reason: e.to_string(),
                }
                .into()
            })
    }
}
