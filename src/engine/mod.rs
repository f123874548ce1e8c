//! Container engine access.
//!
//! The upgrade drives a compose deployment through the engine CLI:
//!
//! - `docker pull <image>:<tag>`
//! - `docker compose -f <file> down`
//! - `docker compose -f <file> up -d`
//! - `docker compose -f <file> logs -f`
//! - `docker rmi <image>:<tag>`
//!
//! [`ContainerEngine`] is the seam the orchestrator talks to; [`DockerEngine`]
//! is the real implementation. Exit codes are returned as-is and interpreted
//! by the caller.

pub mod command;

use anyhow::Result;
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWriteExt, BufReader, DuplexStream};
use tokio::sync::Mutex;

use crate::constants::REMOVE_IMAGE_TIMEOUT_SECS;
use crate::core::UpdaterError;
use crate::logwatch::LogStream;
use crate::utils::command_exists;
use command::EngineCommand;

/// Operations the upgrade needs from a container engine.
#[async_trait]
pub trait ContainerEngine: Send + Sync {
    /// Check the engine can be invoked at all.
    fn ensure_available(&self) -> Result<()> {
        Ok(())
    }

    /// Pull `reference` (`image:tag`). Returns the exit code.
    async fn pull(&self, reference: &str) -> Result<i32>;

    /// Stop and remove the deployment's containers. Returns the exit code.
    async fn compose_down(&self) -> Result<i32>;

    /// Start the deployment in the background. Returns the exit code.
    async fn compose_up_detached(&self) -> Result<i32>;

    /// Follow the deployment's logs, stdout and stderr merged.
    async fn follow_logs(&self) -> Result<LogStream>;

    /// Remove the local image `reference`. Returns the exit code.
    async fn remove_image(&self, reference: &str) -> Result<i32>;
}

/// Fail with [`UpdaterError::EngineNotFound`] unless `program` is on PATH.
pub fn ensure_available(program: &str) -> Result<()> {
    if command_exists(program) {
        Ok(())
    } else {
        Err(UpdaterError::EngineNotFound {
            command: program.to_string(),
        }
        .into())
    }
}

/// [`ContainerEngine`] backed by the `docker` CLI and its compose plugin.
#[derive(Debug, Clone)]
pub struct DockerEngine {
    program: String,
    compose_file: PathBuf,
}

impl DockerEngine {
    /// Engine for the deployment described by `compose_file`.
    pub fn new(program: impl Into<String>, compose_file: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            compose_file: compose_file.into(),
        }
    }

    fn compose(&self) -> EngineCommand {
        EngineCommand::new(&self.program)
            .arg("compose")
            .arg("-f")
            .arg(self.compose_file.display().to_string())
    }
}

#[async_trait]
impl ContainerEngine for DockerEngine {
    fn ensure_available(&self) -> Result<()> {
        ensure_available(&self.program)
    }

    async fn pull(&self, reference: &str) -> Result<i32> {
        EngineCommand::new(&self.program).args(["pull", reference]).inherit_stdio().status().await
    }

    async fn compose_down(&self) -> Result<i32> {
        self.compose().arg("down").inherit_stdio().status().await
    }

    async fn compose_up_detached(&self) -> Result<i32> {
        self.compose().args(["up", "-d"]).inherit_stdio().status().await
    }

    async fn follow_logs(&self) -> Result<LogStream> {
        let mut child = self.compose().args(["logs", "-f"]).spawn_piped()?;

        let (writer, reader) = tokio::io::duplex(64 * 1024);
        let writer = Arc::new(Mutex::new(writer));

        if let Some(stdout) = child.stdout.take() {
            tokio::spawn(forward_lines(stdout, Arc::clone(&writer)));
        }
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(forward_lines(stderr, Arc::clone(&writer)));
        }
        // The merged stream hits EOF once both forwarders drop their handle
        drop(writer);

        Ok(LogStream::with_child(BufReader::new(reader), child))
    }

    async fn remove_image(&self, reference: &str) -> Result<i32> {
        EngineCommand::new(&self.program)
            .args(["rmi", reference])
            .with_timeout(Some(Duration::from_secs(REMOVE_IMAGE_TIMEOUT_SECS)))
            .status()
            .await
    }
}

/// Copy whole lines from `source` into the shared merged stream.
async fn forward_lines<R>(source: R, sink: Arc<Mutex<DuplexStream>>)
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(source);
    let mut line = Vec::new();

    loop {
        line.clear();
        match reader.read_until(b'\n', &mut line).await {
            Ok(0) | Err(_) => break,
            Ok(_) => {
                let mut sink = sink.lock().await;
                if sink.write_all(&line).await.is_err() {
                    // Watcher is gone
                    break;
                }
            }
        }
    }
}
