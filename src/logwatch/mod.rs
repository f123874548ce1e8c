//! Bounded scan of a live log stream for the setup link.
//!
//! After the new container starts, the application prints a one-time setup
//! URL on a line containing a marker (`wizard_token` by default), with the URL
//! in square brackets:
//!
//! ```text
//! youtrack-1  | ... access [http://0.0.0.0:8080/?wizard_token=abc123] to finish setup
//! ```
//!
//! [`LogWatcher::watch`] reads lines until that marker appears, the stream
//! closes, or an absolute deadline passes. The deadline covers the whole
//! watch, not each line.

use regex::Regex;
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::process::Child;
use tokio::time::{Instant, timeout_at};

use crate::constants::{DEFAULT_SETUP_MARKER, default_log_timeout};

/// How a log watch ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchOutcome {
    /// Marker line found and it carried a bracketed URL
    SetupUrl(String),
    /// Marker line found without a bracketed URL
    MarkerWithoutUrl,
    /// The deadline passed before the marker appeared
    TimedOut,
    /// The stream ended before the marker appeared
    StreamClosed,
}

impl WatchOutcome {
    /// The setup URL, if one was found.
    #[must_use]
    pub fn setup_url(&self) -> Option<&str> {
        match self {
            Self::SetupUrl(url) => Some(url),
            _ => None,
        }
    }
}

/// Watches a line stream for the setup marker.
#[derive(Debug, Clone)]
pub struct LogWatcher {
    marker: String,
    timeout: Duration,
}

impl Default for LogWatcher {
    fn default() -> Self {
        Self::new(DEFAULT_SETUP_MARKER, default_log_timeout())
    }
}

impl LogWatcher {
    /// Watcher for `marker` that gives up after `timeout`.
    pub fn new(marker: impl Into<String>, timeout: Duration) -> Self {
        Self {
            marker: marker.into(),
            timeout,
        }
    }

    /// Total time allowed for one watch.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Read `reader` line by line until the marker, EOF or the deadline.
    ///
    /// Read errors end the watch like a closed stream. Lines that are not
    /// valid UTF-8 are decoded lossily.
    pub async fn watch<R>(&self, reader: &mut R) -> WatchOutcome
    where
        R: AsyncBufRead + Unpin + ?Sized,
    {
        let deadline = Instant::now() + self.timeout;
        let mut buf = Vec::new();

        loop {
            buf.clear();
            let read = match timeout_at(deadline, reader.read_until(b'\n', &mut buf)).await {
                Ok(read) => read,
                Err(_) => {
                    tracing::debug!("No '{}' line within {:?}", self.marker, self.timeout);
                    return WatchOutcome::TimedOut;
                }
            };

            match read {
                Ok(0) => return WatchOutcome::StreamClosed,
                Ok(_) => {}
                Err(e) => {
                    tracing::debug!("Log stream read failed: {e}");
                    return WatchOutcome::StreamClosed;
                }
            }

            let line = String::from_utf8_lossy(&buf);
            tracing::trace!("log: {}", line.trim_end());

            if line.contains(&self.marker) {
                return match extract_setup_url(&line) {
                    Some(url) => WatchOutcome::SetupUrl(url.to_string()),
                    None => WatchOutcome::MarkerWithoutUrl,
                };
            }
        }
    }
}

/// First match of `\[([^;]*)\]` in `line`.
///
/// The group is greedy, so with several bracket pairs on one line the capture
/// runs to the last `]` before any `;`.
#[must_use]
pub fn extract_setup_url(line: &str) -> Option<&str> {
    let re = Regex::new(r"\[([^;]*)\]").ok()?;
    re.captures(line).and_then(|caps| caps.get(1)).map(|m| m.as_str())
}

/// A followed log stream, optionally backed by the process producing it.
///
/// The process is killed by [`stop`](Self::stop) and, as a fallback, when the
/// stream is dropped.
pub struct LogStream {
    reader: Box<dyn AsyncBufRead + Unpin + Send>,
    child: Option<Child>,
}

impl std::fmt::Debug for LogStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogStream").field("child", &self.child.as_ref().and_then(Child::id)).finish()
    }
}

impl LogStream {
    /// Stream over an in-memory or otherwise process-less reader.
    pub fn from_reader(reader: impl AsyncBufRead + Unpin + Send + 'static) -> Self {
        Self {
            reader: Box::new(reader),
            child: None,
        }
    }

    /// Stream fed by `child`, which must have been spawned with `kill_on_drop`.
    pub fn with_child(reader: impl AsyncBufRead + Unpin + Send + 'static, child: Child) -> Self {
        Self {
            reader: Box::new(reader),
            child: Some(child),
        }
    }

    /// Reader to hand to [`LogWatcher::watch`].
    pub fn reader(&mut self) -> &mut (dyn AsyncBufRead + Unpin + Send) {
        self.reader.as_mut()
    }

    /// Terminate the log follower, if any.
    pub async fn stop(mut self) {
        if let Some(mut child) = self.child.take() {
            if let Err(e) = child.kill().await {
                tracing::debug!("Failed to stop log follower: {e}");
            }
        }
    }
}
