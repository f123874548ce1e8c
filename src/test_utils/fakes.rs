//! Stand-ins for the container engine, the prompt and the registry.

use anyhow::Result;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::io::Cursor;
use std::sync::{Arc, Mutex};
use tokio::io::{BufReader, DuplexStream};

use crate::cli::prompt::Prompt;
use crate::core::UpdaterError;
use crate::engine::ContainerEngine;
use crate::logwatch::LogStream;
use crate::registry::TagSource;
use crate::version::{TagVersion, select_latest};

/// What [`RecordingEngine::follow_logs`] produces.
#[derive(Debug, Clone)]
pub enum LogScript {
    /// These bytes, then end of stream
    Lines(String),
    /// A stream that stays open and never yields a line
    Silent,
    /// Spawning the log follower fails
    SpawnError,
}

/// [`ContainerEngine`] that records every call and returns scripted exit
/// codes. All codes default to `0`.
#[derive(Debug, Clone)]
pub struct RecordingEngine {
    calls: Arc<Mutex<Vec<String>>>,
    held_streams: Arc<Mutex<Vec<DuplexStream>>>,
    available: bool,
    pull_code: i32,
    down_code: i32,
    up_code: i32,
    rmi_code: i32,
    logs: LogScript,
}

impl Default for RecordingEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingEngine {
    #[must_use]
    pub fn new() -> Self {
        Self {
            calls: Arc::default(),
            held_streams: Arc::default(),
            available: true,
            pull_code: 0,
            down_code: 0,
            up_code: 0,
            rmi_code: 0,
            logs: LogScript::Lines(String::new()),
        }
    }

    #[must_use]
    pub const fn unavailable(mut self) -> Self {
        self.available = false;
        self
    }

    #[must_use]
    pub const fn with_pull_code(mut self, code: i32) -> Self {
        self.pull_code = code;
        self
    }

    #[must_use]
    pub const fn with_down_code(mut self, code: i32) -> Self {
        self.down_code = code;
        self
    }

    #[must_use]
    pub const fn with_up_code(mut self, code: i32) -> Self {
        self.up_code = code;
        self
    }

    #[must_use]
    pub const fn with_rmi_code(mut self, code: i32) -> Self {
        self.rmi_code = code;
        self
    }

    #[must_use]
    pub fn with_logs(mut self, logs: LogScript) -> Self {
        self.logs = logs;
        self
    }

    /// Calls made so far, e.g. `["pull jetbrains/youtrack:2023.2.9999", "down"]`.
    #[must_use]
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().map(|calls| calls.clone()).unwrap_or_default()
    }

    /// Whether any call that changes the deployment was made.
    #[must_use]
    pub fn mutated(&self) -> bool {
        self.calls().iter().any(|call| {
            call.starts_with("pull") || call == "down" || call == "up" || call.starts_with("rmi")
        })
    }

    fn record(&self, call: impl Into<String>) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call.into());
        }
    }
}

#[async_trait]
impl ContainerEngine for RecordingEngine {
    fn ensure_available(&self) -> Result<()> {
        if self.available {
            Ok(())
        } else {
            Err(UpdaterError::EngineNotFound {
                command: "docker".to_string(),
            }
            .into())
        }
    }

    async fn pull(&self, reference: &str) -> Result<i32> {
        self.record(format!("pull {reference}"));
        Ok(self.pull_code)
    }

    async fn compose_down(&self) -> Result<i32> {
        self.record("down");
        Ok(self.down_code)
    }

    async fn compose_up_detached(&self) -> Result<i32> {
        self.record("up");
        Ok(self.up_code)
    }

    async fn follow_logs(&self) -> Result<LogStream> {
        self.record("logs");
        match &self.logs {
            LogScript::Lines(text) => {
                Ok(LogStream::from_reader(Cursor::new(text.clone().into_bytes())))
            }
            LogScript::Silent => {
                let (writer, reader) = tokio::io::duplex(64);
                if let Ok(mut held) = self.held_streams.lock() {
                    held.push(writer);
                }
                Ok(LogStream::from_reader(BufReader::new(reader)))
            }
            LogScript::SpawnError => Err(UpdaterError::EngineCommandError {
                operation: "docker compose logs -f".to_string(),
                reason: "spawn failed".to_string(),
            }
            .into()),
        }
    }

    async fn remove_image(&self, reference: &str) -> Result<i32> {
        self.record(format!("rmi {reference}"));
        Ok(self.rmi_code)
    }
}

/// [`Prompt`] that replays fixed answers and remembers the questions.
///
/// Once the answers run out every further question is declined.
#[derive(Debug, Clone, Default)]
pub struct ScriptedPrompt {
    answers: VecDeque<bool>,
    questions: Arc<Mutex<Vec<String>>>,
}

impl ScriptedPrompt {
    #[must_use]
    pub fn answering(answers: &[bool]) -> Self {
        Self {
            answers: answers.iter().copied().collect(),
            questions: Arc::default(),
        }
    }

    /// Questions asked so far.
    #[must_use]
    pub fn questions(&self) -> Vec<String> {
        self.questions.lock().map(|q| q.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Prompt for ScriptedPrompt {
    async fn confirm(&mut self, question: &str) -> Result<bool> {
        if let Ok(mut questions) = self.questions.lock() {
            questions.push(question.to_string());
        }
        Ok(self.answers.pop_front().unwrap_or(false))
    }
}

/// [`TagSource`] over a fixed tag list.
#[derive(Debug, Clone)]
pub struct FixedTags {
    tags: Vec<String>,
}

impl FixedTags {
    pub fn new<I, S>(tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tags: tags.into_iter().map(Into::into).collect(),
        }
    }
}

#[async_trait]
impl TagSource for FixedTags {
    async fn latest_tag(&self) -> Result<TagVersion> {
        select_latest(&self.tags).ok_or_else(|| {
            UpdaterError::NoValidVersion {
                image: "jetbrains/youtrack".to_string(),
            }
            .into()
        })
    }
}
