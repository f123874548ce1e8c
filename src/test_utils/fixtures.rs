//! Compose file fixtures

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A `docker-compose.yml` in its own temporary directory.
///
/// The directory is removed when the fixture is dropped.
#[derive(Debug)]
pub struct ComposeFixture {
    dir: TempDir,
    path: PathBuf,
}

impl ComposeFixture {
    /// Typical single-service deployment pinned to `jetbrains/youtrack:<tag>`.
    pub fn with_tag(tag: &str) -> Result<Self> {
        Self::with_content(&Self::content_for(tag))
    }

    /// Compose file with arbitrary content.
    pub fn with_content(content: &str) -> Result<Self> {
        let dir = TempDir::new().context("Failed to create temp dir")?;
        let path = dir.path().join("docker-compose.yml");
        fs::write(&path, content)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(Self {
            dir,
            path,
        })
    }

    /// The text [`with_tag`](Self::with_tag) writes for `tag`.
    #[must_use]
    pub fn content_for(tag: &str) -> String {
        format!(
            r#"services:
  youtrack:
    image: jetbrains/youtrack:{tag}
    container_name: youtrack
    restart: unless-stopped
    volumes:
      - ./data:/opt/youtrack/data
      - ./conf:/opt/youtrack/conf
      - ./logs:/opt/youtrack/logs
      - ./backups:/opt/youtrack/backups
    ports:
      - "8080:8080"
"#
        )
    }

    /// Path of the compose file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Directory holding the compose file.
    #[must_use]
    pub fn dir(&self) -> &Path {
        self.dir.path()
    }

    /// Current content of the compose file.
    pub fn read(&self) -> Result<String> {
        fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read {}", self.path.display()))
    }
}
