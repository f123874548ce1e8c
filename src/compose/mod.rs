//! Reading and rewriting the image tag in a compose file.
//!
//! The compose file is treated as plain text, not parsed as YAML. The managed
//! image is located with the pattern `<image>:([\w.]+)`, so formatting,
//! comments and unrelated services survive a rewrite byte for byte.
//!
//! # Example
//!
//! ```rust,no_run
//! use youtrack_updater::compose::ComposeFile;
//! use std::path::Path;
//!
//! # fn example() -> anyhow::Result<()> {
//! let compose = ComposeFile::new(Path::new("docker-compose.yml"), "jetbrains/youtrack")?;
//! let current = compose.read_tag()?;
//! println!("Running {current}");
//!
//! let replaced = compose.rewrite_tag("2023.2.9999")?;
//! assert!(replaced >= 1);
//! # Ok(())
//! # }
//! ```

use anyhow::{Context, Result};
use regex::{NoExpand, Regex};
use std::fs;
use std::path::{Path, PathBuf};

use crate::core::UpdaterError;
use crate::utils::safe_write;

/// A compose file and the image reference it pins.
#[derive(Debug, Clone)]
pub struct ComposeFile {
    path: PathBuf,
    image: String,
    pattern: Regex,
}

impl ComposeFile {
    /// Bind a compose file path to the image whose tag is managed.
    ///
    /// The file is not read until [`read_tag`](Self::read_tag) or
    /// [`rewrite_tag`](Self::rewrite_tag) is called.
    pub fn new(path: impl Into<PathBuf>, image: &str) -> Result<Self> {
        let pattern = image_pattern(image)?;
        Ok(Self {
            path: path.into(),
            image: image.to_string(),
            pattern,
        })
    }

    /// Path of the compose file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Image name, without tag.
    #[must_use]
    pub fn image(&self) -> &str {
        &self.image
    }

    /// Tag of the first occurrence of the image in the file.
    ///
    /// # Errors
    ///
    /// - [`UpdaterError::ComposeFileNotFound`] if the file does not exist
    /// - [`UpdaterError::ImageNotFound`] if the image is not referenced
    pub fn read_tag(&self) -> Result<String> {
        let content = self.read()?;
        find_tag(&self.pattern, &content).map(str::to_string).ok_or_else(|| {
            UpdaterError::ImageNotFound {
                image: self.image.clone(),
                path: self.path.display().to_string(),
            }
            .into()
        })
    }

    /// Replace the tag of every occurrence of the image with `new_tag`.
    ///
    /// The file is written atomically. Returns the number of references that
    /// were rewritten.
    ///
    /// # Errors
    ///
    /// Fails if the file is missing, references no image or cannot be written.
    /// Nothing is written in the first two cases.
    pub fn rewrite_tag(&self, new_tag: &str) -> Result<usize> {
        let content = self.read()?;
        let (updated, count) = replace_tag(&self.pattern, &self.image, &content, new_tag);

        if count == 0 {
            return Err(UpdaterError::ImageNotFound {
                image: self.image.clone(),
                path: self.path.display().to_string(),
            }
            .into());
        }

        safe_write(&self.path, &updated).with_context(|| {
            format!("Failed to write updated compose file: {}", self.path.display())
        })?;

        tracing::debug!(
            "Rewrote {count} reference(s) to {}:{new_tag} in {}",
            self.image,
            self.path.display()
        );

        Ok(count)
    }

    fn read(&self) -> Result<String> {
        if !self.path.exists() {
            return Err(UpdaterError::ComposeFileNotFound {
                path: self.path.display().to_string(),
            }
            .into());
        }

        fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read compose file: {}", self.path.display()))
    }
}

/// Regex matching `<image>:<tag>` and capturing the tag.
///
/// The image name is escaped; the tag alphabet is word characters and dots.
pub fn image_pattern(image: &str) -> Result<Regex> {
    let pattern = format!(r"{}:([\w.]+)", regex::escape(image));
    Regex::new(&pattern).with_context(|| format!("Invalid image name: {image}"))
}

/// First tag captured by `pattern` in `content`.
#[must_use]
pub fn find_tag<'a>(pattern: &Regex, content: &'a str) -> Option<&'a str> {
    pattern.captures(content).and_then(|caps| caps.get(1)).map(|m| m.as_str())
}

/// Replace every `<image>:<tag>` in `content` with `<image>:<new_tag>`.
///
/// Returns the new text and the number of replacements.
#[must_use]
pub fn replace_tag(pattern: &Regex, image: &str, content: &str, new_tag: &str) -> (String, usize) {
    let count = pattern.find_iter(content).count();
    if count == 0 {
        return (content.to_string(), 0);
    }

    let replacement = format!("{image}:{new_tag}");
    let updated = pattern.replace_all(content, NoExpand(&replacement)).into_owned();
    (updated, count)
}
