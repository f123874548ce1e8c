//! Version parsing for image tags.
//!
//! Registry tags are plain strings. This module turns the ones that look like
//! versions into [`semver::Version`] values while remembering the original
//! tag text, because the tag (not the normalized version) is what gets pulled
//! and written back into the compose file.
//!
//! # Accepted forms
//!
//! - `2023.2.9999` - plain `major.minor.patch`
//! - `v1.4.0` / `V1.4.0` - leading `v` is ignored
//! - `2024.3` / `7` - missing components are treated as `0`
//! - `2024.1.100-eap.2` - pre-release suffix, ordered below the release
//!
//! Anything else (`latest`, `bogus-tag`, `2024.1.x`) is not a version.
//!
//! [`select_latest`] is stricter than [`parse_tag`]: it only picks tags made of
//! word characters and dots, the alphabet the compose file pattern reads back.
//! Pre-release and build suffixes are compared but never selected.
//!
//! ```rust,no_run
//! use youtrack_updater::version::{TagVersion, parse_tag};
//!
//! # fn example() -> anyhow::Result<()> {
//! let v = parse_tag("2024.3")?;
//! assert_eq!(v, semver::Version::new(2024, 3, 0));
//!
//! let tag = TagVersion::parse("2023.2.9999").unwrap();
//! assert_eq!(tag.tag, "2023.2.9999");
//! # Ok(())
//! # }
//! ```

pub mod comparison;

pub use comparison::VersionComparator;

use semver::Version;
use std::cmp::Ordering;
use std::fmt;

use crate::core::UpdaterError;

/// A registry tag together with the version it parses to.
#[derive(Debug, Clone)]
pub struct TagVersion {
    /// Tag exactly as published
    pub tag: String,
    /// Parsed semantic version
    pub version: Version,
}

impl TagVersion {
    /// Parse a tag, returning `None` when it is not a version.
    #[must_use]
    pub fn parse(tag: &str) -> Option<Self> {
        parse_tag(tag).ok().map(|version| Self {
            tag: tag.to_string(),
            version,
        })
    }

}

impl PartialEq for TagVersion {
    fn eq(&self, other: &Self) -> bool {
        self.version == other.version
    }
}

impl Eq for TagVersion {}

impl PartialOrd for TagVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TagVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.version.cmp(&other.version)
    }
}

impl fmt::Display for TagVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.tag)
    }
}

/// Parse an image tag into a semantic version.
///
/// # Errors
///
/// [`UpdaterError::InvalidVersion`] when the tag is not a version.
pub fn parse_tag(tag: &str) -> Result<Version, UpdaterError> {
    let invalid = || UpdaterError::InvalidVersion {
        tag: tag.to_string(),
    };

    let cleaned = tag.trim().trim_start_matches(['v', 'V']);
    if cleaned.is_empty() {
        return Err(invalid());
    }

    // Split off "-pre" / "+build" so only the numeric core gets padded
    let (core, suffix) = match cleaned.find(['-', '+']) {
        Some(idx) => cleaned.split_at(idx),
        None => (cleaned, ""),
    };

    let components: Vec<&str> = core.split('.').collect();
    if components.len() > 3
        || components.iter().any(|c| c.is_empty() || !c.chars().all(|ch| ch.is_ascii_digit()))
    {
        return Err(invalid());
    }

    let mut padded = components.join(".");
    for _ in components.len()..3 {
        padded.push_str(".0");
    }
    padded.push_str(suffix);

    Version::parse(&padded).map_err(|_| invalid())
}

/// Whether `tag` only uses word characters and dots.
///
/// Must agree with [`image_pattern`](crate::compose::image_pattern): a tag
/// outside this alphabet would be truncated when read back from the compose
/// file.
#[must_use]
pub fn is_pinnable(tag: &str) -> bool {
    !tag.is_empty() && tag.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '.')
}

/// Pick the highest version among `tags`, ignoring the ones that are not
/// versions or cannot be pinned in the compose file.
///
/// Ties keep the first tag seen, so `2024.3` wins over a later `2024.3.0`.
pub fn select_latest<I, S>(tags: I) -> Option<TagVersion>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut latest: Option<TagVersion> = None;

    for tag in tags {
        if !is_pinnable(tag.as_ref()) {
            tracing::trace!("Skipping tag outside the compose tag alphabet: {}", tag.as_ref());
            continue;
        }
        let Some(candidate) = TagVersion::parse(tag.as_ref()) else {
            tracing::trace!("Skipping non-version tag: {}", tag.as_ref());
            continue;
        };

        match &latest {
            Some(current) if candidate <= *current => {}
            _ => latest = Some(candidate),
        }
    }

    latest
}
