//! Comparison helpers used by the upgrade check.
//!
//! The installed tag comes from the compose file and the candidate tag from
//! the registry. Both go through [`parse_tag`](super::parse_tag) so that
//! `2024.3` and `2024.3.0` compare equal.
//!
//! ```rust,no_run
//! use youtrack_updater::version::VersionComparator;
//!
//! # fn example() -> anyhow::Result<()> {
//! assert!(VersionComparator::is_newer("2023.1.12345", "2023.2.9999")?);
//! assert!(!VersionComparator::is_newer("2023.2.9999", "2023.2.9999")?);
//! # Ok(())
//! # }
//! ```

use std::cmp::Ordering;

use super::{TagVersion, parse_tag, select_latest};
use crate::core::UpdaterError;

/// Semantic comparison of image tags.
pub struct VersionComparator;

impl VersionComparator {
    /// Compare two tags by semantic version precedence.
    ///
    /// Build metadata is ignored, pre-releases order below their release.
    ///
    /// # Errors
    ///
    /// [`UpdaterError::InvalidVersion`] when either tag is not a version.
    pub fn compare(a: &str, b: &str) -> Result<Ordering, UpdaterError> {
        let a = parse_tag(a)?;
        let b = parse_tag(b)?;
        Ok(a.cmp_precedence(&b))
    }

    /// Whether `candidate` is strictly newer than `current`.
    ///
    /// # Errors
    ///
    /// [`UpdaterError::InvalidVersion`] when either tag is not a version.
    pub fn is_newer(current: &str, candidate: &str) -> Result<bool, UpdaterError> {
        Ok(Self::compare(candidate, current)? == Ordering::Greater)
    }

    /// Latest valid version in `tags`, skipping malformed entries and tags the
    /// compose file cannot pin (see [`select_latest`]).
    #[must_use]
    pub fn get_latest(tags: &[String]) -> Option<TagVersion> {
        select_latest(tags)
    }
}
