//! Docker Hub tag listing.
//!
//! Tags are fetched with a single request:
//!
//! ```text
//! GET {registry_url}/v2/repositories/{image}/tags?page_size={page_size}
//! ```
//!
//! and the response body is expected to look like
//! `{"results": [{"name": "2023.2.9999"}, ...]}`. Only this first page is
//! considered, so with the default page size of 100 a newer tag that the
//! registry orders further down is missed.

use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;

use crate::config::UpdaterConfig;
use crate::constants::USER_AGENT;
use crate::core::UpdaterError;
use crate::version::{TagVersion, VersionComparator};

/// One page of the tag listing. Fields other than `results` are ignored.
#[derive(Debug, Deserialize)]
pub struct TagsPage {
    pub results: Vec<TagEntry>,
}

#[derive(Debug, Deserialize)]
pub struct TagEntry {
    pub name: String,
}

/// Anything that can name the newest published tag.
#[async_trait]
pub trait TagSource: Send + Sync {
    /// Highest valid version currently published.
    async fn latest_tag(&self) -> Result<TagVersion>;
}

/// HTTP client for the registry tag listing.
#[derive(Debug, Clone)]
pub struct RegistryClient {
    client: reqwest::Client,
    url: String,
    image: String,
}

impl RegistryClient {
    /// Build a client for the image and registry named in `config`.
    ///
    /// # Errors
    ///
    /// Fails if the HTTP client cannot be constructed.
    pub fn new(config: &UpdaterConfig) -> Result<Self> {
        let url = format!(
            "{}/v2/repositories/{}/tags?page_size={}",
            config.registry_url.trim_end_matches('/'),
            config.image,
            config.page_size
        );

        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(config.http_timeout())
            .build()
            .map_err(|e| UpdaterError::RegistryUnavailable {
                url: url.clone(),
                reason: format!("Failed to build HTTP client: {e}"),
            })?;

        Ok(Self {
            client,
            url,
            image: config.image.clone(),
        })
    }

    /// URL of the tag listing request.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// All tag names on the first page, in registry order.
    ///
    /// # Errors
    ///
    /// [`UpdaterError::RegistryUnavailable`] on transport failure, a non-2xx
    /// status or a body without a `results` list.
    pub async fn fetch_tags(&self) -> Result<Vec<String>> {
        tracing::debug!("Fetching tags from {}", self.url);

        let unavailable = |reason: String| UpdaterError::RegistryUnavailable {
            url: self.url.clone(),
            reason,
        };

        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| unavailable(format!("Request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let body = body.trim();
            return Err(if body.is_empty() {
                unavailable(format!("Registry returned {status}"))
            } else {
                unavailable(format!("Registry returned {status}: {body}"))
            }
            .into());
        }

        let page: TagsPage = response
            .json()
            .await
            .map_err(|e| unavailable(format!("Failed to parse response: {e}")))?;

        let tags: Vec<String> = page.results.into_iter().map(|entry| entry.name).collect();
        tracing::debug!("Registry returned {} tag(s)", tags.len());

        Ok(tags)
    }
}

#[async_trait]
impl TagSource for RegistryClient {
    async fn latest_tag(&self) -> Result<TagVersion> {
        let tags = self.fetch_tags().await?;

        let latest = VersionComparator::get_latest(&tags).ok_or_else(|| UpdaterError::NoValidVersion {
            image: self.image.clone(),
        })?;

        tracing::info!("Latest {} tag on the registry: {}", self.image, latest.tag);
        Ok(latest)
    }
}
