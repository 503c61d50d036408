//! Release metadata lookup against the GitHub REST API.

use ghi_schema::Release;
use reqwest::Client;
use thiserror::Error;

use crate::repo::GitHubRepo;

#[derive(Error, Debug)]
pub enum ReleaseError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Release lookup failed: HTTP {status} from {url}")]
    Status { status: u16, url: String },
}

/// Tag value that selects the most recent non-draft, non-prerelease release.
pub const LATEST: &str = "latest";

/// Thin client for the releases endpoints.
#[derive(Debug, Clone)]
pub struct ReleaseClient {
    client: Client,
    api_url: String,
    token: Option<String>,
}

impl ReleaseClient {
    /// Create a client against `api_url` (e.g. `https://api.github.com`),
    /// optionally authenticating with a bearer token.
    pub fn new(client: Client, api_url: impl Into<String>, token: Option<String>) -> Self {
        Self {
            client,
            api_url: api_url.into().trim_end_matches('/').to_string(),
            token: token.filter(|t| !t.is_empty()),
        }
    }

    /// Endpoint URL for `tag` of `repo`.
    pub fn release_url(&self, repo: &GitHubRepo, tag: &str) -> String {
        if tag == LATEST {
            format!("{}/repos/{repo}/releases/latest", self.api_url)
        } else {
            format!("{}/repos/{repo}/releases/tags/{tag}", self.api_url)
        }
    }

    /// Fetch release metadata for `tag` (or [`LATEST`]).
    ///
    /// # Errors
    ///
    /// Returns [`ReleaseError::Status`] for a non-success response and
    /// [`ReleaseError::Http`] for transport or JSON decoding failures.
    pub async fn fetch(&self, repo: &GitHubRepo, tag: &str) -> Result<Release, ReleaseError> {
        let url = self.release_url(repo, tag);
        tracing::debug!("Fetching release metadata from {url}");

        let mut request = self
            .client
            .get(&url)
            .header(reqwest::header::USER_AGENT, crate::USER_AGENT)
            .header(reqwest::header::ACCEPT, "application/vnd.github+json");
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(ReleaseError::Status {
                status: response.status().as_u16(),
                url,
            });
        }

        let release: Release = response.json().await?;
        tracing::debug!(
            "Release {} has {} assets",
            release.tag_name,
            release.assets.len()
        );
        Ok(release)
    }
}
