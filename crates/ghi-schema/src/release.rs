//! Release metadata as returned by the GitHub releases API.

use serde::{Deserialize, Serialize};

/// One downloadable file attached to a release.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    /// File name as published (e.g. `lego_v4.17.4_linux_amd64.tar.gz`).
    pub name: String,
    /// Direct download URL.
    #[serde(rename = "browser_download_url")]
    pub download_url: String,
}

impl Asset {
    /// Create an asset from a name and download URL.
    pub fn new(name: impl Into<String>, download_url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            download_url: download_url.into(),
        }
    }
}

/// A tagged, published snapshot of a repository.
///
/// Only the fields the installer needs are modelled; everything else in the
/// API response is ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Release {
    /// Git tag the release was cut from (e.g. `v4.17.4`).
    pub tag_name: String,
    /// Files attached to the release, in API order.
    #[serde(default)]
    pub assets: Vec<Asset>,
}
