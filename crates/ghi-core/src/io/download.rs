//! Streaming asset download into the scratch directory.

use std::path::Path;

use futures::StreamExt;
use reqwest::Client;
use thiserror::Error;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;

use crate::Reporter;

#[derive(Error, Debug)]
pub enum DownloadError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Download failed: HTTP {status} from {url}")]
    Status { status: u16, url: String },
}

/// Download `url` to `dest`, reporting progress under `label`.
///
/// A partially written file is removed on failure. Returns the number of
/// bytes written.
///
/// # Errors
///
/// Returns a [`DownloadError`] for non-success statuses, transport errors, or
/// local write failures.
pub async fn download_to(
    client: &Client,
    url: &str,
    dest: &Path,
    label: &str,
    reporter: &dyn Reporter,
) -> Result<u64, DownloadError> {
    let result = stream_to_file(client, url, dest, label, reporter).await;
    if result.is_err() {
        tokio::fs::remove_file(dest).await.ok();
    }
    result
}

async fn stream_to_file(
    client: &Client,
    url: &str,
    dest: &Path,
    label: &str,
    reporter: &dyn Reporter,
) -> Result<u64, DownloadError> {
    let response = client
        .get(url)
        .header(reqwest::header::USER_AGENT, crate::USER_AGENT)
        .send()
        .await?;
    if !response.status().is_success() {
        return Err(DownloadError::Status {
            status: response.status().as_u16(),
            url: url.to_string(),
        });
    }

    let total_size = response.content_length();
    reporter.downloading(label, 0, total_size);

    let mut file = File::create(dest).await?;
    let mut stream = response.bytes_stream();
    let mut downloaded: u64 = 0;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        file.write_all(&chunk).await?;
        downloaded += chunk.len() as u64;
        reporter.downloading(label, downloaded, total_size);
    }

    file.flush().await?;
    tracing::debug!("Downloaded {downloaded} bytes to {}", dest.display());
    Ok(downloaded)
}
