//! Shared run context.
//!
//! Groups the HTTP clients, host facts and reporter that every step of a run
//! needs.

use std::fmt;
use std::sync::Arc;

use ghi_core::{ReleaseClient, Reporter};
use ghi_schema::HostPlatform;

#[derive(Clone)]
pub struct Context {
    pub client: reqwest::Client,
    pub releases: ReleaseClient,
    pub host: HostPlatform,
    pub reporter: Arc<dyn Reporter>,
    pub dry_run: bool,
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("host", &self.host)
            .field("dry_run", &self.dry_run)
            .finish_non_exhaustive()
    }
}

impl Context {
    /// Context for this machine, talking to `api_url` with an optional token.
    pub fn new(
        api_url: &str,
        token: Option<String>,
        reporter: Arc<dyn Reporter>,
        dry_run: bool,
    ) -> Self {
        let client = reqwest::Client::new();
        Self {
            releases: ReleaseClient::new(client.clone(), api_url, token),
            client,
            host: HostPlatform::current(),
            reporter,
            dry_run,
        }
    }
}
