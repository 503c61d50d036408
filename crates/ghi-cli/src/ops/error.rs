//! Failures of a single run, grouped by how a caller should react to them

use ghi_core::{
    Conflict, DownloadError, ExtractError, InstallError, ReleaseError, RepoError, RuleError,
    VersionError,
};
use ghi_schema::{PatternError, SelectError};
use thiserror::Error;

/// Broad class of a [`RunError`], reported as `kind` in JSON output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad recipe or flags; nothing was contacted or touched.
    Config,
    /// No single asset fits this host.
    Selection,
    /// A destination collision; nothing was moved.
    Conflict,
    /// Network failure; retrying may help.
    Transient,
    /// A version could not be read from the probe output or the tag.
    VersionParse,
    /// Local filesystem failure.
    Io,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Config => "config",
            Self::Selection => "selection",
            Self::Conflict => "conflict",
            Self::Transient => "transient",
            Self::VersionParse => "version",
            Self::Io => "io",
        }
    }
}

#[derive(Error, Debug)]
pub enum RunError {
    #[error("{0}")]
    Config(String),

    #[error(transparent)]
    Repo(#[from] RepoError),

    #[error(transparent)]
    Rule(#[from] RuleError),

    #[error(transparent)]
    Pattern(#[from] PatternError),

    #[error(transparent)]
    Selection(#[from] SelectError),

    #[error(transparent)]
    Conflict(Conflict),

    #[error(transparent)]
    Install(InstallError),

    #[error(transparent)]
    Release(#[from] ReleaseError),

    #[error(transparent)]
    Download(#[from] DownloadError),

    #[error(transparent)]
    Extract(#[from] ExtractError),

    #[error(transparent)]
    Version(#[from] VersionError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl RunError {
    pub fn config(msg: impl std::fmt::Display) -> Self {
        Self::Config(msg.to_string())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Config(_) | Self::Repo(_) | Self::Rule(_) | Self::Pattern(_) => ErrorKind::Config,
            Self::Selection(_) => ErrorKind::Selection,
            Self::Conflict(_) => ErrorKind::Conflict,
            Self::Release(_) | Self::Download(_) => ErrorKind::Transient,
            Self::Version(VersionError::NoVersionInOutput { .. } | VersionError::NoVersionInTag { .. }) => {
                ErrorKind::VersionParse
            }
            Self::Version(_) | Self::Install(_) | Self::Extract(_) | Self::Io(_) | Self::Task(_) => {
                ErrorKind::Io
            }
        }
    }
}

impl From<InstallError> for RunError {
    fn from(err: InstallError) -> Self {
        match err {
            InstallError::Conflict(conflict) => Self::Conflict(conflict),
            other => Self::Install(other),
        }
    }
}
