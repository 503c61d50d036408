//! Core library for ghi: release IO, move rules and atomic installation.

pub mod install;
pub mod io;
pub mod paths;
pub mod repo;
pub mod reporter;
pub mod rules;
pub mod version;

pub use install::{Conflict, InstallError, install};
pub use io::download::{DownloadError, download_to};
pub use io::extract::{ExtractError, decompress_single, unpack_into};
pub use io::release::{LATEST, ReleaseClient, ReleaseError};
pub use paths::*;
pub use repo::{GitHubRepo, RepoError};
pub use reporter::{NullReporter, Reporter};
pub use rules::{MoveRule, MoveRuleSpec, MoveRules, RuleError};
pub use version::{VersionCheck, VersionError, is_install_required, write_marker};

/// User Agent string for core operations
pub const USER_AGENT: &str = concat!("ghi/", env!("CARGO_PKG_VERSION"));
