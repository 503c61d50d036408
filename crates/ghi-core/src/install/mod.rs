//! Atomic installation of an extracted archive tree.
//!
//! # Implementation Note: Classify, Validate, Execute
//!
//! Installing is split into stages so that only the last one can mutate the
//! filesystem:
//!
//! 1. [`classify`]: walk the scratch tree and pair each entry with the first
//!    move rule that fully matches its relative path. A matched directory
//!    claims its whole subtree.
//! 2. [`MovePlan::check`]: inspect the destinations for conflicts. Read-only
//!    and repeatable.
//! 3. [`ValidatedPlan::execute`]: only reachable through a successful
//!    [`MovePlan::validate`], stamps ownership and permissions onto the
//!    sources in the scratch tree, then performs every move.
//!
//! A conflict or an attribute failure anywhere in the plan aborts before the
//! first move, so the destinations are either fully updated or untouched.

mod attrs;
mod classify;
mod execute;
mod plan;

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::Reporter;
use crate::rules::MoveRules;

pub use attrs::{Attributes, apply_recursive};
pub use classify::{ClassifiedEntry, classify};
pub use plan::{MovePlan, ValidatedPlan};

/// A destination collision detected before any move is performed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Conflict {
    /// A directory would be moved onto an existing path inside a directory destination.
    #[error("Destination path '{}' already exists.", .0.display())]
    DirectoryExists(PathBuf),

    /// A file would be moved onto an existing directory inside a directory destination.
    #[error("Destination path '{}' is an existing directory.", .0.display())]
    FileOntoDirectory(PathBuf),

    /// Several sources were assigned to one file destination.
    #[error("Can't move multiple files/dirs to '{}'.", .0.display())]
    MultipleSources(PathBuf),

    /// A directory would replace an existing file.
    #[error("File '{}' exists.", .0.display())]
    FileExists(PathBuf),

    /// The destination's parent directory is missing.
    #[error("Directory '{}' does not exist.", .0.display())]
    MissingParent(PathBuf),
}

#[derive(Error, Debug)]
pub enum InstallError {
    #[error("Conflict: {0}")]
    Conflict(#[from] Conflict),

    #[error("Failed to walk extracted tree: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("IO error at '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to move '{}' to '{}': {message}", .from.display(), .to.display())]
    Move {
        from: PathBuf,
        to: PathBuf,
        message: String,
    },
}

impl InstallError {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Classify `extract_root` against `rules`, validate the resulting plan and
/// execute it.
///
/// Returns `true` if at least one destination was created or its content
/// changed.
///
/// # Errors
///
/// Returns [`InstallError::Conflict`] without touching any destination if the
/// plan fails validation, an IO error before any move if ownership or mode
/// cannot be applied, or an error if a move fails.
pub fn install(
    extract_root: &Path,
    rules: &MoveRules,
    reporter: &dyn Reporter,
) -> Result<bool, InstallError> {
    let entries = classify(extract_root, rules)?;
    if entries.is_empty() {
        tracing::warn!("No extracted path matched any move rule");
        reporter.warning("No extracted path matched any move rule; nothing installed");
        return Ok(false);
    }

    let plan = MovePlan::new(entries).validate()?;
    plan.execute(reporter)
}
