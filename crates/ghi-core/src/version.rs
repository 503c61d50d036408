//! Installed-version probe
//!
//! Decides whether a release needs installing by comparing its tag with a
//! marker file or with the output of the installed tool's version command.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use regex::Regex;
use thiserror::Error;

/// Version pattern used when a command check has none configured.
pub const DEFAULT_VERSION_REGEX: &str = r"\d+\.\d+(?:\.\d+)?";

#[derive(Error, Debug)]
pub enum VersionError {
    #[error("No version matching '{regex}' in output of '{command}': {output:?}")]
    NoVersionInOutput {
        command: String,
        regex: String,
        output: String,
    },

    #[error("No version matching '{regex}' in release tag '{tag}'")]
    NoVersionInTag { tag: String, regex: String },

    #[error("Failed to read version file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to write version file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// How the currently installed version is discovered.
#[derive(Debug, Clone, Default)]
pub enum VersionCheck {
    /// Always install.
    #[default]
    None,
    /// A marker file holding the tag of the last install.
    File(PathBuf),
    /// A command whose output contains the installed version.
    Command { command: String, regex: Regex },
}

impl VersionCheck {
    /// Command check with the given pattern, or [`DEFAULT_VERSION_REGEX`].
    ///
    /// # Errors
    ///
    /// Returns the regex compile error for an invalid pattern.
    pub fn command(command: impl Into<String>, regex: Option<&str>) -> Result<Self, regex::Error> {
        Ok(Self::Command {
            command: command.into(),
            regex: Regex::new(regex.unwrap_or(DEFAULT_VERSION_REGEX))?,
        })
    }
}

/// Whether the release tagged `tag_name` still needs to be installed.
///
/// # Errors
///
/// Returns a [`VersionError`] if a version cannot be extracted from the
/// command output or the tag, or if the marker file is unreadable.
pub fn is_install_required(check: &VersionCheck, tag_name: &str) -> Result<bool, VersionError> {
    match check {
        VersionCheck::None => Ok(true),
        VersionCheck::File(path) => marker_differs(path, tag_name),
        VersionCheck::Command { command, regex } => {
            let Some(output) = run_version_command(command) else {
                return Ok(true);
            };

            let installed = regex
                .find(output.trim())
                .ok_or_else(|| VersionError::NoVersionInOutput {
                    command: command.clone(),
                    regex: regex.as_str().to_string(),
                    output: output.trim().to_string(),
                })?;
            let wanted = regex
                .find(tag_name)
                .ok_or_else(|| VersionError::NoVersionInTag {
                    tag: tag_name.to_string(),
                    regex: regex.as_str().to_string(),
                })?;

            tracing::debug!(
                "Installed version {}, release version {}",
                installed.as_str(),
                wanted.as_str()
            );
            Ok(installed.as_str() != wanted.as_str())
        }
    }
}

fn marker_differs(path: &Path, tag_name: &str) -> Result<bool, VersionError> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(content.trim() != tag_name),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(true),
        Err(source) => Err(VersionError::Read {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Stdout of `command`, or `None` if it could not run or exited non-zero.
fn run_version_command(command: &str) -> Option<String> {
    let mut parts = command.split_whitespace();
    let program = parts.next()?;

    let Ok(resolved) = which::which(program) else {
        tracing::debug!("'{program}' not found; assuming not installed");
        return None;
    };

    let output = match Command::new(resolved)
        .args(parts)
        .stdin(Stdio::null())
        .stderr(Stdio::null())
        .output()
    {
        Ok(output) => output,
        Err(e) => {
            tracing::debug!("Failed to run '{command}': {e}");
            return None;
        }
    };

    if !output.status.success() {
        tracing::debug!("'{command}' exited with {}", output.status);
        return None;
    }

    Some(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Record `tag_name` in the marker file at `path`.
///
/// The tag is written without a trailing newline to a sibling temp file that
/// then replaces `path`.
///
/// # Errors
///
/// Returns [`VersionError::Write`] if the file cannot be written.
pub fn write_marker(path: &Path, tag_name: &str) -> Result<(), VersionError> {
    let write_err = |source| VersionError::Write {
        path: path.to_path_buf(),
        source,
    };

    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(write_err)?;
    io::Write::write_all(&mut tmp, tag_name.as_bytes()).map_err(write_err)?;
    tmp.persist(path).map_err(|e| write_err(e.error))?;
    Ok(())
}
