//! Move rules: which extracted paths go where, with what attributes.
//!
//! Rules arrive from configuration as loosely typed [`MoveRuleSpec`] values and
//! are validated into [`MoveRules`] before any network or filesystem activity.
//! Validation compiles patterns, expands `~` in destinations, parses modes and
//! resolves owner/group names to numeric ids, so a bad rule never surfaces
//! halfway through an install.

use std::path::PathBuf;

use nix::unistd::{Gid, Group, Uid, User};
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::paths::expand_tilde;

/// Highest permission value accepted (`rwxrwxrwx` plus setuid/setgid/sticky).
const MAX_MODE: u32 = 0o7777;

#[derive(Error, Debug)]
pub enum RuleError {
    #[error("Move rule #{index} does not have required argument '{field}'")]
    Missing { index: usize, field: &'static str },

    #[error("Move rule #{index} has an invalid src_regex '{pattern}': {source}")]
    InvalidPattern {
        index: usize,
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("Move rule #{index} has an invalid mode '{mode}' (expected octal such as \"0755\")")]
    InvalidMode { index: usize, mode: String },

    #[error("Move rule #{index} destination '{dst}' is not an absolute path")]
    RelativeDestination { index: usize, dst: String },

    #[error("Move rule #{index} names unknown owner '{owner}'")]
    UnknownOwner { index: usize, owner: String },

    #[error("Move rule #{index} names unknown group '{group}'")]
    UnknownGroup { index: usize, group: String },

    #[error("Failed to look up user/group database: {0}")]
    Lookup(#[from] nix::Error),
}

/// Permission bits as written in configuration: an integer (`0o755` in TOML)
/// or an octal string (`"0755"`, `"755"`, `"0o755"`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ModeSpec {
    /// Raw permission bits.
    Bits(u32),
    /// Octal digits.
    Octal(String),
}

impl ModeSpec {
    fn parse(&self) -> Option<u32> {
        let bits = match self {
            Self::Bits(b) => *b,
            Self::Octal(s) => {
                let digits = s.trim();
                let digits = digits.strip_prefix("0o").unwrap_or(digits);
                if digits.is_empty() {
                    return None;
                }
                u32::from_str_radix(digits, 8).ok()?
            }
        };
        (bits <= MAX_MODE).then_some(bits)
    }
}

impl std::fmt::Display for ModeSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bits(b) => write!(f, "{b}"),
            Self::Octal(s) => write!(f, "{s}"),
        }
    }
}

/// A move rule as it appears in configuration, before validation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveRuleSpec {
    /// Regex matched against the whole path relative to the archive root.
    #[serde(default)]
    pub src_regex: Option<String>,
    /// Destination path; `~` is expanded.
    #[serde(default)]
    pub dst: Option<String>,
    /// Permission bits to apply to moved paths.
    #[serde(default)]
    pub mode: Option<ModeSpec>,
    /// Owner name or numeric uid.
    #[serde(default)]
    pub owner: Option<String>,
    /// Group name or numeric gid.
    #[serde(default)]
    pub group: Option<String>,
}

/// A validated move rule.
#[derive(Debug, Clone)]
pub struct MoveRule {
    index: usize,
    src_pattern: String,
    src: Regex,
    dst: PathBuf,
    mode: Option<u32>,
    owner: Option<Uid>,
    group: Option<Gid>,
}

impl MoveRule {
    /// Validate one configured rule. `index` is its position in the list.
    ///
    /// # Errors
    ///
    /// Returns a [`RuleError`] naming the first violated constraint.
    pub fn from_spec(index: usize, spec: &MoveRuleSpec) -> Result<Self, RuleError> {
        let src_pattern = spec
            .src_regex
            .as_deref()
            .filter(|s| !s.is_empty())
            .ok_or(RuleError::Missing {
                index,
                field: "src_regex",
            })?;
        let dst = spec
            .dst
            .as_deref()
            .filter(|s| !s.is_empty())
            .ok_or(RuleError::Missing { index, field: "dst" })?;

        let src = Regex::new(&format!("^(?:{src_pattern})$")).map_err(|source| {
            RuleError::InvalidPattern {
                index,
                pattern: src_pattern.to_string(),
                source,
            }
        })?;

        let dst_path = expand_tilde(dst);
        if !dst_path.is_absolute() {
            return Err(RuleError::RelativeDestination {
                index,
                dst: dst.to_string(),
            });
        }

        let mode = spec
            .mode
            .as_ref()
            .map(|m| {
                m.parse().ok_or_else(|| RuleError::InvalidMode {
                    index,
                    mode: m.to_string(),
                })
            })
            .transpose()?;

        let owner = spec
            .owner
            .as_deref()
            .map(|o| resolve_owner(index, o))
            .transpose()?;
        let group = spec
            .group
            .as_deref()
            .map(|g| resolve_group(index, g))
            .transpose()?;

        Ok(Self {
            index,
            src_pattern: src_pattern.to_string(),
            src,
            dst: dst_path,
            mode,
            owner,
            group,
        })
    }

    /// Position of this rule in the configured list.
    pub fn index(&self) -> usize {
        self.index
    }

    /// The source pattern as configured.
    pub fn src_pattern(&self) -> &str {
        &self.src_pattern
    }

    /// Whether `relative_path` (with `/` separators) fully matches the source pattern.
    pub fn matches(&self, relative_path: &str) -> bool {
        self.src.is_match(relative_path)
    }

    /// Absolute, tilde-expanded destination.
    pub fn dst(&self) -> &std::path::Path {
        &self.dst
    }

    /// Permission bits to apply, if configured.
    pub fn mode(&self) -> Option<u32> {
        self.mode
    }

    /// Configured owner, if any.
    pub fn owner(&self) -> Option<Uid> {
        self.owner
    }

    /// Configured group, if any.
    pub fn group(&self) -> Option<Gid> {
        self.group
    }
}

fn resolve_owner(index: usize, owner: &str) -> Result<Uid, RuleError> {
    if let Ok(id) = owner.parse::<u32>() {
        return Ok(Uid::from_raw(id));
    }
    User::from_name(owner)?
        .map(|u| u.uid)
        .ok_or_else(|| RuleError::UnknownOwner {
            index,
            owner: owner.to_string(),
        })
}

fn resolve_group(index: usize, group: &str) -> Result<Gid, RuleError> {
    if let Ok(id) = group.parse::<u32>() {
        return Ok(Gid::from_raw(id));
    }
    Group::from_name(group)?
        .map(|g| g.gid)
        .ok_or_else(|| RuleError::UnknownGroup {
            index,
            group: group.to_string(),
        })
}

/// An ordered list of validated rules. The first matching rule wins.
#[derive(Debug, Clone, Default)]
pub struct MoveRules(Vec<MoveRule>);

impl MoveRules {
    /// Validate every configured rule, stopping at the first invalid one.
    ///
    /// # Errors
    ///
    /// Returns the [`RuleError`] of the first invalid rule.
    pub fn from_specs(specs: &[MoveRuleSpec]) -> Result<Self, RuleError> {
        specs
            .iter()
            .enumerate()
            .map(|(i, spec)| MoveRule::from_spec(i, spec))
            .collect::<Result<Vec<_>, _>>()
            .map(Self)
    }

    /// First rule whose pattern fully matches `relative_path`.
    pub fn first_match(&self, relative_path: &str) -> Option<&MoveRule> {
        self.0.iter().find(|r| r.matches(relative_path))
    }

    /// Rules in configured order.
    pub fn iter(&self) -> std::slice::Iter<'_, MoveRule> {
        self.0.iter()
    }

    /// Number of rules.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no rules are configured.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
