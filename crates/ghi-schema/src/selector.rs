//! Narrowing a release's assets down to a single download target.
//!
//! Asset names across publishers follow no common convention, so selection is
//! a fixed pipeline of filters applied in order:
//!
//! 1. [`Stage::Pattern`]: the caller's regex must match the whole file name.
//! 2. [`Stage::Architecture`]: the name must contain an acceptable
//!    architecture token, bounded by non-word characters or underscores.
//! 3. [`Stage::System`]: the name must contain the host OS name.
//!
//! After each stage a single survivor is returned immediately and an empty
//! set is an error naming the stage. Candidates left after the last stage are
//! reported as ambiguous rather than guessed at.

use std::collections::BTreeMap;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::arch::HostPlatform;
use crate::release::Asset;

/// Why no unique asset could be chosen. None of these are transient.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SelectError {
    /// The pattern matched no asset name.
    #[error("no asset matched pattern '{pattern}'")]
    NoPatternMatch {
        /// The pattern as written by the caller.
        pattern: String,
    },

    /// Several assets matched the pattern but none carried an acceptable
    /// architecture token.
    #[error("ambiguous after pattern match; no asset matched architecture {}", .architectures.join(", "))]
    NoArchitectureMatch {
        /// Tokens that were accepted.
        architectures: Vec<String>,
    },

    /// Several assets matched pattern and architecture but none named the
    /// host OS.
    #[error("ambiguous after pattern+architecture match; no asset matched system {system}")]
    NoSystemMatch {
        /// Lower-cased host OS name.
        system: String,
    },

    /// More than one asset survived every stage.
    #[error("could not select a unique asset; {count} assets matched")]
    Ambiguous {
        /// Number of remaining candidates.
        count: usize,
    },
}

/// A regex in the selection configuration failed to compile.
#[derive(Error, Debug)]
#[error("invalid asset pattern '{pattern}': {source}")]
pub struct PatternError {
    /// The offending pattern.
    pub pattern: String,
    /// Underlying compile error.
    #[source]
    pub source: regex::Error,
}

/// Publisher-specific spelling(s) for a canonical architecture.
///
/// Configuration may give either a single string or a list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ArchAlias {
    /// A single replacement token.
    One(String),
    /// Several replacement tokens, any of which is acceptable.
    Many(Vec<String>),
}

impl ArchAlias {
    /// Lower-cased replacement tokens.
    pub fn tokens(&self) -> Vec<String> {
        match self {
            Self::One(s) => vec![s.to_lowercase()],
            Self::Many(v) => v.iter().map(|s| s.to_lowercase()).collect(),
        }
    }
}

/// One filter in the narrowing pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Full-string match of the caller's pattern.
    Pattern,
    /// Token-bounded architecture match.
    Architecture,
    /// Substring match of the OS name.
    System,
}

impl Stage {
    /// Stages in the order they are applied.
    pub const PIPELINE: [Stage; 3] = [Stage::Pattern, Stage::Architecture, Stage::System];

    /// Keep only the candidates that pass this stage, preserving order.
    pub fn narrow<'a>(self, config: &SelectionConfig, candidates: &[&'a Asset]) -> Vec<&'a Asset> {
        candidates
            .iter()
            .copied()
            .filter(|asset| self.accepts(config, &asset.name))
            .collect()
    }

    /// Whether a single asset name passes this stage.
    pub fn accepts(self, config: &SelectionConfig, name: &str) -> bool {
        match self {
            Self::Pattern => config.pattern.is_match(name),
            Self::Architecture => {
                let lower = name.to_lowercase();
                config.arch_matchers.iter().any(|re| re.is_match(&lower))
            }
            Self::System => name.to_lowercase().contains(&config.system),
        }
    }

    fn empty_error(self, config: &SelectionConfig) -> SelectError {
        match self {
            Self::Pattern => SelectError::NoPatternMatch {
                pattern: config.pattern_source.clone(),
            },
            Self::Architecture => SelectError::NoArchitectureMatch {
                architectures: config.architectures.clone(),
            },
            Self::System => SelectError::NoSystemMatch {
                system: config.system.clone(),
            },
        }
    }
}

/// Immutable selection inputs for one run.
///
/// # Example
///
/// ```
/// use std::collections::BTreeMap;
/// use ghi_schema::{Asset, HostPlatform, SelectionConfig};
///
/// let host = HostPlatform::new("linux", "x86_64");
/// let config = SelectionConfig::new(r"tool-.*\.tar\.gz", &BTreeMap::new(), &host).unwrap();
///
/// let assets = vec![
///     Asset::new("tool-linux-amd64.tar.gz", "https://example.com/a"),
///     Asset::new("tool-linux-arm64.tar.gz", "https://example.com/b"),
/// ];
/// assert_eq!(config.select(&assets).unwrap().name, "tool-linux-amd64.tar.gz");
/// ```
#[derive(Debug, Clone)]
pub struct SelectionConfig {
    pattern_source: String,
    pattern: Regex,
    system: String,
    architectures: Vec<String>,
    arch_matchers: Vec<Regex>,
}

impl SelectionConfig {
    /// Build the configuration from a user pattern, an optional alias table
    /// and the host facts.
    ///
    /// Alias lookup walks the host's architecture tokens in order (literal
    /// host string first, then its siblings) and the first token with an
    /// alias entry replaces the whole acceptable set. Keys are compared
    /// case-insensitively.
    ///
    /// # Errors
    ///
    /// Returns [`PatternError`] if `pattern` is not a valid regex.
    pub fn new(
        pattern: &str,
        aliases: &BTreeMap<String, ArchAlias>,
        host: &HostPlatform,
    ) -> Result<Self, PatternError> {
        let compiled = Regex::new(&format!("^(?:{pattern})$")).map_err(|source| PatternError {
            pattern: pattern.to_string(),
            source,
        })?;

        let aliases: BTreeMap<String, &ArchAlias> =
            aliases.iter().map(|(k, v)| (k.to_lowercase(), v)).collect();

        let mut architectures = host.architectures();
        let aliased = architectures
            .iter()
            .find_map(|a| aliases.get(a))
            .map(|alias| alias.tokens());
        if let Some(tokens) = aliased {
            architectures = tokens;
        }

        let arch_matchers = architectures
            .iter()
            .map(|arch| {
                let bounded = format!(r"(?:^|\W|_){}(?:$|\W|_)", regex::escape(arch));
                Regex::new(&bounded).map_err(|source| PatternError {
                    pattern: bounded,
                    source,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            pattern_source: pattern.to_string(),
            pattern: compiled,
            system: host.system().to_string(),
            architectures,
            arch_matchers,
        })
    }

    /// The pattern as given by the caller.
    pub fn pattern(&self) -> &str {
        &self.pattern_source
    }

    /// Lower-cased host OS name.
    pub fn system(&self) -> &str {
        &self.system
    }

    /// Acceptable architecture tokens after alias expansion.
    pub fn architectures(&self) -> &[String] {
        &self.architectures
    }

    /// Reduce `assets` to exactly one element.
    ///
    /// # Errors
    ///
    /// Returns a [`SelectError`] naming the stage at which the candidate set
    /// became empty, or [`SelectError::Ambiguous`] if several assets survive
    /// every stage.
    pub fn select<'a>(&self, assets: &'a [Asset]) -> Result<&'a Asset, SelectError> {
        let mut candidates: Vec<&Asset> = assets.iter().collect();

        for stage in Stage::PIPELINE {
            candidates = stage.narrow(self, &candidates);
            match candidates.as_slice() {
                [] => return Err(stage.empty_error(self)),
                [only] => return Ok(*only),
                _ => {}
            }
        }

        Err(SelectError::Ambiguous {
            count: candidates.len(),
        })
    }
}
