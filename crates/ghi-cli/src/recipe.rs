//! Recipe loading and validation.
//!
//! A recipe is a TOML file describing one install. Command-line flags
//! override individual fields; move rules only come from the file. Every
//! check here runs before any network or filesystem side effect.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use ghi_core::{GitHubRepo, LATEST, MoveRuleSpec, MoveRules, VersionCheck, expand_tilde};
use ghi_schema::{ArchAlias, HostPlatform, SelectionConfig};
use serde::{Deserialize, Serialize};

use crate::RecipeArgs;
use crate::ops::RunError;

/// A recipe as written in TOML, before validation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Recipe {
    pub repo: Option<String>,
    pub tag: Option<String>,
    pub asset_regex: Option<String>,
    pub version_command: Option<String>,
    pub version_regex: Option<String>,
    pub version_file: Option<String>,
    #[serde(default)]
    pub asset_arch_mapping: BTreeMap<String, ArchAlias>,
    #[serde(default)]
    pub move_rules: Vec<MoveRuleSpec>,
}

impl Recipe {
    /// Parse a recipe from TOML text.
    pub fn parse(text: &str) -> Result<Self, RunError> {
        toml::from_str(text).map_err(|e| RunError::config(format!("Invalid recipe: {e}")))
    }

    /// Read and parse the recipe at `path`.
    pub async fn load(path: &Path) -> Result<Self, RunError> {
        let text = tokio::fs::read_to_string(path).await.map_err(|e| {
            RunError::config(format!("Failed to read recipe {}: {e}", path.display()))
        })?;
        Self::parse(&text)
    }

    /// Load the recipe named in `args` (if any) and apply the flag overrides.
    pub async fn from_args(args: &RecipeArgs) -> Result<Self, RunError> {
        let base = match &args.recipe {
            Some(path) => Self::load(path).await?,
            None => Self::default(),
        };
        base.merge(args)
    }

    /// Apply flag overrides on top of this recipe.
    pub fn merge(mut self, args: &RecipeArgs) -> Result<Self, RunError> {
        let overrides = [
            (&mut self.repo, &args.repo),
            (&mut self.tag, &args.tag),
            (&mut self.asset_regex, &args.asset_regex),
            (&mut self.version_command, &args.version_command),
            (&mut self.version_regex, &args.version_regex),
            (&mut self.version_file, &args.version_file),
        ];
        for (field, flag) in overrides {
            if flag.is_some() {
                field.clone_from(flag);
            }
        }

        for alias in &args.arch_aliases {
            let (arch, tokens) = parse_alias(alias)?;
            self.asset_arch_mapping.insert(arch, tokens);
        }

        Ok(self)
    }

    /// Check every field and compile the recipe for `host`.
    ///
    /// Checks run in a fixed order: repository, version options, move rules,
    /// asset pattern. The first failure is returned.
    pub fn validate(&self, host: &HostPlatform) -> Result<ValidRecipe, RunError> {
        let repo = self
            .repo
            .as_deref()
            .ok_or_else(|| RunError::config("Missing required field 'repo'"))?;
        let repo = GitHubRepo::new(repo)?;

        let version = self.version_check()?;
        let rules = MoveRules::from_specs(&self.move_rules)?;

        let asset_regex = self
            .asset_regex
            .as_deref()
            .ok_or_else(|| RunError::config("Missing required field 'asset_regex'"))?;
        let selection = SelectionConfig::new(asset_regex, &self.asset_arch_mapping, host)?;

        let tag = self
            .tag
            .as_deref()
            .filter(|t| !t.is_empty())
            .unwrap_or(LATEST)
            .to_string();

        Ok(ValidRecipe {
            repo,
            tag,
            selection,
            rules,
            version,
        })
    }

    fn version_check(&self) -> Result<VersionCheck, RunError> {
        match (&self.version_file, &self.version_command, &self.version_regex) {
            (Some(_), Some(_), _) | (Some(_), _, Some(_)) => Err(RunError::config(
                "'version_file' cannot be combined with 'version_command' or 'version_regex'",
            )),
            (None, None, Some(_)) => Err(RunError::config(
                "'version_regex' requires 'version_command'",
            )),
            (Some(file), None, None) => Ok(VersionCheck::File(expand_tilde(file))),
            (None, Some(command), regex) => {
                VersionCheck::command(command.as_str(), regex.as_deref()).map_err(|e| {
                    RunError::config(format!("Invalid version_regex: {e}"))
                })
            }
            (None, None, None) => Ok(VersionCheck::None),
        }
    }
}

/// Parse `ARCH=TOKEN[,TOKEN...]`.
fn parse_alias(raw: &str) -> Result<(String, ArchAlias), RunError> {
    let invalid = || RunError::config(format!("Invalid --arch-alias '{raw}' (expected ARCH=TOKEN[,TOKEN...])"));

    let (arch, tokens) = raw.split_once('=').ok_or_else(invalid)?;
    let tokens: Vec<String> = tokens
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(String::from)
        .collect();
    if arch.trim().is_empty() || tokens.is_empty() {
        return Err(invalid());
    }

    let alias = match <[String; 1]>::try_from(tokens) {
        Ok([one]) => ArchAlias::One(one),
        Err(many) => ArchAlias::Many(many),
    };
    Ok((arch.trim().to_string(), alias))
}

/// A recipe that passed validation.
#[derive(Debug, Clone)]
pub struct ValidRecipe {
    pub repo: GitHubRepo,
    pub tag: String,
    pub selection: SelectionConfig,
    pub rules: MoveRules,
    pub version: VersionCheck,
}

impl ValidRecipe {
    /// Marker file to update after a changing install, if one is configured.
    pub fn version_file(&self) -> Option<&PathBuf> {
        match &self.version {
            VersionCheck::File(path) => Some(path),
            _ => None,
        }
    }
}
