//! ghi - install tools from GitHub release assets
#![allow(missing_docs)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::doc_markdown)]
//!
//! One run of `ghi install` reads a recipe, asks the releases API for a tag,
//! picks the single asset built for this host, unpacks it in a scratch
//! directory and moves the selected paths into place.
//!
//! # Architecture
//!
//! - **Pure selection**: `ghi_schema::SelectionConfig` narrows the asset list
//!   by pattern, then architecture, then operating system.
//! - **Typestate install**: `ghi_core::install` only executes a `ValidatedPlan`,
//!   so no destination is touched unless every move is known to be safe.
//! - **Reporter injection**: library code reports through
//!   `ghi_core::Reporter`; the CLI supplies a terminal `Output`.
//!
//! # Recipe
//!
//! ```text
//! repo = "go-acme/lego"
//! asset_regex = 'lego_.*\.tar\.gz'
//! version_command = "lego --version"
//!
//! [[move_rules]]
//! src_regex = "lego"
//! dst = "~/.local/bin"
//! mode = "0755"
//! ```

pub mod cmd;
pub mod ops;
pub mod recipe;
pub mod ui;

pub use ghi_core::USER_AGENT;

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "ghi")]
#[command(author, version, about = "ghi - install tools from GitHub release assets")]
pub struct Cli {
    /// Resolve the release and asset, but download and install nothing
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Install the release asset described by a recipe
    Install {
        #[command(flatten)]
        recipe: RecipeArgs,
        /// Print a single JSON result line instead of human output
        #[arg(long)]
        json: bool,
    },
    /// Show which asset would be installed
    Select {
        #[command(flatten)]
        recipe: RecipeArgs,
    },
    /// Show the detected platform and acceptable architecture tokens
    Host,
}

/// Recipe location plus per-field overrides.
#[derive(Debug, Clone, Default, Args)]
pub struct RecipeArgs {
    /// Recipe file (TOML)
    pub recipe: Option<PathBuf>,

    /// Repository as owner/name
    #[arg(long)]
    pub repo: Option<String>,

    /// Release tag, or "latest"
    #[arg(long)]
    pub tag: Option<String>,

    /// Regex the whole asset name must match
    #[arg(long)]
    pub asset_regex: Option<String>,

    /// Command printing the installed version (e.g. "lego --version")
    #[arg(long)]
    pub version_command: Option<String>,

    /// Regex extracting the version from command output and tag
    #[arg(long)]
    pub version_regex: Option<String>,

    /// File recording the installed tag
    #[arg(long)]
    pub version_file: Option<String>,

    /// Architecture alias as ARCH=TOKEN[,TOKEN...]; repeatable
    #[arg(long = "arch-alias", value_name = "ARCH=TOKENS")]
    pub arch_aliases: Vec<String>,

    /// Token for the releases API
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub token: Option<String>,
}
