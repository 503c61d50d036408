//! One install attempt, from release lookup to version marker.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use ghi_core::{
    decompress_single, download_to, filename_from_url, install, is_install_required,
    scratch_root, unpack_into, write_marker,
};
use ghi_schema::{Asset, Release};

use super::{Context, RunError};
use crate::recipe::ValidRecipe;

/// Result of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    /// Whether any destination was created or its content changed.
    pub changed: bool,
    /// Tag of the release that was considered.
    pub tag: String,
    /// The selected asset; `None` when the installed version was current.
    pub asset: Option<Asset>,
    /// True when nothing was downloaded (up to date, or a dry run).
    pub skipped: bool,
}

/// Fetch release metadata and select the asset for this host.
pub async fn resolve(ctx: &Context, recipe: &ValidRecipe) -> Result<(Release, Asset), RunError> {
    let release = ctx.releases.fetch(&recipe.repo, &recipe.tag).await?;
    let asset = recipe.selection.select(&release.assets)?.clone();
    tracing::info!("Selected {} from {} {}", asset.name, recipe.repo, release.tag_name);
    Ok((release, asset))
}

/// Install the release described by `recipe`.
///
/// The scratch directory is removed when this returns, whether or not the
/// install succeeded.
pub async fn run(ctx: &Context, recipe: &ValidRecipe) -> Result<Outcome, RunError> {
    ctx.reporter.section(&format!("Resolving {}", recipe.repo));
    let release = ctx.releases.fetch(&recipe.repo, &recipe.tag).await?;
    let tag = release.tag_name.clone();

    let check = recipe.version.clone();
    let probe_tag = tag.clone();
    let required = tokio::task::spawn_blocking(move || is_install_required(&check, &probe_tag)).await??;
    if !required {
        ctx.reporter.info(&format!("{} {tag} is already installed", recipe.repo));
        return Ok(Outcome {
            changed: false,
            tag,
            asset: None,
            skipped: true,
        });
    }

    let asset = recipe.selection.select(&release.assets)?.clone();
    ctx.reporter.info(&format!("Selected {} ({tag})", asset.name));
    if ctx.dry_run {
        return Ok(Outcome {
            changed: false,
            tag,
            asset: Some(asset),
            skipped: true,
        });
    }

    let root = scratch_root();
    tokio::fs::create_dir_all(&root).await?;
    let scratch = tempfile::Builder::new().prefix("ghi-").tempdir_in(&root)?;
    tracing::debug!("Scratch directory {}", scratch.path().display());

    let (archive, extract_dir) = scratch_layout(scratch.path(), &asset);
    if let Some(parent) = archive.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    ctx.reporter.section("Downloading");
    download_to(
        &ctx.client,
        &asset.download_url,
        &archive,
        &asset.name,
        ctx.reporter.as_ref(),
    )
    .await?;

    ctx.reporter.section("Installing");
    let rules = recipe.rules.clone();
    let reporter = Arc::clone(&ctx.reporter);
    let changed = tokio::task::spawn_blocking(move || -> Result<bool, RunError> {
        let archive = decompress_single(&archive)?;
        unpack_into(&archive, &extract_dir)?;
        Ok(install(&extract_dir, &rules, reporter.as_ref())?)
    })
    .await??;

    if changed {
        if let Some(marker) = recipe.version_file() {
            write_marker(marker, &tag)?;
            tracing::debug!("Recorded {tag} in {}", marker.display());
        }
    }

    Ok(Outcome {
        changed,
        tag,
        asset: Some(asset),
        skipped: false,
    })
}

/// Where the asset is downloaded and where it is unpacked, inside `scratch`.
///
/// The two live in sibling directories, so no asset name can collide with
/// the extraction root.
fn scratch_layout(scratch: &Path, asset: &Asset) -> (PathBuf, PathBuf) {
    (
        scratch.join("download").join(asset_file_name(asset)),
        scratch.join("extract"),
    )
}

/// Local file name for a downloaded asset.
fn asset_file_name(asset: &Asset) -> &str {
    let usable = |name: &str| {
        !name.is_empty() && !name.contains('/') && !name.chars().all(|c| c == '.')
    };
    if usable(&asset.name) {
        return &asset.name;
    }
    match filename_from_url(&asset.download_url) {
        name if usable(name) => name,
        _ => "asset",
    }
}
