//! Select command

use std::sync::Arc;

use anyhow::{Context as _, Result};
use ghi_core::api_url;

use crate::RecipeArgs;
use crate::ops::{Context, resolve};
use crate::recipe::Recipe;
use crate::ui::Output;

/// Print the name and download URL of the asset `install` would pick.
pub async fn select(args: &RecipeArgs, quiet: bool) -> Result<()> {
    let ctx = Context::new(&api_url(), args.token.clone(), Arc::new(Output::new(quiet)), true);

    let recipe = Recipe::from_args(args)
        .await?
        .validate(&ctx.host)
        .context("Invalid recipe")?;
    let (release, asset) = resolve(&ctx, &recipe)
        .await
        .with_context(|| format!("Failed to select an asset from {} {}", recipe.repo, recipe.tag))?;

    tracing::debug!("Release {} has {} assets", release.tag_name, release.assets.len());
    println!("{}", asset.name);
    println!("{}", asset.download_url);
    Ok(())
}
