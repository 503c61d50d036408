//! Install command

use std::sync::Arc;

use anyhow::Result;
use crossterm::style::Stylize;
use ghi_core::{Reporter, api_url};

use crate::RecipeArgs;
use crate::ops::{Context, Outcome, RunError, run};
use crate::recipe::Recipe;
use crate::ui::{Output, Report};

/// Install the release asset described by `args`.
///
/// With `json`, exactly one result line is printed on stdout and a failure
/// exits with status 1.
pub async fn install(args: &RecipeArgs, json: bool, dry_run: bool, quiet: bool) -> Result<()> {
    let output = Arc::new(Output::new(quiet || json));
    let ctx = Context::new(&api_url(), args.token.clone(), output.clone(), dry_run);

    let result = attempt(&ctx, args).await;

    if json {
        let report = match &result {
            Ok(outcome) => Report::from(outcome),
            Err(err) => Report::from(err),
        };
        println!("{}", report.to_line());
        if result.is_err() {
            std::process::exit(1);
        }
        return Ok(());
    }

    let outcome = result?;

    match (&outcome.asset, outcome.skipped, outcome.changed) {
        (None, _, _) => output.success(&format!("Already at {}", outcome.tag)),
        (Some(asset), true, _) => {
            output.success(&format!("Would install {} ({})", asset.name, outcome.tag));
            if !quiet {
                println!("  {}", asset.download_url.as_str().dark_grey());
            }
        }
        (Some(asset), false, true) => {
            output.success(&format!("Installed {} ({})", asset.name, outcome.tag));
        }
        (Some(asset), false, false) => {
            output.success(&format!("{} ({}) already in place, nothing changed", asset.name, outcome.tag));
        }
    }

    Ok(())
}

async fn attempt(ctx: &Context, args: &RecipeArgs) -> Result<Outcome, RunError> {
    let recipe = Recipe::from_args(args).await?.validate(&ctx.host)?;
    if recipe.rules.is_empty() {
        return Err(RunError::config("Missing required field 'move_rules'"));
    }
    run(ctx, &recipe).await
}
