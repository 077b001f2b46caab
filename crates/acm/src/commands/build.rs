//! Build command: build the devcontainer image only

use crate::cli::Cli;
use crate::commands::shared;
use anyhow::{Context, Result};
use tracing::instrument;

#[instrument(skip(cli))]
pub async fn execute(cli: &Cli, no_cache: bool) -> Result<()> {
    let workspace = cli.effective_workspace()?;
    let mut orchestrator = shared::orchestrator(cli)?;

    let resolved = orchestrator
        .build_only(&workspace, no_cache)
        .await
        .context("failed to build devcontainer image")?;

    match &resolved.build {
        Some(build) => println!("Built image tags: {}", build.tags.join(", ")),
        None => println!(
            "'{}' uses the prebuilt image {}; nothing to build",
            resolved.name, resolved.image
        ),
    }
    Ok(())
}
