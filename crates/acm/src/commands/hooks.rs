//! Run-hooks command: re-run lifecycle hooks in the running container

use crate::cli::Cli;
use crate::commands::shared;
use anyhow::{Context, Result};
use tracing::instrument;

#[instrument(skip(cli))]
pub async fn execute(cli: &Cli) -> Result<()> {
    let workspace = cli.effective_workspace()?;
    let mut orchestrator = shared::orchestrator(cli)?;

    orchestrator
        .run_post_lifecycle(&workspace)
        .await
        .context("failed to run lifecycle hooks")?;

    println!("Lifecycle hooks completed");
    Ok(())
}
