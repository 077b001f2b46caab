//! Reopen command: apply and print the remote-connection URI

use crate::cli::Cli;
use crate::commands::shared;
use acm_core::reconcile::ApplyOptions;
use anyhow::{Context, Result};
use tracing::instrument;

#[instrument(skip(cli))]
pub async fn execute(cli: &Cli, rebuild: bool) -> Result<()> {
    let workspace = cli.effective_workspace()?;
    let mut orchestrator = shared::orchestrator(cli)?;

    let uri = orchestrator
        .reopen_uri(&workspace, &ApplyOptions { rebuild })
        .await
        .context("failed to reopen in container")?;

    println!("{}", uri);
    Ok(())
}
