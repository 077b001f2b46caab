//! Up command: apply the workspace devcontainer

use crate::cli::Cli;
use crate::commands::shared;
use acm_core::reconcile::ApplyOptions;
use anyhow::{Context, Result};
use tracing::instrument;

#[instrument(skip(cli))]
pub async fn execute(cli: &Cli, rebuild: bool) -> Result<()> {
    let workspace = cli.effective_workspace()?;
    let mut orchestrator = shared::orchestrator(cli)?;

    let outcome = orchestrator
        .apply(&workspace, &ApplyOptions { rebuild })
        .await
        .context("failed to apply devcontainer")?;

    let verb = if outcome.reused { "Reused" } else { "Created" };
    println!("{} container '{}' ({})", verb, outcome.name, outcome.image);
    if outcome.provisioned {
        println!("Connect: ssh {}", outcome.ssh_alias);
    } else {
        println!(
            "Note: '{}' was created but never appeared in the runtime listing; \
             SSH provisioning and lifecycle hooks were skipped",
            outcome.name
        );
    }
    Ok(())
}
