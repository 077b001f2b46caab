//! Instructions command: show the connection summary

use crate::cli::Cli;
use crate::commands::shared;
use anyhow::Result;
use tracing::instrument;

#[instrument(skip(cli))]
pub async fn execute(cli: &Cli) -> Result<()> {
    let workspace = cli.effective_workspace()?;
    let orchestrator = shared::orchestrator(cli)?;
    print!("{}", orchestrator.connection_instructions(&workspace)?);
    Ok(())
}
