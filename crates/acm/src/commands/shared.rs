//! Helpers shared across subcommands

use crate::cli::Cli;
use acm_core::reconcile::Orchestrator;
use acm_core::runtime::ContainerCli;
use acm_core::ssh::SshProvisioner;
use anyhow::Result;

/// Build the orchestrator wired to the selected runtime binary and the
/// user's SSH directory.
pub fn orchestrator(cli: &Cli) -> Result<Orchestrator<ContainerCli>> {
    let backend = ContainerCli::with_binary(cli.effective_runtime_path());
    let ssh = SshProvisioner::new()?;
    Ok(Orchestrator::new(backend, ssh))
}

/// The runtime wrapper alone, for listing/log commands that do not
/// orchestrate.
pub fn runtime(cli: &Cli) -> ContainerCli {
    ContainerCli::with_binary(cli.effective_runtime_path())
}
