//! Logs command: follow a container's output

use crate::cli::Cli;
use crate::commands::shared;
use acm_core::exec::StreamEvent;
use anyhow::{Context, Result};
use tracing::instrument;

#[instrument(skip(cli))]
pub async fn execute(cli: &Cli, name: &str) -> Result<()> {
    let runtime = shared::runtime(cli);
    let mut handle = runtime
        .logs_follow(name)
        .context("failed to start log stream")?;

    while let Some(event) = handle.next_event().await {
        match event {
            StreamEvent::Stdout(line) => println!("{}", line),
            StreamEvent::Stderr(line) => eprintln!("{}", line),
        }
    }
    Ok(())
}
