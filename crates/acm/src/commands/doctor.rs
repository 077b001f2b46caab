//! Doctor command: runtime availability checks

use crate::cli::{Cli, OutputFormat};
use crate::commands::shared;
use anyhow::Result;
use console::style;
use serde::Serialize;
use tracing::instrument;

#[derive(Debug, Serialize)]
struct DoctorReport {
    binary: String,
    version: Option<String>,
    system_status: Option<String>,
    healthy: bool,
}

#[instrument(skip(cli))]
pub async fn execute(cli: &Cli, format: OutputFormat) -> Result<()> {
    let runtime = shared::runtime(cli);
    let binary = runtime.binary().to_string();

    let mut problems = Vec::new();
    let version = match runtime.version().await {
        Ok(version) => Some(version),
        Err(e) => {
            problems.push(e.to_string());
            None
        }
    };
    let system_status = match runtime.system_status().await {
        Ok(status) => Some(status),
        Err(e) => {
            problems.push(e.to_string());
            None
        }
    };

    let report = DoctorReport {
        binary,
        version,
        system_status,
        healthy: problems.is_empty(),
    };

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Text => {
            print_check(
                "runtime binary",
                report.version.as_deref(),
                "not found or not executable",
            );
            print_check(
                "system status",
                report.system_status.as_deref(),
                "system service not responding",
            );
            for problem in &problems {
                eprintln!("  {}", problem);
            }
        }
    }

    if report.healthy {
        Ok(())
    } else {
        anyhow::bail!("container runtime is not healthy")
    }
}

fn print_check(label: &str, ok_detail: Option<&str>, fail_detail: &str) {
    match ok_detail {
        Some(detail) => println!("{} {:<16} {}", style("ok").green(), label, detail),
        None => println!("{} {:<16} {}", style("!!").red(), label, fail_detail),
    }
}
