//! CLI argument definitions and dispatch

use crate::commands;
use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Log format options
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum LogFormat {
    /// Human-readable text format
    Text,
    /// JSON structured format
    Json,
}

/// Log level options
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Output format for listing commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table
    Text,
    /// JSON array
    Json,
}

/// Devcontainer manager subcommands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Resolve the workspace devcontainer and make it running and reachable
    Up {
        /// Destroy and recreate an existing container instead of reusing it
        #[arg(long)]
        rebuild: bool,
    },

    /// Build the devcontainer image without creating a container
    Build {
        /// Build without using the layer cache
        #[arg(long)]
        no_cache: bool,
    },

    /// Re-run postCreateCommand and postStartCommand in the running container
    RunHooks,

    /// Show how to connect to the workspace's container
    Instructions,

    /// Apply the devcontainer and print the remote-connection URI
    Reopen {
        /// Destroy and recreate an existing container instead of reusing it
        #[arg(long)]
        rebuild: bool,
    },

    /// List containers
    Ls {
        /// Output format
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// List images
    Images {
        /// Output format
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Follow a container's logs
    Logs {
        /// Container name or id
        name: String,
    },

    /// Check that the container runtime is installed and responding
    Doctor {
        /// Output format
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
}

/// Devcontainer manager for the native `container` runtime
#[derive(Debug, Parser)]
#[command(name = "acm", version, about)]
pub struct Cli {
    /// Log format (text or json, can be set via ACM_LOG_FORMAT env var)
    #[arg(long, global = true, value_enum)]
    pub log_format: Option<LogFormat>,

    /// Log level
    #[arg(long, global = true, value_enum, default_value = "info")]
    pub log_level: LogLevel,

    /// Workspace folder path (defaults to the current directory)
    #[arg(long, global = true, value_name = "PATH")]
    pub workspace_folder: Option<PathBuf>,

    /// Path to the container runtime executable (can be set via ACM_RUNTIME env var)
    #[arg(long, global = true, default_value = "container")]
    pub runtime_path: String,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Runtime binary path: CLI flag > ACM_RUNTIME env var > default.
    pub fn effective_runtime_path(&self) -> String {
        if self.runtime_path != "container" {
            return self.runtime_path.clone();
        }
        std::env::var("ACM_RUNTIME").unwrap_or_else(|_| self.runtime_path.clone())
    }

    /// Workspace folder: CLI flag or the current directory, canonicalized.
    pub fn effective_workspace(&self) -> Result<PathBuf> {
        let workspace = match &self.workspace_folder {
            Some(path) => path.clone(),
            None => std::env::current_dir()?,
        };
        Ok(workspace.canonicalize().unwrap_or(workspace))
    }

    pub async fn dispatch(self) -> Result<()> {
        let log_format = match self.log_format {
            Some(LogFormat::Text) => Some("text"),
            Some(LogFormat::Json) => Some("json"),
            None => None,
        };
        let log_level = match self.log_level {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        };
        if std::env::var_os("ACM_LOG").is_none() && std::env::var_os("RUST_LOG").is_none() {
            std::env::set_var("RUST_LOG", format!("acm={},acm_core={}", log_level, log_level));
        }
        acm_core::logging::init(log_format)?;

        match &self.command {
            Commands::Up { rebuild } => commands::up::execute(&self, *rebuild).await,
            Commands::Build { no_cache } => commands::build::execute(&self, *no_cache).await,
            Commands::RunHooks => commands::hooks::execute(&self).await,
            Commands::Instructions => commands::instructions::execute(&self).await,
            Commands::Reopen { rebuild } => commands::reopen::execute(&self, *rebuild).await,
            Commands::Ls { format } => commands::list::containers(&self, *format).await,
            Commands::Images { format } => commands::list::images(&self, *format).await,
            Commands::Logs { name } => commands::logs::execute(&self, name).await,
            Commands::Doctor { format } => commands::doctor::execute(&self, *format).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_up_with_rebuild() {
        let cli = Cli::parse_from(["acm", "up", "--rebuild"]);
        assert!(matches!(cli.command, Commands::Up { rebuild: true }));
    }

    #[test]
    fn test_runtime_path_flag_wins() {
        let cli = Cli::parse_from(["acm", "--runtime-path", "/opt/bin/container", "doctor"]);
        assert_eq!(cli.effective_runtime_path(), "/opt/bin/container");
    }
}
