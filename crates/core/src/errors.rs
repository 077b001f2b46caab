//! Error types and handling
//!
//! Domain-specific error enums (configuration, runtime CLI, SSH provisioning)
//! wrapped in the top-level [`AcmError`] for unified handling. The runtime
//! variants mirror the failure classes the process runner can actually
//! distinguish: binary missing, permission denied, nonzero exit, timeout.

use thiserror::Error;

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// No devcontainer descriptor at any candidate path
    #[error("No devcontainer configuration found in {workspace} (looked for {candidates})")]
    NotFound {
        workspace: String,
        candidates: String,
    },

    /// Descriptor parsing error
    #[error("Failed to parse devcontainer configuration: {message}")]
    Parsing { message: String },

    /// Descriptor validation error (e.g. neither image nor build present)
    #[error("Configuration validation error: {message}")]
    Validation { message: String },

    /// Configuration file I/O error
    #[error("Failed to read configuration file")]
    Io(#[from] std::io::Error),
}

/// Container runtime CLI errors
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// The runtime binary is not on the execution path
    #[error("Container runtime binary '{binary}' not found; install the container tool and ensure it is on PATH")]
    BinaryNotFound { binary: String },

    /// The runtime binary exists but may not be executed
    #[error("Permission denied executing '{binary}'; approve the tool or adjust its permissions")]
    PermissionDenied { binary: String },

    /// Command exited nonzero or failed at the launch level
    #[error("{message}")]
    CommandFailed { message: String },

    /// Command exceeded its wall-clock budget
    #[error("Command '{command}' timed out after {timeout_secs}s")]
    Timeout { command: String, timeout_secs: u64 },
}

impl RuntimeError {
    /// The stderr/launch detail carried by this error, when any.
    pub fn detail(&self) -> &str {
        match self {
            RuntimeError::CommandFailed { message } => message,
            _ => "",
        }
    }
}

/// SSH provisioning errors
#[derive(Error, Debug)]
pub enum SshError {
    /// Home/SSH directory could not be determined
    #[error("Could not determine the user's SSH directory")]
    NoSshDir,

    /// Key generation failed
    #[error("Key generation failed: {message}")]
    Keygen { message: String },

    /// SSH config file I/O error
    #[error("Failed to update SSH client configuration")]
    Io(#[from] std::io::Error),
}

/// Main error enum wrapping all domain-specific errors
#[derive(Error, Debug)]
pub enum AcmError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Container runtime errors
    #[error("Runtime error: {0}")]
    Runtime(#[from] RuntimeError),

    /// SSH provisioning errors
    #[error("SSH error: {0}")]
    Ssh(#[from] SshError),

    /// Lifecycle hook execution errors
    #[error("Lifecycle error: {0}")]
    Lifecycle(String),
}

/// Convenience type alias for Results with AcmError
pub type Result<T> = std::result::Result<T, AcmError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_config_error_display() {
        let error = ConfigError::Parsing {
            message: "Invalid JSON".to_string(),
        };
        assert_eq!(
            format!("{}", error),
            "Failed to parse devcontainer configuration: Invalid JSON"
        );

        let error = ConfigError::NotFound {
            workspace: "/work/demo".to_string(),
            candidates: ".appcontainer/devcontainer.json, .appcontainer.json".to_string(),
        };
        assert!(format!("{}", error).contains("/work/demo"));
        assert!(format!("{}", error).contains(".appcontainer.json"));
    }

    #[test]
    fn test_runtime_error_display() {
        let error = RuntimeError::BinaryNotFound {
            binary: "container".to_string(),
        };
        assert!(format!("{}", error).contains("'container' not found"));

        let error = RuntimeError::Timeout {
            command: "container ls -a".to_string(),
            timeout_secs: 30,
        };
        assert_eq!(
            format!("{}", error),
            "Command 'container ls -a' timed out after 30s"
        );
    }

    #[test]
    fn test_command_failed_carries_stderr_verbatim() {
        let error = RuntimeError::CommandFailed {
            message: "Error: container with name \"acm-demo\" already exists".to_string(),
        };
        assert_eq!(
            error.detail(),
            "Error: container with name \"acm-demo\" already exists"
        );
        assert_eq!(format!("{}", error), error.detail());
    }

    #[test]
    fn test_acm_error_from_domain_errors() {
        let config_error = ConfigError::Validation {
            message: "neither image nor build present".to_string(),
        };
        let acm_error: AcmError = config_error.into();
        assert!(matches!(acm_error, AcmError::Config(_)));

        let runtime_error = RuntimeError::BinaryNotFound {
            binary: "container".to_string(),
        };
        let acm_error: AcmError = runtime_error.into();
        assert!(matches!(acm_error, AcmError::Runtime(_)));

        let ssh_error = SshError::NoSshDir;
        let acm_error: AcmError = ssh_error.into();
        assert!(matches!(acm_error, AcmError::Ssh(_)));
    }

    #[test]
    fn test_error_source_chain() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let config_error = ConfigError::Io(io_error);
        let acm_error = AcmError::Config(config_error);

        assert!(acm_error.source().is_some());
        if let Some(source) = acm_error.source() {
            assert!(source.source().is_some());
        }
    }

    #[test]
    fn test_anyhow_conversion() {
        let error = AcmError::Runtime(RuntimeError::PermissionDenied {
            binary: "container".to_string(),
        });
        let anyhow_error = anyhow::Error::from(error);
        assert!(anyhow_error.to_string().contains("Permission denied"));
    }
}
