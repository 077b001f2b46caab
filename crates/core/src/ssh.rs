//! SSH trust material and client configuration
//!
//! Provisions the dedicated keypair used to reach managed containers and
//! maintains a delimited block per container inside the user's SSH client
//! config. Host-key checking is disabled in the managed block: container
//! host keys are ephemeral and carry no meaningful identity. Connection
//! multiplexing keeps repeated terminal sessions fast.

use crate::errors::{Result, SshError};
use crate::exec::{ExecOptions, ProcessRunner};
use std::path::{Path, PathBuf};
use tracing::{debug, instrument};

/// File name of the managed keypair under the SSH directory.
const KEY_FILE: &str = "acm_ed25519";

/// Host alias for a managed container's SSH config block.
pub fn host_alias(name: &str) -> String {
    if name.starts_with("acm-") {
        name.to_string()
    } else {
        format!("acm-{}", name)
    }
}

fn start_marker(name: &str) -> String {
    format!("# start-acm-{}", name)
}

fn end_marker(name: &str) -> String {
    format!("# end-acm-{}", name)
}

/// Manages the dedicated keypair and the per-container config blocks.
#[derive(Debug, Clone)]
pub struct SshProvisioner {
    ssh_dir: PathBuf,
    runner: ProcessRunner,
}

impl SshProvisioner {
    /// Provisioner rooted at the user's `~/.ssh`.
    pub fn new() -> Result<Self> {
        let base = directories_next::BaseDirs::new().ok_or(SshError::NoSshDir)?;
        Ok(Self::with_ssh_dir(base.home_dir().join(".ssh")))
    }

    /// Provisioner rooted at an explicit directory (used by tests).
    pub fn with_ssh_dir(ssh_dir: impl Into<PathBuf>) -> Self {
        Self {
            ssh_dir: ssh_dir.into(),
            runner: ProcessRunner::new(),
        }
    }

    pub fn key_path(&self) -> PathBuf {
        self.ssh_dir.join(KEY_FILE)
    }

    pub fn public_key_path(&self) -> PathBuf {
        self.ssh_dir.join(format!("{}.pub", KEY_FILE))
    }

    fn config_path(&self) -> PathBuf {
        self.ssh_dir.join("config")
    }

    /// Return the public key text, generating the keypair first if absent.
    #[instrument(skip(self))]
    pub async fn ensure_key(&self) -> Result<String> {
        let public = self.public_key_path();
        if public.is_file() {
            let text = std::fs::read_to_string(&public).map_err(SshError::Io)?;
            return Ok(text.trim().to_string());
        }

        std::fs::create_dir_all(&self.ssh_dir).map_err(SshError::Io)?;
        restrict_permissions(&self.ssh_dir, 0o700)?;

        debug!("Generating keypair at {}", self.key_path().display());
        let key_path = self.key_path();
        self.runner
            .run(
                "ssh-keygen",
                &[
                    "-q",
                    "-t",
                    "ed25519",
                    "-N",
                    "",
                    "-C",
                    "acm devcontainer key",
                    "-f",
                    &key_path.to_string_lossy(),
                ],
                &ExecOptions::default(),
            )
            .await
            .map_err(|e| SshError::Keygen {
                message: e.to_string(),
            })?;

        let text = std::fs::read_to_string(&public).map_err(SshError::Io)?;
        Ok(text.trim().to_string())
    }

    /// Rewrite the managed block for `name`, replacing any prior block for
    /// the same container or appending a new one.
    #[instrument(skip(self))]
    pub fn update_config(&self, name: &str, port: u16, user: &str) -> Result<()> {
        let block = self.render_block(name, port, user);
        self.edit_config(name, Some(block))
    }

    /// Drop the managed block for `name`, if present.
    #[instrument(skip(self))]
    pub fn remove_config(&self, name: &str) -> Result<()> {
        self.edit_config(name, None)
    }

    fn render_block(&self, name: &str, port: u16, user: &str) -> String {
        let identity = self.key_path();
        let control_path = self.ssh_dir.join("acm-%r@%h-%p.sock");
        [
            start_marker(name),
            format!("Host {}", host_alias(name)),
            "    HostName 127.0.0.1".to_string(),
            format!("    Port {}", port),
            format!("    User {}", user),
            format!("    IdentityFile {}", identity.display()),
            "    StrictHostKeyChecking no".to_string(),
            "    UserKnownHostsFile /dev/null".to_string(),
            "    ControlMaster auto".to_string(),
            format!("    ControlPath {}", control_path.display()),
            "    ControlPersist 10m".to_string(),
            "    ServerAliveInterval 30".to_string(),
            end_marker(name),
        ]
        .join("\n")
    }

    fn edit_config(&self, name: &str, replacement: Option<String>) -> Result<()> {
        std::fs::create_dir_all(&self.ssh_dir).map_err(SshError::Io)?;
        restrict_permissions(&self.ssh_dir, 0o700)?;

        let path = self.config_path();
        let existing = match std::fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(e) => return Err(SshError::Io(e).into()),
        };

        let mut kept = strip_block(&existing, name);
        if let Some(block) = replacement {
            if !kept.is_empty() && !kept.ends_with('\n') {
                kept.push('\n');
            }
            kept.push('\n');
            kept.push_str(&block);
            kept.push('\n');
        }

        let collapsed = collapse_blank_runs(&kept);
        std::fs::write(&path, collapsed).map_err(SshError::Io)?;
        restrict_permissions(&path, 0o600)?;
        Ok(())
    }
}

fn strip_block(config: &str, name: &str) -> String {
    let start = start_marker(name);
    let end = end_marker(name);
    let mut kept = Vec::new();
    let mut in_block = false;
    for line in config.lines() {
        if line.trim() == start {
            in_block = true;
            continue;
        }
        if in_block {
            if line.trim() == end {
                in_block = false;
            }
            continue;
        }
        kept.push(line);
    }
    kept.join("\n")
}

/// Collapse runs of blank lines left behind by block edits.
fn collapse_blank_runs(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut blank_pending = false;
    let mut wrote_any = false;
    for line in text.lines() {
        if line.trim().is_empty() {
            blank_pending = wrote_any;
            continue;
        }
        if blank_pending {
            out.push('\n');
            blank_pending = false;
        }
        out.push_str(line);
        out.push('\n');
        wrote_any = true;
    }
    out
}

#[cfg(unix)]
fn restrict_permissions(path: &Path, mode: u32) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode))
        .map_err(SshError::Io)?;
    Ok(())
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path, _mode: u32) -> Result<()> {
    Ok(())
}
