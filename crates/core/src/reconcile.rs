//! Reconciliation and lifecycle orchestration
//!
//! One `apply` call takes a workspace from "whatever container currently
//! owns the resolved name" to "a running, SSH-reachable devcontainer":
//!
//! 1. resolve the descriptor
//! 2. build the image, when a build section is present
//! 3. reconcile against the existing container: reuse, rebuild, or create
//! 4. poll until the new container is visible, start it
//! 5. provision SSH trust material and client configuration
//! 6. run lifecycle hooks (`postCreateCommand` only on fresh creates)
//!
//! The runtime's CLI returns before its internal state has converged, so a
//! fixed settle cooldown is inserted between externally observable state
//! changes where no poll-able signal exists. The cooldown is injectable so
//! tests use zero delay.
//!
//! Recovery is deliberately narrow: a create failure whose text indicates a
//! name collision triggers one forced removal and one retried create; a
//! removal failure whose text indicates a missing backing record counts as
//! success. Everything else is fatal for the call.

use crate::errors::{AcmError, Result, RuntimeError};
use crate::ports;
use crate::resolve::{self, ResolvedConfig};
use crate::runtime::{ContainerBackend, ExecSpec};
use crate::signatures;
use crate::ssh::{host_alias, SshProvisioner};
use crate::state::AppliedStore;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// Scheme of the remote-connection URI handed to the editor collaborator.
pub const REMOTE_URI_SCHEME: &str = "acm-remote";

/// Fixed cooldown between externally observable runtime state changes.
#[derive(Debug, Clone)]
pub struct Settle {
    cooldown: Duration,
}

impl Settle {
    pub fn new(cooldown: Duration) -> Self {
        Self { cooldown }
    }

    /// Zero-delay strategy for tests.
    pub fn none() -> Self {
        Self {
            cooldown: Duration::ZERO,
        }
    }

    pub async fn wait(&self) {
        if !self.cooldown.is_zero() {
            tokio::time::sleep(self.cooldown).await;
        }
    }
}

impl Default for Settle {
    fn default() -> Self {
        Self {
            cooldown: Duration::from_millis(1500),
        }
    }
}

/// Options for one apply call.
#[derive(Debug, Clone, Default)]
pub struct ApplyOptions {
    /// Destroy and recreate an existing container instead of reusing it.
    pub rebuild: bool,
}

/// What an apply call did.
#[derive(Debug, Clone)]
pub struct ApplyOutcome {
    pub name: String,
    pub image: String,
    /// An existing container was reused instead of created.
    pub reused: bool,
    /// SSH and lifecycle provisioning completed. False only when the
    /// container never became visible after creation.
    pub provisioned: bool,
    pub ssh_alias: String,
    pub ssh_port: u16,
    pub workspace_folder: String,
}

/// Sequences devcontainer provisioning against a container backend.
///
/// Not re-entrant-safe per workspace: a second `apply` for the same
/// workspace must not start before the first completes.
pub struct Orchestrator<B: ContainerBackend> {
    backend: B,
    ssh: SshProvisioner,
    state: AppliedStore,
    settle: Settle,
    visibility_timeout: Duration,
    poll_interval: Duration,
}

impl<B: ContainerBackend> Orchestrator<B> {
    pub fn new(backend: B, ssh: SshProvisioner) -> Self {
        Self {
            backend,
            ssh,
            state: AppliedStore::new(),
            settle: Settle::default(),
            visibility_timeout: Duration::from_secs(5),
            poll_interval: Duration::from_millis(500),
        }
    }

    pub fn with_settle(mut self, settle: Settle) -> Self {
        self.settle = settle;
        self
    }

    pub fn with_visibility_poll(mut self, timeout: Duration, interval: Duration) -> Self {
        self.visibility_timeout = timeout;
        self.poll_interval = interval;
        self
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// The configuration applied for `workspace` in this process, if any.
    pub fn applied(&self, workspace: &Path) -> Option<&ResolvedConfig> {
        self.state.get(workspace)
    }

    /// Resolve and apply the workspace's devcontainer.
    #[instrument(skip(self, options), fields(workspace = %workspace.display(), rebuild = options.rebuild))]
    pub async fn apply(&mut self, workspace: &Path, options: &ApplyOptions) -> Result<ApplyOutcome> {
        let resolved = resolve::resolve(workspace)?;
        info!(
            "Applying devcontainer '{}' (image {})",
            resolved.name, resolved.image
        );

        if let Some(build) = &resolved.build {
            info!("Building image for '{}'", resolved.name);
            self.backend.build(build).await.map_err(|e| {
                AcmError::Runtime(RuntimeError::CommandFailed {
                    message: format!("image build failed: {}", e),
                })
            })?;
        }

        let containers = self.backend.list_containers().await?;
        let existing = containers.into_iter().find(|c| c.name == resolved.name);

        match existing {
            Some(existing) if !options.rebuild => {
                debug!("Reusing existing container '{}'", existing.name);
                return self.reuse(workspace, resolved).await;
            }
            Some(existing) => {
                // stale: tear down, tolerating a zombie record
                info!("Rebuilding: removing existing container '{}'", existing.name);
                if let Err(e) = self.backend.stop(&existing.name).await {
                    warn!(
                        "Failed to stop '{}' ({}); attempting removal anyway",
                        existing.name, e
                    );
                }
                self.settle.wait().await;
                self.remove_tolerating_zombie(&existing.name).await?;
                self.settle.wait().await;
            }
            None => {}
        }

        self.create_with_collision_recovery(&resolved).await?;

        if !self.wait_visible(&resolved.name).await? {
            warn!(
                "Container '{}' did not appear in listing after creation; skipping post-provisioning",
                resolved.name
            );
            let outcome = self.outcome(&resolved, false, false);
            self.state.record(workspace, resolved);
            return Ok(outcome);
        }

        self.backend.start(&resolved.name).await?;
        self.settle.wait().await;

        self.provision_ssh(&resolved).await?;
        self.state.record(workspace, resolved.clone());

        if let Some(argv) = &resolved.post_create {
            self.run_hook(&resolved, argv, "postCreateCommand").await?;
        }
        if let Some(argv) = &resolved.post_start {
            self.run_hook(&resolved, argv, "postStartCommand").await?;
        }

        info!("Devcontainer '{}' is ready", resolved.name);
        Ok(self.outcome(&resolved, false, true))
    }

    /// Reuse path: start if needed, re-provision idempotently, run only
    /// `postStartCommand`, never `postCreateCommand`.
    async fn reuse(&mut self, workspace: &Path, resolved: ResolvedConfig) -> Result<ApplyOutcome> {
        self.backend.start(&resolved.name).await?;
        self.settle.wait().await;

        self.provision_ssh(&resolved).await?;
        self.state.record(workspace, resolved.clone());

        if let Some(argv) = &resolved.post_start {
            self.run_hook(&resolved, argv, "postStartCommand").await?;
        }

        info!("Reused running container '{}'", resolved.name);
        Ok(self.outcome(&resolved, true, true))
    }

    /// Create, recovering exactly once from a name collision by forcing a
    /// removal of the untracked zombie and retrying.
    async fn create_with_collision_recovery(&self, resolved: &ResolvedConfig) -> Result<()> {
        match self.backend.create(resolved).await {
            Ok(()) => Ok(()),
            Err(AcmError::Runtime(RuntimeError::CommandFailed { message }))
                if signatures::indicates_name_collision(&message) =>
            {
                warn!(
                    "Create collided on name '{}' ({}); removing zombie and retrying once",
                    resolved.name, message
                );
                self.remove_tolerating_zombie(&resolved.name).await?;
                self.settle.wait().await;
                self.backend.create(resolved).await
            }
            Err(e) => Err(e),
        }
    }

    /// Remove, treating a missing backing record as success: the goal
    /// ("this name is free") is already met.
    async fn remove_tolerating_zombie(&self, name: &str) -> Result<()> {
        match self.backend.remove(name).await {
            Ok(()) => Ok(()),
            Err(AcmError::Runtime(RuntimeError::CommandFailed { message }))
                if signatures::indicates_missing_record(&message) =>
            {
                debug!(
                    "Removal of '{}' reported a missing record ({}); treating as removed",
                    name, message
                );
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Poll the listing until `name` appears, bounded by the visibility
    /// timeout. `Ok(false)` means it never appeared.
    async fn wait_visible(&self, name: &str) -> Result<bool> {
        let deadline = tokio::time::Instant::now() + self.visibility_timeout;
        loop {
            let containers = self.backend.list_containers().await?;
            if containers.iter().any(|c| c.name == name || c.id == name) {
                return Ok(true);
            }
            if tokio::time::Instant::now() >= deadline {
                return Ok(false);
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    /// Inject the public key (best-effort) and update the local SSH config.
    async fn provision_ssh(&self, resolved: &ResolvedConfig) -> Result<()> {
        let public_key = self.ssh.ensure_key().await?;

        // appending a possibly-duplicate key is acceptable; the injection is
        // non-fatal because the remote user may not exist yet on first boot
        let script = format!(
            "mkdir -p \"$HOME/.ssh\" && chmod 700 \"$HOME/.ssh\" && \
             printf '%s\\n' '{}' >> \"$HOME/.ssh/authorized_keys\" && \
             chmod 600 \"$HOME/.ssh/authorized_keys\"",
            public_key
        );
        let argv = vec!["/bin/sh".to_string(), "-c".to_string(), script];
        let spec = ExecSpec {
            user: self.exec_user(resolved),
            ..Default::default()
        };
        if let Err(e) = self.backend.exec(&resolved.name, &argv, &spec).await {
            warn!(
                "SSH key injection into '{}' failed (non-fatal): {}",
                resolved.name, e
            );
        }

        let port = ports::ssh_host_port(&resolved.ports);
        let user = self
            .exec_user(resolved)
            .unwrap_or_else(|| "root".to_string());
        self.ssh.update_config(&resolved.name, port, &user)?;
        Ok(())
    }

    fn exec_user(&self, resolved: &ResolvedConfig) -> Option<String> {
        resolved
            .remote_user
            .clone()
            .or_else(|| resolved.run_args.user.clone())
    }

    async fn run_hook(&self, resolved: &ResolvedConfig, argv: &[String], hook: &str) -> Result<()> {
        info!("Running {} in '{}'", hook, resolved.name);
        let spec = ExecSpec {
            user: self.exec_user(resolved),
            workdir: Some(
                resolved
                    .run_args
                    .workdir
                    .clone()
                    .unwrap_or_else(|| resolved.workspace_folder.clone()),
            ),
            env: resolved.env.clone(),
            interactive: false,
            tty: false,
        };
        self.backend
            .exec(&resolved.name, argv, &spec)
            .await
            .map_err(|e| AcmError::Lifecycle(format!("{} failed: {}", hook, e)))?;
        Ok(())
    }

    fn outcome(&self, resolved: &ResolvedConfig, reused: bool, provisioned: bool) -> ApplyOutcome {
        ApplyOutcome {
            name: resolved.name.clone(),
            image: resolved.image.clone(),
            reused,
            provisioned,
            ssh_alias: host_alias(&resolved.name),
            ssh_port: ports::ssh_host_port(&resolved.ports),
            workspace_folder: resolved.workspace_folder.clone(),
        }
    }

    /// Run only the build step, caching the resolved configuration.
    #[instrument(skip(self), fields(workspace = %workspace.display()))]
    pub async fn build_only(&mut self, workspace: &Path, no_cache: bool) -> Result<ResolvedConfig> {
        let resolved = resolve::resolve(workspace)?;
        match &resolved.build {
            Some(build) => {
                info!("Building image for '{}'", resolved.name);
                let mut build = build.clone();
                build.no_cache = no_cache;
                self.backend.build(&build).await.map_err(|e| {
                    AcmError::Runtime(RuntimeError::CommandFailed {
                        message: format!("image build failed: {}", e),
                    })
                })?;
            }
            None => {
                info!(
                    "'{}' uses a prebuilt image ({}); nothing to build",
                    resolved.name, resolved.image
                );
            }
        }
        self.state.record(workspace, resolved.clone());
        Ok(resolved)
    }

    /// Re-run both lifecycle hooks against the running container.
    #[instrument(skip(self), fields(workspace = %workspace.display()))]
    pub async fn run_post_lifecycle(&mut self, workspace: &Path) -> Result<()> {
        let resolved = match self.state.get(workspace) {
            Some(resolved) => resolved.clone(),
            None => resolve::resolve(workspace)?,
        };

        let containers = self.backend.list_containers().await?;
        let running = containers
            .iter()
            .any(|c| c.name == resolved.name && c.running);
        if !running {
            return Err(AcmError::Lifecycle(format!(
                "container '{}' is not running; apply the devcontainer first",
                resolved.name
            )));
        }

        if let Some(argv) = &resolved.post_create {
            self.run_hook(&resolved, argv, "postCreateCommand").await?;
        }
        if let Some(argv) = &resolved.post_start {
            self.run_hook(&resolved, argv, "postStartCommand").await?;
        }
        Ok(())
    }

    /// Human-readable connection summary for the workspace's container.
    pub fn connection_instructions(&self, workspace: &Path) -> Result<String> {
        let resolved = match self.state.get(workspace) {
            Some(resolved) => resolved.clone(),
            None => resolve::resolve(workspace)?,
        };
        let alias = host_alias(&resolved.name);
        let port = ports::ssh_host_port(&resolved.ports);
        let user = resolved.remote_user.as_deref().unwrap_or("root");
        Ok(format!(
            "Container:        {name}\n\
             Image:            {image}\n\
             SSH host alias:   {alias} (127.0.0.1:{port}, user {user})\n\
             Connect:          ssh {alias}\n\
             Workspace folder: {folder}\n\
             Remote URI:       {uri}\n",
            name = resolved.name,
            image = resolved.image,
            alias = alias,
            port = port,
            user = user,
            folder = resolved.workspace_folder,
            uri = remote_uri(&alias, &resolved.workspace_folder),
        ))
    }

    /// Full apply plus the remote-connection URI for the editor collaborator.
    #[instrument(skip(self, options), fields(workspace = %workspace.display()))]
    pub async fn reopen_uri(
        &mut self,
        workspace: &Path,
        options: &ApplyOptions,
    ) -> Result<String> {
        let outcome = self.apply(workspace, options).await?;
        Ok(remote_uri(&outcome.ssh_alias, &outcome.workspace_folder))
    }
}

/// `<scheme>+<ssh-host-alias>/<container-workspace-path>`.
fn remote_uri(alias: &str, workspace_folder: &str) -> String {
    format!("{}+{}{}", REMOTE_URI_SCHEME, alias, workspace_folder)
}
