//! Container runtime CLI wrapper
//!
//! [`ContainerCli`] drives the native `container` tool through the process
//! runner, tolerating the spelling differences between tool versions
//! (`ls -a` vs `list`, `rm` vs `remove` vs `delete`) and normalizing output
//! through [`crate::output`].
//!
//! The [`ContainerBackend`] trait is the seam the orchestrator is generic
//! over; tests substitute a scripted fake.

use crate::errors::{AcmError, Result, RuntimeError};
use crate::exec::{ExecOptions, ExecOutput, ProcessRunner, StreamHandle};
use crate::output::{
    self, container_from_record, image_from_record, ContainerSummary, ImageSummary,
};
use crate::resolve::{ResolvedBuild, ResolvedConfig};
use crate::signatures;
use indexmap::IndexMap;
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Default name of the wrapped runtime binary.
pub const DEFAULT_BINARY: &str = "container";

/// Keep-alive command appended on create so images without a long-running
/// foreground process do not exit immediately.
pub const KEEP_ALIVE_COMMAND: &[&str] = &["sleep", "infinity"];

/// Build timeouts are much longer than regular commands.
const BUILD_TIMEOUT: Duration = Duration::from_secs(1800);

/// Options for an in-container command execution.
#[derive(Debug, Clone, Default)]
pub struct ExecSpec {
    pub user: Option<String>,
    pub workdir: Option<String>,
    pub env: IndexMap<String, String>,
    pub interactive: bool,
    pub tty: bool,
}

/// Operations the orchestrator needs from a container runtime.
#[allow(async_fn_in_trait)]
pub trait ContainerBackend {
    async fn list_containers(&self) -> Result<Vec<ContainerSummary>>;
    async fn create(&self, resolved: &ResolvedConfig) -> Result<()>;
    async fn start(&self, name: &str) -> Result<()>;
    async fn stop(&self, name: &str) -> Result<()>;
    async fn remove(&self, name: &str) -> Result<()>;
    async fn exec(&self, name: &str, argv: &[String], spec: &ExecSpec) -> Result<ExecOutput>;
    async fn build(&self, build: &ResolvedBuild) -> Result<()>;
}

/// CLI-backed runtime implementation.
#[derive(Debug, Clone)]
pub struct ContainerCli {
    binary: String,
    runner: ProcessRunner,
    timeout: Duration,
}

impl Default for ContainerCli {
    fn default() -> Self {
        Self::new()
    }
}

impl ContainerCli {
    pub fn new() -> Self {
        Self {
            binary: DEFAULT_BINARY.to_string(),
            runner: ProcessRunner::new(),
            timeout: crate::exec::DEFAULT_TIMEOUT,
        }
    }

    /// Use a specific binary path instead of `container` from PATH.
    pub fn with_binary(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            ..Self::new()
        }
    }

    pub fn binary(&self) -> &str {
        &self.binary
    }

    async fn run(&self, args: &[&str]) -> Result<ExecOutput> {
        self.runner
            .run(&self.binary, args, &ExecOptions::with_timeout(self.timeout))
            .await
    }

    /// Runtime tool version string.
    pub async fn version(&self) -> Result<String> {
        let out = self.run(&["--version"]).await?;
        Ok(out.stdout.trim().to_string())
    }

    /// Runtime system status text (`system status`).
    pub async fn system_status(&self) -> Result<String> {
        let out = self.run(&["system", "status"]).await?;
        Ok(out.stdout.trim().to_string())
    }

    /// Start the runtime system service (`system start`).
    pub async fn system_start(&self) -> Result<()> {
        self.run(&["system", "start"]).await?;
        Ok(())
    }

    /// Stop the runtime system service (`system stop`).
    pub async fn system_stop(&self) -> Result<()> {
        self.run(&["system", "stop"]).await?;
        Ok(())
    }

    /// List images, trying alternate subcommand spellings.
    pub async fn list_images(&self) -> Result<Vec<ImageSummary>> {
        let spellings: &[&[&str]] = &[
            &["image", "ls", "--format", "json"],
            &["image", "list", "--format", "json"],
        ];
        let records = self.list_with_spellings(spellings).await?;
        Ok(records.iter().filter_map(image_from_record).collect())
    }

    /// Remove an image, trying `rm`/`remove`/`delete` spellings.
    pub async fn remove_image(&self, reference: &str) -> Result<()> {
        let spellings: &[&[&str]] = &[
            &["image", "rm"],
            &["image", "remove"],
            &["image", "delete"],
        ];
        self.run_with_spellings(spellings, &[reference]).await?;
        Ok(())
    }

    /// Follow a container's logs as a live stream.
    pub fn logs_follow(&self, name: &str) -> Result<StreamHandle> {
        self.runner
            .stream(&self.binary, &["logs", "--follow", name])
    }

    /// Run each spelling until one parses into records; a spelling whose
    /// output defeats every parsing strategy counts as failed and the next
    /// spelling is tried before giving up with zero records.
    async fn list_with_spellings(
        &self,
        spellings: &[&[&str]],
    ) -> Result<Vec<serde_json::Map<String, serde_json::Value>>> {
        let mut last_error: Option<AcmError> = None;
        let mut any_ran = false;
        for spelling in spellings {
            match self.run(spelling).await {
                Ok(out) => {
                    any_ran = true;
                    match output::normalize(&out.stdout) {
                        Some(records) => return Ok(records),
                        None => {
                            debug!(
                                "Output of '{}' matched no parsing strategy; trying next spelling",
                                spelling.join(" ")
                            );
                        }
                    }
                }
                Err(e) => {
                    debug!("Listing spelling '{}' failed: {}", spelling.join(" "), e);
                    last_error = Some(e);
                }
            }
        }
        match last_error {
            // every spelling errored at the command level
            Some(e) if !any_ran => Err(e),
            // at least one ran but nothing parsed: zero records
            _ => Ok(Vec::new()),
        }
    }

    /// Run a mutation trying alternate spellings when the subcommand itself
    /// is not understood; any other failure propagates immediately.
    async fn run_with_spellings(
        &self,
        spellings: &[&[&str]],
        trailing: &[&str],
    ) -> Result<ExecOutput> {
        let mut last_error: Option<AcmError> = None;
        for spelling in spellings {
            let mut args: Vec<&str> = spelling.to_vec();
            args.extend_from_slice(trailing);
            match self.run(&args).await {
                Ok(out) => return Ok(out),
                Err(AcmError::Runtime(RuntimeError::CommandFailed { message }))
                    if signatures::indicates_unknown_subcommand(&message) =>
                {
                    debug!(
                        "Spelling '{}' not understood; trying next",
                        spelling.join(" ")
                    );
                    last_error = Some(RuntimeError::CommandFailed { message }.into());
                }
                Err(e) => return Err(e),
            }
        }
        Err(last_error.unwrap_or_else(|| {
            RuntimeError::CommandFailed {
                message: "no subcommand spelling available".to_string(),
            }
            .into()
        }))
    }
}

/// Arguments for `run` building a container from a resolved descriptor.
pub fn create_args(resolved: &ResolvedConfig) -> Vec<String> {
    let mut args = vec![
        "run".to_string(),
        "--detach".to_string(),
        "--name".to_string(),
        resolved.name.clone(),
    ];

    if let Some(cpus) = resolved.run_args.cpus {
        args.push("--cpus".to_string());
        args.push(trim_float(cpus));
    }
    if let Some(memory) = &resolved.run_args.memory {
        args.push("--memory".to_string());
        args.push(memory.clone());
    }
    for port in &resolved.ports {
        args.push("--publish".to_string());
        args.push(port.clone());
    }
    for volume in &resolved.volumes {
        args.push("--volume".to_string());
        args.push(volume.to_volume_flag());
    }
    for (key, value) in &resolved.env {
        args.push("--env".to_string());
        args.push(format!("{}={}", key, value));
    }
    args.extend(resolved.run_args.additional.iter().cloned());

    args.push(resolved.image.clone());
    args.extend(KEEP_ALIVE_COMMAND.iter().map(|s| s.to_string()));
    args
}

/// Arguments for `build` from a resolved build specification.
pub fn build_args(build: &ResolvedBuild) -> Vec<String> {
    let mut args = vec!["build".to_string()];

    if let Some(dockerfile) = &build.dockerfile {
        args.push("--file".to_string());
        args.push(dockerfile.to_string_lossy().to_string());
    }
    for tag in &build.tags {
        args.push("--tag".to_string());
        args.push(tag.clone());
    }
    for (key, value) in &build.args {
        args.push("--build-arg".to_string());
        args.push(format!("{}={}", key, value));
    }
    for (key, value) in &build.labels {
        args.push("--label".to_string());
        args.push(format!("{}={}", key, value));
    }
    if let Some(target) = &build.target {
        args.push("--target".to_string());
        args.push(target.clone());
    }
    if let Some(platform) = &build.platform {
        args.push("--platform".to_string());
        args.push(platform.clone());
    }
    if build.no_cache {
        args.push("--no-cache".to_string());
    }
    if let Some(cpus) = build.cpus {
        args.push("--cpus".to_string());
        args.push(trim_float(cpus));
    }
    if let Some(memory) = &build.memory {
        args.push("--memory".to_string());
        args.push(memory.clone());
    }
    args.push(build.context.to_string_lossy().to_string());
    args
}

/// Arguments for `exec` of `argv` inside container `name`.
pub fn exec_args(name: &str, argv: &[String], spec: &ExecSpec) -> Vec<String> {
    let mut args = vec!["exec".to_string()];
    if spec.interactive {
        args.push("--interactive".to_string());
    }
    if spec.tty {
        args.push("--tty".to_string());
    }
    if let Some(user) = &spec.user {
        args.push("--user".to_string());
        args.push(user.clone());
    }
    if let Some(workdir) = &spec.workdir {
        args.push("--workdir".to_string());
        args.push(workdir.clone());
    }
    for (key, value) in &spec.env {
        args.push("--env".to_string());
        args.push(format!("{}={}", key, value));
    }
    args.push(name.to_string());
    args.extend(argv.iter().cloned());
    args
}

fn trim_float(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{}", value as u64)
    } else {
        format!("{}", value)
    }
}

impl ContainerBackend for ContainerCli {
    #[instrument(skip(self))]
    async fn list_containers(&self) -> Result<Vec<ContainerSummary>> {
        let spellings: &[&[&str]] = &[
            &["ls", "-a", "--format", "json"],
            &["list", "-a", "--format", "json"],
        ];
        let records = self.list_with_spellings(spellings).await?;
        Ok(records.iter().filter_map(container_from_record).collect())
    }

    #[instrument(skip(self, resolved), fields(name = %resolved.name))]
    async fn create(&self, resolved: &ResolvedConfig) -> Result<()> {
        let args = create_args(resolved);
        let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();
        self.run(&arg_refs).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn start(&self, name: &str) -> Result<()> {
        self.run(&["start", name]).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn stop(&self, name: &str) -> Result<()> {
        self.run(&["stop", name]).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn remove(&self, name: &str) -> Result<()> {
        let spellings: &[&[&str]] = &[&["rm"], &["remove"], &["delete"]];
        self.run_with_spellings(spellings, &[name]).await?;
        Ok(())
    }

    #[instrument(skip(self, argv, spec))]
    async fn exec(&self, name: &str, argv: &[String], spec: &ExecSpec) -> Result<ExecOutput> {
        let args = exec_args(name, argv, spec);
        let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();
        self.run(&arg_refs).await
    }

    #[instrument(skip(self, build))]
    async fn build(&self, build: &ResolvedBuild) -> Result<()> {
        let args = build_args(build);
        let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();
        let out = self
            .runner
            .run(
                &self.binary,
                &arg_refs,
                &ExecOptions::with_timeout(BUILD_TIMEOUT),
            )
            .await?;
        if !out.stderr.trim().is_empty() {
            warn!("build reported warnings: {}", out.stderr.trim());
        }
        Ok(())
    }
}
