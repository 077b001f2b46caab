//! Descriptor resolution
//!
//! Turns a parsed [`DevcontainerConfig`] plus workspace context into a
//! runtime-ready [`ResolvedConfig`]. Resolution is a pure function of the
//! descriptor, the workspace path, and the substitution context; it performs
//! no I/O beyond the descriptor load and never talks to the runtime.

use crate::config::{self, BuildSection, DevcontainerConfig};
use crate::errors::{ConfigError, Result};
use crate::mount::{parse_mount, VolumeSpec};
use crate::ports::resolve_ports;
use crate::variable::{slugify, workspace_basename, SubstitutionContext};
use indexmap::{IndexMap, IndexSet};
use std::path::{Path, PathBuf};
use tracing::{debug, instrument};

/// Typed flags extracted from `runArgs`; everything unrecognized passes
/// through in `additional`, original order preserved.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunArgs {
    pub cpus: Option<f64>,
    pub memory: Option<String>,
    pub user: Option<String>,
    pub workdir: Option<String>,
    pub additional: Vec<String>,
}

/// Scan `runArgs` tokens for recognized flags, in both `--flag value` and
/// `--flag=value` forms.
pub fn parse_run_args(tokens: &[String]) -> RunArgs {
    let mut result = RunArgs::default();
    let mut i = 0;

    while i < tokens.len() {
        let token = &tokens[i];
        let (flag, inline_value) = match token.split_once('=') {
            Some((f, v)) => (f, Some(v.to_string())),
            None => (token.as_str(), None),
        };

        let recognized = matches!(
            flag,
            "--cpus" | "--memory" | "--user" | "-u" | "--workdir" | "--cwd" | "-w"
        );
        if !recognized {
            result.additional.push(token.clone());
            i += 1;
            continue;
        }

        let value = match inline_value {
            Some(v) => Some(v),
            None if i + 1 < tokens.len() => {
                i += 1;
                Some(tokens[i].clone())
            }
            None => None,
        };

        match value {
            Some(value) => match flag {
                "--cpus" => result.cpus = value.trim().parse().ok(),
                "--memory" => result.memory = Some(value),
                "--user" | "-u" => result.user = Some(value),
                "--workdir" | "--cwd" | "-w" => result.workdir = Some(value),
                _ => unreachable!(),
            },
            // a recognized flag with no value left to consume passes through
            None => result.additional.push(token.clone()),
        }
        i += 1;
    }

    result
}

/// Runtime-ready build specification.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedBuild {
    pub dockerfile: Option<PathBuf>,
    pub context: PathBuf,
    pub args: IndexMap<String, String>,
    pub cpus: Option<f64>,
    pub memory: Option<String>,
    pub target: Option<String>,
    pub labels: IndexMap<String, String>,
    /// Always non-empty; always contains the resolved image reference.
    pub tags: Vec<String>,
    pub platform: Option<String>,
    /// Bypass the runtime's layer cache; set by the build command, never by
    /// the descriptor.
    pub no_cache: bool,
}

/// The fully-resolved, runtime-ready descriptor.
///
/// `name` is the reconciliation key: at most one live container may own it
/// at a time.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedConfig {
    pub name: String,
    pub image: String,
    pub remote_user: Option<String>,
    /// Container-side workspace path; exec working directory and target of
    /// the primary workspace volume.
    pub workspace_folder: String,
    /// The workspace volume is always the first entry.
    pub volumes: Vec<VolumeSpec>,
    pub ports: IndexSet<String>,
    pub env: IndexMap<String, String>,
    pub run_args: RunArgs,
    /// Canonical argv forms, resolved once at parse time.
    pub post_create: Option<Vec<String>>,
    pub post_start: Option<Vec<String>>,
    pub build: Option<ResolvedBuild>,
}

/// Load and resolve the descriptor for `workspace`.
pub fn resolve(workspace: &Path) -> Result<ResolvedConfig> {
    let (config, context) = config::load(workspace)?;
    resolve_config(&config, workspace, &context)
}

/// Resolve an already-parsed descriptor. Pure; exposed for tests.
#[instrument(skip_all, fields(workspace = %workspace.display()))]
pub fn resolve_config(
    config: &DevcontainerConfig,
    workspace: &Path,
    context: &SubstitutionContext,
) -> Result<ResolvedConfig> {
    let basename = workspace_basename(workspace);

    let name = config
        .name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| format!("acm-{}", basename));

    let workspace_folder = config
        .workspace_folder
        .as_deref()
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| context.container_workspace_folder.clone());

    let build = config
        .build
        .as_ref()
        .map(|section| resolve_build(section, workspace, &basename));

    let image = match config.image.as_deref().map(str::trim).filter(|i| !i.is_empty()) {
        Some(image) => image.to_string(),
        None => match &build {
            Some(build) => build
                .tags
                .first()
                .cloned()
                .expect("resolved build always carries at least the fallback tag"),
            None => {
                return Err(ConfigError::Validation {
                    message: "descriptor declares neither 'image' nor 'build'".to_string(),
                }
                .into())
            }
        },
    };

    // the build result must be directly runnable under the resolved image
    let build = build.map(|mut build| {
        if !build.tags.iter().any(|t| t == &image) {
            build.tags.push(image.clone());
        }
        build
    });

    let workspace_volume = VolumeSpec::read_write(
        workspace.to_string_lossy().to_string(),
        workspace_folder.clone(),
    );
    let mut volumes = vec![workspace_volume];
    for entry in &config.mounts {
        if let Some(volume) = parse_mount(entry) {
            if volumes.iter().any(|existing| existing.same_mapping(&volume)) {
                debug!("Suppressing duplicate mount {}", volume.to_volume_flag());
                continue;
            }
            volumes.push(volume);
        }
    }

    let ports = resolve_ports(&config.forward_ports);
    let run_args = parse_run_args(&config.run_args);

    Ok(ResolvedConfig {
        name,
        image,
        remote_user: config.remote_user.clone(),
        workspace_folder,
        volumes,
        ports,
        env: config.container_env.clone(),
        run_args,
        post_create: config.post_create_command.as_ref().map(|c| c.to_argv()),
        post_start: config.post_start_command.as_ref().map(|c| c.to_argv()),
        build,
    })
}

fn resolve_build(section: &BuildSection, workspace: &Path, basename: &str) -> ResolvedBuild {
    let context = workspace.join(section.context.as_deref().unwrap_or("."));
    let dockerfile = section
        .dockerfile
        .as_deref()
        .map(|dockerfile| context.join(dockerfile));

    let fallback_tag = format!("acm/{}:dev", slugify(basename));
    let mut tags = section.tags.clone();
    if !tags.iter().any(|t| t == &fallback_tag) {
        tags.push(fallback_tag);
    }

    ResolvedBuild {
        dockerfile,
        context,
        args: section.args.clone(),
        cpus: section.cpus.as_ref().and_then(|c| c.parse()),
        memory: section.memory.clone(),
        target: section.target.clone(),
        labels: section.labels.clone(),
        tags,
        platform: section.platform.clone(),
        no_cache: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CommandSpec, CpuSpec, PortSpec};

    fn context_for(workspace: &Path) -> SubstitutionContext {
        SubstitutionContext::new(workspace, None)
    }

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_run_args_round_trip() {
        let parsed = parse_run_args(&strings(&["--cpus", "2", "--memory=512M", "--foo", "bar"]));
        assert_eq!(parsed.cpus, Some(2.0));
        assert_eq!(parsed.memory.as_deref(), Some("512M"));
        assert_eq!(parsed.additional, strings(&["--foo", "bar"]));
    }

    #[test]
    fn test_parse_run_args_short_flags_and_order() {
        let parsed = parse_run_args(&strings(&[
            "--privileged",
            "-u",
            "dev",
            "-w=/src",
            "--network",
            "host",
        ]));
        assert_eq!(parsed.user.as_deref(), Some("dev"));
        assert_eq!(parsed.workdir.as_deref(), Some("/src"));
        assert_eq!(
            parsed.additional,
            strings(&["--privileged", "--network", "host"])
        );
    }

    #[test]
    fn test_parse_run_args_trailing_flag_passes_through() {
        let parsed = parse_run_args(&strings(&["--cpus"]));
        assert_eq!(parsed.cpus, None);
        assert_eq!(parsed.additional, strings(&["--cpus"]));
    }

    #[test]
    fn test_name_and_workspace_folder_defaults() {
        let workspace = PathBuf::from("/work/demo");
        let config = DevcontainerConfig {
            image: Some("node:18".to_string()),
            ..Default::default()
        };
        let resolved = resolve_config(&config, &workspace, &context_for(&workspace)).unwrap();
        assert_eq!(resolved.name, "acm-demo");
        assert_eq!(resolved.workspace_folder, "/workspaces/demo");
        assert_eq!(resolved.image, "node:18");
    }

    #[test]
    fn test_workspace_volume_first_and_dedup() {
        let workspace = PathBuf::from("/work/demo");
        let config = DevcontainerConfig {
            image: Some("node:18".to_string()),
            mounts: strings(&[
                "source=/work/demo,target=/workspaces/demo",
                "source=/host/cache,target=/cache",
            ]),
            ..Default::default()
        };
        let resolved = resolve_config(&config, &workspace, &context_for(&workspace)).unwrap();
        assert_eq!(resolved.volumes.len(), 2);
        assert_eq!(resolved.volumes[0].source, "/work/demo");
        assert_eq!(resolved.volumes[0].target, "/workspaces/demo");
        assert!(!resolved.volumes[0].readonly, "auto entry is read-write");
        assert_eq!(resolved.volumes[1].target, "/cache");
    }

    #[test]
    fn test_missing_image_and_build_is_config_error() {
        let workspace = PathBuf::from("/work/demo");
        let config = DevcontainerConfig::default();
        let err = resolve_config(&config, &workspace, &context_for(&workspace)).unwrap_err();
        assert!(err.to_string().contains("neither 'image' nor 'build'"));
    }

    #[test]
    fn test_image_from_first_build_tag() {
        let workspace = PathBuf::from("/work/My Demo");
        let config = DevcontainerConfig {
            build: Some(BuildSection {
                dockerfile: Some("Containerfile".to_string()),
                context: Some("docker".to_string()),
                tags: vec!["acme/app:latest".to_string()],
                ..Default::default()
            }),
            ..Default::default()
        };
        let resolved = resolve_config(&config, &workspace, &context_for(&workspace)).unwrap();
        assert_eq!(resolved.image, "acme/app:latest");

        let build = resolved.build.unwrap();
        assert!(build.tags.contains(&"acm/my-demo:dev".to_string()));
        assert_eq!(build.context, PathBuf::from("/work/My Demo/docker"));
        assert_eq!(
            build.dockerfile.unwrap(),
            PathBuf::from("/work/My Demo/docker/Containerfile")
        );
    }

    #[test]
    fn test_build_without_tags_gets_fallback_image() {
        let workspace = PathBuf::from("/work/demo");
        let config = DevcontainerConfig {
            build: Some(BuildSection {
                dockerfile: Some("Dockerfile".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        };
        let resolved = resolve_config(&config, &workspace, &context_for(&workspace)).unwrap();
        assert_eq!(resolved.image, "acm/demo:dev");
        assert_eq!(resolved.build.unwrap().tags, vec!["acm/demo:dev"]);
    }

    #[test]
    fn test_explicit_image_joins_build_tags() {
        let workspace = PathBuf::from("/work/demo");
        let config = DevcontainerConfig {
            image: Some("acme/dev:1".to_string()),
            build: Some(BuildSection::default()),
            ..Default::default()
        };
        let resolved = resolve_config(&config, &workspace, &context_for(&workspace)).unwrap();
        let build = resolved.build.unwrap();
        assert!(build.tags.contains(&"acme/dev:1".to_string()));
        assert!(build.tags.contains(&"acm/demo:dev".to_string()));
    }

    #[test]
    fn test_build_cpus_number_or_numeric_string() {
        let workspace = PathBuf::from("/work/demo");
        let mut config = DevcontainerConfig {
            image: Some("node:18".to_string()),
            build: Some(BuildSection {
                cpus: Some(CpuSpec::String("4".to_string())),
                ..Default::default()
            }),
            ..Default::default()
        };
        let resolved = resolve_config(&config, &workspace, &context_for(&workspace)).unwrap();
        assert_eq!(resolved.build.unwrap().cpus, Some(4.0));

        config.build.as_mut().unwrap().cpus = Some(CpuSpec::String("plenty".to_string()));
        let resolved = resolve_config(&config, &workspace, &context_for(&workspace)).unwrap();
        assert_eq!(resolved.build.unwrap().cpus, None, "unparseable cpus dropped");
    }

    #[test]
    fn test_ports_and_lifecycle_commands() {
        let workspace = PathBuf::from("/work/demo");
        let config = DevcontainerConfig {
            image: Some("node:18".to_string()),
            forward_ports: vec![
                PortSpec::Number(8080),
                PortSpec::String("2222:22".to_string()),
            ],
            post_create_command: Some(CommandSpec::ShellLine("echo hi".to_string())),
            ..Default::default()
        };
        let resolved = resolve_config(&config, &workspace, &context_for(&workspace)).unwrap();
        assert!(resolved.ports.contains("8080:8080"));
        assert!(resolved.ports.contains("2222:22"));
        assert_eq!(
            resolved.post_create.unwrap(),
            vec!["/bin/sh", "-c", "echo hi"]
        );
        assert!(resolved.post_start.is_none());
    }
}
