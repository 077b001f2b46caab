//! Devcontainer descriptor loading and parsing
//!
//! The descriptor lives at `.appcontainer/devcontainer.json` or
//! `.appcontainer.json` under the workspace, deliberately distinct from the
//! conventional `.devcontainer/` path so unrelated tooling reading that path
//! is not confused by ours.
//!
//! ## Comment handling
//!
//! Descriptors tolerate comments, with a narrow stripping policy: block
//! comments (`/* ... */`) and lines consisting solely of a `//` comment are
//! removed; an inline trailing `//` on a code line is NOT stripped. The
//! narrow rule keeps `//` inside string values (URLs, for instance) intact
//! without a lexer.

use crate::errors::{ConfigError, Result};
use crate::variable::SubstitutionContext;
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, instrument};

/// Candidate descriptor paths relative to the workspace, tried in order.
pub const CONFIG_CANDIDATES: &[&str] = &[".appcontainer/devcontainer.json", ".appcontainer.json"];

/// A lifecycle command: a shell line or an explicit argv.
///
/// The descriptor allows both a single string and a string array; the two
/// shapes are resolved into this tagged form once, at parse time, and into a
/// canonical argv by [`CommandSpec::to_argv`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum CommandSpec {
    /// A single shell line, run via `/bin/sh -c`
    ShellLine(String),
    /// An explicit argv, used verbatim
    Argv(Vec<String>),
}

impl CommandSpec {
    /// Canonical argv for execution inside the container.
    ///
    /// An empty shell line yields a no-op (`/bin/true`) rather than an error.
    pub fn to_argv(&self) -> Vec<String> {
        match self {
            CommandSpec::ShellLine(line) => {
                if line.trim().is_empty() {
                    vec!["/bin/true".to_string()]
                } else {
                    vec!["/bin/sh".to_string(), "-c".to_string(), line.clone()]
                }
            }
            CommandSpec::Argv(argv) => {
                if argv.is_empty() {
                    vec!["/bin/true".to_string()]
                } else {
                    argv.clone()
                }
            }
        }
    }
}

impl<'de> Deserialize<'de> for CommandSpec {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        use serde::de::Error;
        let value = serde_json::Value::deserialize(deserializer)?;
        match value {
            serde_json::Value::String(s) => Ok(CommandSpec::ShellLine(s)),
            serde_json::Value::Array(items) => {
                let mut argv = Vec::with_capacity(items.len());
                for item in items {
                    match item {
                        serde_json::Value::String(s) => argv.push(s),
                        _ => {
                            return Err(D::Error::custom(
                                "lifecycle command array must contain only strings",
                            ))
                        }
                    }
                }
                Ok(CommandSpec::Argv(argv))
            }
            _ => Err(D::Error::custom(
                "lifecycle command must be a string or an array of strings",
            )),
        }
    }
}

/// CPU count: a number, or a numeric string (which may have been produced by
/// variable substitution). Unparseable values are dropped, not errors.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum CpuSpec {
    Number(f64),
    String(String),
}

impl CpuSpec {
    pub fn parse(&self) -> Option<f64> {
        match self {
            CpuSpec::Number(n) => Some(*n),
            CpuSpec::String(s) => s.trim().parse::<f64>().ok(),
        }
    }
}

/// A forwarded port: a bare number or a mapping string.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum PortSpec {
    Number(u16),
    String(String),
}

/// Image build section of the descriptor.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct BuildSection {
    pub dockerfile: Option<String>,
    pub context: Option<String>,
    pub args: IndexMap<String, String>,
    pub cpus: Option<CpuSpec>,
    pub memory: Option<String>,
    pub target: Option<String>,
    pub labels: IndexMap<String, String>,
    pub tags: Vec<String>,
    pub platform: Option<String>,
}

/// The user-authored devcontainer descriptor.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct DevcontainerConfig {
    pub name: Option<String>,
    pub image: Option<String>,
    pub remote_user: Option<String>,
    pub workspace_folder: Option<String>,
    pub run_args: Vec<String>,
    pub container_env: IndexMap<String, String>,
    pub mounts: Vec<String>,
    pub forward_ports: Vec<PortSpec>,
    pub post_create_command: Option<CommandSpec>,
    pub post_start_command: Option<CommandSpec>,
    pub build: Option<BuildSection>,
}

/// Top-level keys the parser understands; anything else is logged and
/// ignored.
const KNOWN_KEYS: &[&str] = &[
    "name",
    "image",
    "remoteUser",
    "workspaceFolder",
    "runArgs",
    "containerEnv",
    "mounts",
    "forwardPorts",
    "postCreateCommand",
    "postStartCommand",
    "build",
];

static BLOCK_COMMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)/\*.*?\*/").expect("static regex"));

/// Strip tolerated comments from descriptor text.
///
/// Only block comments and whole-line `//` comments are removed; a `//`
/// appearing after code (or inside a string value) is left alone.
pub fn strip_json_comments(input: &str) -> String {
    let without_blocks = BLOCK_COMMENT.replace_all(input, "");
    without_blocks
        .lines()
        .filter(|line| !line.trim_start().starts_with("//"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Locate the descriptor under `workspace`, trying candidates in order.
pub fn locate(workspace: &Path) -> Result<PathBuf> {
    for candidate in CONFIG_CANDIDATES {
        let path = workspace.join(candidate);
        if path.is_file() {
            return Ok(path);
        }
    }
    Err(ConfigError::NotFound {
        workspace: workspace.display().to_string(),
        candidates: CONFIG_CANDIDATES.join(", "),
    }
    .into())
}

/// Load and parse the descriptor for `workspace`, applying variable
/// substitution. Returns the typed config and the substitution context used
/// (the resolver reuses it).
#[instrument(skip_all, fields(workspace = %workspace.display()))]
pub fn load(workspace: &Path) -> Result<(DevcontainerConfig, SubstitutionContext)> {
    let path = locate(workspace)?;
    debug!("Loading devcontainer configuration from {}", path.display());

    let raw = std::fs::read_to_string(&path).map_err(ConfigError::Io)?;
    let stripped = strip_json_comments(&raw);

    let mut value: serde_json::Value =
        serde_json::from_str(&stripped).map_err(|e| ConfigError::Parsing {
            message: format!("{}: {}", path.display(), e),
        })?;

    if let Some(map) = value.as_object() {
        let known: HashSet<&str> = KNOWN_KEYS.iter().copied().collect();
        for key in map.keys() {
            if !known.contains(key.as_str()) {
                debug!("Ignoring unknown configuration key '{}'", key);
            }
        }
    }

    // A literal workspaceFolder participates in ${containerWorkspaceFolder}
    // resolution; one that itself contains variables falls back to the
    // default container path.
    let literal_workspace_folder = value
        .get("workspaceFolder")
        .and_then(|v| v.as_str())
        .filter(|s| !s.contains("${"))
        .map(str::to_string);

    let context = SubstitutionContext::new(workspace, literal_workspace_folder.as_deref());
    context.substitute_json(&mut value);

    let config: DevcontainerConfig =
        serde_json::from_value(value).map_err(|e| ConfigError::Parsing {
            message: format!("{}: {}", path.display(), e),
        })?;

    Ok((config, context))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_block_comments() {
        let input = "{\n/* a\n   multi-line comment */\n\"image\": \"node:18\"\n}";
        let stripped = strip_json_comments(input);
        assert!(serde_json::from_str::<serde_json::Value>(&stripped).is_ok());
    }

    #[test]
    fn test_strip_full_line_comments_only() {
        let input = "{\n  // full-line comment\n  \"image\": \"node:18\"\n}";
        let stripped = strip_json_comments(input);
        assert!(!stripped.contains("full-line"));
        assert!(stripped.contains("node:18"));
    }

    #[test]
    fn test_inline_comment_is_preserved() {
        // the policy is narrow on purpose: an inline `//` stays, so a URL in
        // a string value survives
        let input = "{\"homepage\": \"https://example.com\"}";
        let stripped = strip_json_comments(input);
        let value: serde_json::Value = serde_json::from_str(&stripped).unwrap();
        assert_eq!(value["homepage"], "https://example.com");
    }

    #[test]
    fn test_command_spec_shapes() {
        let config: DevcontainerConfig = serde_json::from_str(
            r#"{"postCreateCommand": "npm install", "postStartCommand": ["echo", "hi"]}"#,
        )
        .unwrap();
        assert_eq!(
            config.post_create_command,
            Some(CommandSpec::ShellLine("npm install".to_string()))
        );
        assert_eq!(
            config.post_create_command.unwrap().to_argv(),
            vec!["/bin/sh", "-c", "npm install"]
        );
        assert_eq!(
            config.post_start_command.unwrap().to_argv(),
            vec!["echo", "hi"]
        );
    }

    #[test]
    fn test_empty_shell_line_is_noop() {
        let spec = CommandSpec::ShellLine("   ".to_string());
        assert_eq!(spec.to_argv(), vec!["/bin/true"]);
        let spec = CommandSpec::Argv(vec![]);
        assert_eq!(spec.to_argv(), vec!["/bin/true"]);
    }

    #[test]
    fn test_command_spec_rejects_mixed_array() {
        let result = serde_json::from_str::<DevcontainerConfig>(
            r#"{"postCreateCommand": ["echo", 42]}"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_cpu_spec_number_or_string() {
        assert_eq!(CpuSpec::Number(2.0).parse(), Some(2.0));
        assert_eq!(CpuSpec::String("4".to_string()).parse(), Some(4.0));
        assert_eq!(CpuSpec::String("lots".to_string()).parse(), None);
    }

    #[test]
    fn test_locate_candidate_order() {
        let dir = tempfile::tempdir().unwrap();
        let workspace = dir.path();

        assert!(locate(workspace).is_err());

        std::fs::write(workspace.join(".appcontainer.json"), "{}").unwrap();
        assert!(locate(workspace)
            .unwrap()
            .ends_with(".appcontainer.json"));

        std::fs::create_dir(workspace.join(".appcontainer")).unwrap();
        std::fs::write(
            workspace.join(".appcontainer/devcontainer.json"),
            "{}",
        )
        .unwrap();
        // the nested path wins once present
        assert!(locate(workspace)
            .unwrap()
            .ends_with(".appcontainer/devcontainer.json"));
    }

    #[test]
    fn test_load_substitutes_variables() {
        let dir = tempfile::tempdir().unwrap();
        let workspace = dir.path();
        std::fs::write(
            workspace.join(".appcontainer.json"),
            r#"{
                // dev image
                "image": "node:18",
                "containerEnv": {"WS": "${containerWorkspaceFolder}"}
            }"#,
        )
        .unwrap();

        let (config, context) = load(workspace).unwrap();
        assert_eq!(config.image.as_deref(), Some("node:18"));
        assert_eq!(
            config.container_env.get("WS").unwrap(),
            &context.container_workspace_folder
        );
    }

    #[test]
    fn test_load_invalid_json_is_parsing_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(".appcontainer.json"), "{ nope").unwrap();
        let err = load(dir.path()).unwrap_err();
        assert!(err.to_string().contains("Failed to parse"));
    }

    #[test]
    fn test_literal_workspace_folder_feeds_context() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(".appcontainer.json"),
            r#"{"image": "node:18", "workspaceFolder": "/src", "containerEnv": {"WS": "${containerWorkspaceFolder}"}}"#,
        )
        .unwrap();
        let (config, _) = load(dir.path()).unwrap();
        assert_eq!(config.container_env.get("WS").unwrap(), "/src");
    }
}
