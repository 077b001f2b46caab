//! Variable substitution for devcontainer descriptors
//!
//! Recognizes exactly four token forms inside `${...}`:
//!
//! - `${localWorkspaceFolder}`: host workspace path
//! - `${localWorkspaceFolderBasename}`: workspace directory name
//! - `${containerWorkspaceFolder}`: container-side workspace path
//! - `${localEnv:NAME}`: host environment variable, empty string when unset
//!
//! Any other token resolves to an empty string. This is permissive on
//! purpose: a typo'd variable degrades to an empty value instead of failing
//! the whole resolution.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use tracing::warn;

static VARIABLE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$\{([^}]+)\}").expect("static regex"));

/// Values available for substitution, fixed for one resolution pass.
#[derive(Debug, Clone)]
pub struct SubstitutionContext {
    /// Host workspace path
    pub local_workspace_folder: String,
    /// Workspace directory name
    pub workspace_basename: String,
    /// Container-side workspace path
    pub container_workspace_folder: String,
    /// Host environment variables
    pub local_env: HashMap<String, String>,
}

impl SubstitutionContext {
    /// Build a context for `workspace_path`.
    ///
    /// `container_workspace_folder` may be supplied from a literal
    /// `workspaceFolder` descriptor value; otherwise the conventional
    /// `/workspaces/<basename>` default applies.
    pub fn new(workspace_path: &Path, container_workspace_folder: Option<&str>) -> Self {
        let workspace_basename = workspace_basename(workspace_path);
        let container_workspace_folder = container_workspace_folder
            .map(str::to_string)
            .unwrap_or_else(|| format!("/workspaces/{}", workspace_basename));

        Self {
            local_workspace_folder: workspace_path.to_string_lossy().to_string(),
            workspace_basename,
            container_workspace_folder,
            local_env: std::env::vars().collect(),
        }
    }

    /// Context with an explicit environment map (used by tests).
    pub fn with_env(mut self, env: HashMap<String, String>) -> Self {
        self.local_env = env;
        self
    }

    /// Substitute all recognized tokens in `input`.
    pub fn substitute(&self, input: &str) -> String {
        VARIABLE_PATTERN
            .replace_all(input, |caps: &regex::Captures| {
                self.resolve_token(&caps[1])
            })
            .to_string()
    }

    fn resolve_token(&self, token: &str) -> String {
        match token {
            "localWorkspaceFolder" => self.local_workspace_folder.clone(),
            "localWorkspaceFolderBasename" => self.workspace_basename.clone(),
            "containerWorkspaceFolder" => self.container_workspace_folder.clone(),
            _ => {
                if let Some(name) = token.strip_prefix("localEnv:") {
                    self.local_env.get(name).cloned().unwrap_or_default()
                } else {
                    warn!("Unknown substitution variable '${{{}}}', resolving to empty", token);
                    String::new()
                }
            }
        }
    }

    /// Substitute tokens in every string value of a JSON tree, in place.
    pub fn substitute_json(&self, value: &mut Value) {
        match value {
            Value::String(s) => {
                if s.contains("${") {
                    *s = self.substitute(s);
                }
            }
            Value::Array(items) => {
                for item in items {
                    self.substitute_json(item);
                }
            }
            Value::Object(map) => {
                for (_, v) in map.iter_mut() {
                    self.substitute_json(v);
                }
            }
            _ => {}
        }
    }
}

/// Directory name of the workspace, `workspace` when the path has no
/// final component.
pub fn workspace_basename(workspace_path: &Path) -> String {
    workspace_path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "workspace".to_string())
}

/// Slugify a workspace basename for use inside an image tag: lowercase,
/// non-alphanumerics collapsed to single dashes.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut last_dash = true;
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
            last_dash = false;
        } else if !last_dash {
            slug.push('-');
            last_dash = true;
        }
    }
    let trimmed = slug.trim_end_matches('-');
    if trimmed.is_empty() {
        "workspace".to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::path::PathBuf;

    fn context() -> SubstitutionContext {
        let mut env = HashMap::new();
        env.insert("HOME_CITY".to_string(), "cupertino".to_string());
        SubstitutionContext::new(&PathBuf::from("/work/my-app"), None).with_env(env)
    }

    #[test]
    fn test_workspace_tokens() {
        let ctx = context();
        assert_eq!(ctx.substitute("${localWorkspaceFolder}"), "/work/my-app");
        assert_eq!(ctx.substitute("${localWorkspaceFolderBasename}"), "my-app");
        assert_eq!(
            ctx.substitute("${containerWorkspaceFolder}/src"),
            "/workspaces/my-app/src"
        );
    }

    #[test]
    fn test_local_env_token() {
        let ctx = context();
        assert_eq!(ctx.substitute("city=${localEnv:HOME_CITY}"), "city=cupertino");
        assert_eq!(ctx.substitute("${localEnv:ACM_UNSET_VAR}"), "");
    }

    #[test]
    fn test_unknown_token_resolves_empty() {
        let ctx = context();
        assert_eq!(ctx.substitute("a${devcontainerId}b"), "ab");
    }

    #[test]
    fn test_explicit_container_workspace_folder() {
        let ctx = SubstitutionContext::new(&PathBuf::from("/work/my-app"), Some("/src"));
        assert_eq!(ctx.substitute("${containerWorkspaceFolder}"), "/src");
    }

    #[test]
    fn test_substitute_json_walks_tree() {
        let ctx = context();
        let mut value = json!({
            "image": "node:18",
            "containerEnv": {"WS": "${localWorkspaceFolder}"},
            "mounts": ["source=${localWorkspaceFolder}/data,target=/data"],
            "forwardPorts": [8080]
        });
        ctx.substitute_json(&mut value);
        assert_eq!(value["containerEnv"]["WS"], "/work/my-app");
        assert_eq!(
            value["mounts"][0],
            "source=/work/my-app/data,target=/data"
        );
        assert_eq!(value["forwardPorts"][0], 8080);
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("My App"), "my-app");
        assert_eq!(slugify("demo"), "demo");
        assert_eq!(slugify("a__b..c"), "a-b-c");
        assert_eq!(slugify("--"), "workspace");
    }
}
