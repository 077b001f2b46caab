//! Mount string parsing
//!
//! Descriptor `mounts` entries use the `key=value[,key=value...]` form with
//! the usual synonym spread: `source`/`src`, `target`/`dst`/`destination`,
//! `readonly`/`ro`, plus bare `ro`/`rw` tokens.

use serde::{Deserialize, Serialize};
use tracing::debug;

/// A resolved volume: host source, container target, writability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeSpec {
    pub source: String,
    pub target: String,
    pub readonly: bool,
}

impl VolumeSpec {
    pub fn read_write(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            readonly: false,
        }
    }

    /// Whether this volume mounts the same source onto the same target as
    /// `other`, regardless of writability.
    pub fn same_mapping(&self, other: &VolumeSpec) -> bool {
        self.source == other.source && self.target == other.target
    }

    /// Render as a runtime `--volume` argument.
    pub fn to_volume_flag(&self) -> String {
        if self.readonly {
            format!("{}:{}:ro", self.source, self.target)
        } else {
            format!("{}:{}", self.source, self.target)
        }
    }
}

/// Parse one descriptor mount string. Entries without both a source and a
/// target are dropped (logged), not errors.
pub fn parse_mount(entry: &str) -> Option<VolumeSpec> {
    let mut source = None;
    let mut target = None;
    let mut readonly = false;

    for token in entry.split(',').map(str::trim).filter(|t| !t.is_empty()) {
        match token.split_once('=') {
            Some((key, value)) => match key.trim().to_ascii_lowercase().as_str() {
                "source" | "src" => source = Some(value.trim().to_string()),
                "target" | "dst" | "destination" => target = Some(value.trim().to_string()),
                "readonly" | "ro" => {
                    readonly = matches!(value.trim().to_ascii_lowercase().as_str(), "true" | "1")
                }
                "type" => {} // bind is the only supported type; the key is tolerated
                other => debug!("Ignoring unknown mount key '{}' in '{}'", other, entry),
            },
            None => match token.to_ascii_lowercase().as_str() {
                "ro" | "readonly" => readonly = true,
                "rw" => readonly = false,
                other => debug!("Ignoring unknown mount token '{}' in '{}'", other, entry),
            },
        }
    }

    match (source, target) {
        (Some(source), Some(target)) => Some(VolumeSpec {
            source,
            target,
            readonly,
        }),
        _ => {
            debug!("Dropping mount entry without source and target: '{}'", entry);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_basic_mount() {
        let spec = parse_mount("source=/host/data,target=/data").unwrap();
        assert_eq!(spec.source, "/host/data");
        assert_eq!(spec.target, "/data");
        assert!(!spec.readonly);
        assert_eq!(spec.to_volume_flag(), "/host/data:/data");
    }

    #[test]
    fn test_parse_synonyms_and_readonly() {
        let spec = parse_mount("src=/a,dst=/b,readonly=true").unwrap();
        assert!(spec.readonly);
        assert_eq!(spec.to_volume_flag(), "/a:/b:ro");

        let spec = parse_mount("source=/a,destination=/b,ro").unwrap();
        assert!(spec.readonly);

        let spec = parse_mount("source=/a,target=/b,rw").unwrap();
        assert!(!spec.readonly);
    }

    #[test]
    fn test_parse_tolerates_type_and_unknown_keys() {
        let spec = parse_mount("type=bind,source=/a,target=/b,consistency=cached").unwrap();
        assert_eq!(spec.source, "/a");
    }

    #[test]
    fn test_incomplete_mount_is_dropped() {
        assert!(parse_mount("source=/only-source").is_none());
        assert!(parse_mount("").is_none());
    }

    #[test]
    fn test_same_mapping_ignores_writability() {
        let a = VolumeSpec::read_write("/w", "/workspaces/w");
        let b = VolumeSpec {
            source: "/w".to_string(),
            target: "/workspaces/w".to_string(),
            readonly: true,
        };
        assert!(a.same_mapping(&b));
    }
}
