//! Runtime CLI output normalization
//!
//! The wrapped `container` tool has emitted, across versions, whole-payload
//! JSON, newline-delimited JSON, and column-aligned ASCII tables, with field
//! names and nesting that differ between all three. This module turns one
//! invocation's raw text into typed records behind a single stable schema.
//!
//! Parsing strategies are attempted in order: whole-payload JSON, NDJSON,
//! then the table fallback. The table fallback is authoritative as the third
//! strategy (older tool builds emit tables when `--format json` is not
//! understood); there is no synthetic-data fallback, and input that defeats
//! all three strategies yields zero records.

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

/// A container as reported by the runtime listing.
///
/// `name` is the reconciliation key; `running` is derived from the free-text
/// status. Everything else is descriptive and optional.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainerSummary {
    pub id: String,
    pub name: String,
    pub image: String,
    pub status: String,
    pub running: bool,
    pub ports: Option<String>,
    pub address: Option<String>,
    pub cpus: Option<String>,
    pub memory: Option<String>,
    pub os: Option<String>,
    pub arch: Option<String>,
    pub created: Option<String>,
}

/// An image as reported by the runtime listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageSummary {
    pub id: String,
    pub repository: String,
    pub tag: String,
    pub digest: Option<String>,
    pub size: Option<String>,
    pub created: Option<String>,
    /// True when a live container references this image; computed by
    /// [`mark_images_in_use`], not by parsing.
    #[serde(default)]
    pub in_use: bool,
}

/// Parse raw CLI text into generic records.
///
/// `Some(vec![])` means the payload parsed and was genuinely empty (an empty
/// JSON array, blank output); `None` means every strategy failed, which
/// callers use to retry an alternate subcommand spelling.
pub fn normalize(raw: &str) -> Option<Vec<serde_json::Map<String, Value>>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Some(Vec::new());
    }

    if let Some(records) = try_whole_json(trimmed) {
        return Some(records);
    }
    if let Some(records) = try_ndjson(trimmed) {
        return Some(records);
    }
    let records = try_table(trimmed);
    if records.is_empty() {
        debug!("No parsing strategy matched runtime output");
        None
    } else {
        Some(records)
    }
}

/// Lenient form of [`normalize`]: unparseable input is zero records.
pub fn parse_records(raw: &str) -> Vec<serde_json::Map<String, Value>> {
    normalize(raw).unwrap_or_default()
}

/// Array properties recognized when the payload is a JSON object.
const ARRAY_PROPERTIES: &[&str] = &["containers", "images", "items", "results"];

fn try_whole_json(raw: &str) -> Option<Vec<serde_json::Map<String, Value>>> {
    let value: Value = serde_json::from_str(raw).ok()?;
    match value {
        Value::Array(items) => Some(objects_of(items)),
        Value::Object(map) => {
            for prop in ARRAY_PROPERTIES {
                if let Some(Value::Array(items)) = map.get(*prop) {
                    return Some(objects_of(items.clone()));
                }
            }
            // a bare object is a single record
            Some(vec![map])
        }
        _ => None,
    }
}

/// Keep only the object members of a JSON array, dropping scalars and nested
/// arrays. Mirrors the object-only record rule the other strategies apply.
fn objects_of(items: Vec<Value>) -> Vec<serde_json::Map<String, Value>> {
    items
        .into_iter()
        .filter_map(|item| match item {
            Value::Object(map) => Some(map),
            _ => None,
        })
        .collect()
}

fn try_ndjson(raw: &str) -> Option<Vec<serde_json::Map<String, Value>>> {
    let mut records = Vec::new();
    for line in raw.lines().filter(|l| !l.trim().is_empty()) {
        // all-or-nothing: a single unparsable line fails the NDJSON attempt
        match serde_json::from_str::<Value>(line.trim()).ok()? {
            Value::Object(map) => records.push(map),
            _ => return None,
        }
    }
    if records.is_empty() {
        None
    } else {
        Some(records)
    }
}

/// Column-separator candidates, tried in priority order.
enum Separator {
    Tabs,
    Pipe,
    Spaces,
}

fn sniff_separator(header: &str) -> Separator {
    if header.contains('\t') {
        Separator::Tabs
    } else if header.contains('|') {
        Separator::Pipe
    } else {
        Separator::Spaces
    }
}

fn split_columns(line: &str, sep: &Separator) -> Vec<String> {
    let parts: Vec<String> = match sep {
        Separator::Tabs => line.split('\t').map(str::to_string).collect(),
        Separator::Pipe => line.split('|').map(str::to_string).collect(),
        Separator::Spaces => SPACE_RUN.split(line).map(str::to_string).collect(),
    };
    parts
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

static SPACE_RUN: once_cell::sync::Lazy<regex::Regex> =
    once_cell::sync::Lazy::new(|| regex::Regex::new(r" {2,}").expect("static regex"));

fn is_rule_line(line: &str) -> bool {
    !line.is_empty() && line.chars().all(|c| matches!(c, '-' | '+' | '|' | ' ' | '='))
}

fn try_table(raw: &str) -> Vec<serde_json::Map<String, Value>> {
    let mut lines = raw.lines().filter(|l| !l.trim().is_empty());
    let header = match lines.next() {
        Some(h) => h,
        None => return Vec::new(),
    };

    let sep = sniff_separator(header);
    let columns = split_columns(header, &sep);
    if columns.len() < 2 {
        return Vec::new();
    }

    let mut records = Vec::new();
    for line in lines {
        if is_rule_line(line.trim()) {
            continue;
        }
        let cells = split_columns(line, &sep);
        if cells.is_empty() {
            continue;
        }
        let mut record = serde_json::Map::new();
        for (column, cell) in columns.iter().zip(cells.iter()) {
            record.insert(column.clone(), Value::String(cell.clone()));
        }
        records.push(record);
    }
    records
}

/// Case-insensitive, whitespace-collapsed view over one record.
///
/// `CONTAINER ID`, `containerid`, `Container_Id` and `id` are distinct raw
/// keys that must resolve to the same cell, so lookups normalize keys down to
/// their alphanumeric characters.
pub struct RecordView<'a> {
    record: &'a serde_json::Map<String, Value>,
}

fn normalize_key(key: &str) -> String {
    key.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_ascii_lowercase()
}

impl<'a> RecordView<'a> {
    pub fn new(record: &'a serde_json::Map<String, Value>) -> Self {
        Self { record }
    }

    /// Look up the first of `keys` present in the record, matching
    /// normalized key names. A key containing `.` is treated as a nested
    /// path; arrays along the path are entered at their first element.
    pub fn get(&self, keys: &[&str]) -> Option<&'a Value> {
        for key in keys {
            if key.contains('.') {
                if let Some(v) = self.get_path(key) {
                    return Some(v);
                }
                continue;
            }
            let wanted = normalize_key(key);
            for (raw_key, value) in self.record.iter() {
                if normalize_key(raw_key) == wanted && !value.is_null() {
                    return Some(value);
                }
            }
        }
        None
    }

    fn get_path(&self, path: &str) -> Option<&'a Value> {
        let mut segments = path.split('.');
        let first = normalize_key(segments.next()?);
        let mut current: &'a Value = self
            .record
            .iter()
            .find(|(k, _)| normalize_key(k) == first)
            .map(|(_, v)| v)?;
        for segment in segments {
            if let Value::Array(items) = current {
                current = items.first()?;
            }
            let wanted = normalize_key(segment);
            current = current
                .as_object()?
                .iter()
                .find(|(k, _)| normalize_key(k) == wanted)
                .map(|(_, v)| v)?;
        }
        if let Value::Array(items) = current {
            current = items.first()?;
        }
        if current.is_null() {
            None
        } else {
            Some(current)
        }
    }

    /// String form of the first matching key, numbers rendered verbatim.
    pub fn get_str(&self, keys: &[&str]) -> Option<String> {
        match self.get(keys)? {
            Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }
}

/// Derive the running flag from free-text status ("running", "Up 3 hours").
pub fn running_from_status(status: &str) -> bool {
    let lower = status.trim().to_ascii_lowercase();
    lower.contains("running") || lower.starts_with("up")
}

/// Format a byte count as a human-readable unit string.
///
/// Values at or above 10 in a unit round to an integer; below 10 keep one
/// decimal place. `1023` stays in bytes.
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB", "PB"];
    if bytes < 1024 {
        return format!("{} B", bytes);
    }
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if value >= 10.0 {
        format!("{:.0} {}", value, UNITS[unit])
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}

/// Normalize port-binding structures into one comma-joined string.
///
/// Accepts the object form keyed by container port
/// (`{"8080/tcp": [{"HostIp": "0.0.0.0", "HostPort": "8080"}]}`), the array
/// form (`[{"hostPort": 8080, "containerPort": 80, "protocol": "tcp"}]`), or
/// a plain string (passed through). Entries render as
/// `[hostAddress:]hostPort->containerPort[/proto]` with the wildcard host
/// `0.0.0.0` omitted; duplicates are suppressed.
pub fn normalize_port_bindings(value: &Value) -> Option<String> {
    let mut entries: IndexSet<String> = IndexSet::new();

    match value {
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return None;
            }
            return Some(trimmed.to_string());
        }
        Value::Object(map) => {
            for (port_spec, bindings) in map {
                let (container_port, proto) = match port_spec.split_once('/') {
                    Some((p, proto)) => (p, Some(proto)),
                    None => (port_spec.as_str(), None),
                };
                let bindings = match bindings {
                    Value::Array(items) => items.as_slice(),
                    _ => continue,
                };
                for binding in bindings {
                    let view_map = match binding.as_object() {
                        Some(m) => m,
                        None => continue,
                    };
                    let view = RecordView::new(view_map);
                    let host_port = match view.get_str(&["hostport", "host_port"]) {
                        Some(p) => p,
                        None => continue,
                    };
                    let host_ip = view.get_str(&["hostip", "host_ip", "hostaddress"]);
                    entries.insert(render_binding(
                        host_ip.as_deref(),
                        &host_port,
                        container_port,
                        proto,
                    ));
                }
            }
        }
        Value::Array(items) => {
            for binding in items {
                let view_map = match binding.as_object() {
                    Some(m) => m,
                    None => continue,
                };
                let view = RecordView::new(view_map);
                let (host_port, container_port) = match (
                    view.get_str(&["hostport", "host_port"]),
                    view.get_str(&["containerport", "container_port", "targetport"]),
                ) {
                    (Some(h), Some(c)) => (h, c),
                    _ => continue,
                };
                let proto = view.get_str(&["protocol", "proto"]);
                let host_ip = view.get_str(&["hostip", "host_ip", "hostaddress"]);
                entries.insert(render_binding(
                    host_ip.as_deref(),
                    &host_port,
                    &container_port,
                    proto.as_deref(),
                ));
            }
        }
        _ => return None,
    }

    if entries.is_empty() {
        None
    } else {
        Some(entries.into_iter().collect::<Vec<_>>().join(", "))
    }
}

fn render_binding(
    host_ip: Option<&str>,
    host_port: &str,
    container_port: &str,
    proto: Option<&str>,
) -> String {
    let mut out = String::new();
    if let Some(ip) = host_ip {
        if !ip.is_empty() && ip != "0.0.0.0" {
            out.push_str(ip);
            out.push(':');
        }
    }
    out.push_str(host_port);
    out.push_str("->");
    out.push_str(container_port);
    if let Some(proto) = proto {
        if !proto.is_empty() {
            out.push('/');
            out.push_str(proto);
        }
    }
    out
}

/// Map one generic record onto a [`ContainerSummary`].
pub fn container_from_record(record: &serde_json::Map<String, Value>) -> Option<ContainerSummary> {
    let view = RecordView::new(record);

    let id = view.get_str(&["id", "containerid", "configuration.id"])?;
    let name = view
        .get_str(&["name", "names", "containername"])
        .unwrap_or_else(|| id.clone());
    let image = view
        .get_str(&[
            "image",
            "imagename",
            "configuration.image.reference",
            "image.reference",
        ])
        .unwrap_or_default();
    let status = view.get_str(&["status", "state"]).unwrap_or_default();

    let ports = view
        .get(&["ports", "publishedports", "portbindings"])
        .and_then(normalize_port_bindings);
    let address = view.get_str(&["address", "ip", "ipaddress", "networks.address"]);
    let cpus = view.get_str(&["cpus", "cpu", "configuration.resources.cpus"]);
    let memory = view
        .get(&["memory", "memoryinbytes", "configuration.resources.memoryinbytes"])
        .map(|v| match v {
            Value::Number(n) => n
                .as_u64()
                .map(format_bytes)
                .unwrap_or_else(|| n.to_string()),
            Value::String(s) => s.clone(),
            other => other.to_string(),
        });
    let os = view.get_str(&["os", "platform.os", "configuration.platform.os"]);
    let arch = view.get_str(&[
        "arch",
        "architecture",
        "platform.architecture",
        "configuration.platform.architecture",
    ]);
    let created = view.get_str(&["created", "createdat", "creation"]);

    Some(ContainerSummary {
        running: running_from_status(&status),
        id,
        name,
        image,
        status,
        ports,
        address,
        cpus,
        memory,
        os,
        arch,
        created,
    })
}

/// OCI annotation carrying the image reference when no direct field exists.
const OCI_REF_ANNOTATION: &str = "org.opencontainers.image.ref.name";

/// Map one generic record onto an [`ImageSummary`].
pub fn image_from_record(record: &serde_json::Map<String, Value>) -> Option<ImageSummary> {
    let view = RecordView::new(record);

    let reference = view
        .get_str(&["reference", "name", "image"])
        .or_else(|| annotation_reference(record));

    let (mut repository, mut tag) = match &reference {
        Some(r) => split_reference(r),
        None => (None, None),
    };
    if repository.is_none() {
        repository = view.get_str(&["repository", "repo"]);
    }
    if tag.is_none() {
        tag = view.get_str(&["tag"]);
    }

    let digest = view.get_str(&["digest", "descriptor.digest"]);
    let id = view
        .get_str(&["id", "imageid"])
        .or_else(|| digest.clone())
        .or_else(|| reference.clone())?;
    let repository = repository?;

    let size = view.get(&["size", "descriptor.size"]).map(|v| match v {
        Value::Number(n) => n
            .as_u64()
            .map(format_bytes)
            .unwrap_or_else(|| n.to_string()),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    });
    let created = view.get_str(&["created", "createdat"]);

    Some(ImageSummary {
        id,
        repository,
        tag: tag.unwrap_or_else(|| "latest".to_string()),
        digest,
        size,
        created,
        in_use: false,
    })
}

fn annotation_reference(record: &serde_json::Map<String, Value>) -> Option<String> {
    let view = RecordView::new(record);
    let descriptor = view.get(&["descriptor"])?.as_object()?;
    let annotations = RecordView::new(descriptor).get(&["annotations"])?.as_object()?;
    annotations
        .get(OCI_REF_ANNOTATION)
        .and_then(|v| v.as_str())
        .map(str::to_string)
}

/// Split `repo[:tag]` at the tag colon, tolerating registry ports.
fn split_reference(reference: &str) -> (Option<String>, Option<String>) {
    let slash = reference.rfind('/');
    match reference.rfind(':') {
        Some(colon) if slash.map(|s| colon > s).unwrap_or(true) => (
            Some(reference[..colon].to_string()),
            Some(reference[colon + 1..].to_string()),
        ),
        _ => (Some(reference.to_string()), None),
    }
}

/// Drop a leading registry host segment (`ghcr.io/`, `localhost:5000/`).
fn strip_registry(reference: &str) -> &str {
    match reference.split_once('/') {
        Some((host, rest)) if host.contains('.') || host.contains(':') => rest,
        _ => reference,
    }
}

/// Compute the `in_use` flag for every image against live containers.
///
/// An image is in use when any container's image reference matches it by
/// exact reference, repository, repository:tag, digest, or id, after
/// registry-prefix stripping on both sides.
pub fn mark_images_in_use(images: &mut [ImageSummary], containers: &[ContainerSummary]) {
    let references: Vec<&str> = containers
        .iter()
        .map(|c| c.image.as_str())
        .filter(|r| !r.is_empty())
        .collect();

    for image in images.iter_mut() {
        let repo_tag = format!("{}:{}", image.repository, image.tag);
        image.in_use = references.iter().any(|r| {
            let stripped = strip_registry(r);
            *r == repo_tag
                || stripped == repo_tag
                || stripped == strip_registry(&repo_tag)
                || stripped == image.repository
                || stripped == strip_registry(&image.repository)
                || *r == image.id
                || image.digest.as_deref() == Some(*r)
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_whole_json_array() {
        let raw = r#"[{"id": "abc", "name": "web", "image": "nginx", "status": "running"}]"#;
        let records = parse_records(raw);
        assert_eq!(records.len(), 1);
        let summary = container_from_record(&records[0]).unwrap();
        assert_eq!(summary.id, "abc");
        assert!(summary.running);
    }

    #[test]
    fn test_whole_json_named_array_property() {
        let raw = r#"{"containers": [{"id": "a"}, {"id": "b"}]}"#;
        let records = parse_records(raw);
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn test_ndjson() {
        let raw = "{\"id\": \"a\", \"status\": \"Up 2 hours\"}\n\n{\"id\": \"b\", \"status\": \"exited\"}";
        let records = parse_records(raw);
        assert_eq!(records.len(), 2);
        assert!(container_from_record(&records[0]).unwrap().running);
        assert!(!container_from_record(&records[1]).unwrap().running);
    }

    #[test]
    fn test_ndjson_is_all_or_nothing() {
        // second line is not JSON, so the NDJSON attempt fails as a whole and
        // the table fallback sees a 2-column space-run layout
        let raw = "{\"id\": \"a\"}\nnot  json";
        let records = parse_records(raw);
        // header "{"id": "a"}" does not yield >= 2 columns, so zero records
        assert!(records.is_empty());
    }

    #[test]
    fn test_table_two_space_separator() {
        let raw = "CONTAINER ID  NAME      IMAGE        STATUS\n\
                   abc123        acm-demo  node:18      running\n\
                   def456        other     ubuntu:22.04  stopped";
        let records = parse_records(raw);
        assert_eq!(records.len(), 2);
        let summary = container_from_record(&records[0]).unwrap();
        assert_eq!(summary.id, "abc123");
        assert_eq!(summary.name, "acm-demo");
        assert_eq!(summary.image, "node:18");
        assert!(summary.running);
    }

    #[test]
    fn test_table_tab_separator() {
        let raw = "ID\tNAME\tSTATUS\nabc\tweb\trunning";
        let records = parse_records(raw);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].get("NAME").unwrap(), "web");
    }

    #[test]
    fn test_table_pipe_separator_with_rule_lines() {
        let raw = "| ID | NAME | STATUS |\n|----|------|--------|\n| abc | web | running |";
        let records = parse_records(raw);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].get("ID").unwrap(), "abc");
    }

    #[test]
    fn test_table_and_json_normalize_identically() {
        let json_raw = r#"[{"ID": "abc123", "Names": "acm-demo", "Image": "node:18", "Status": "running"}]"#;
        let table_raw = "CONTAINER ID  NAME      IMAGE    STATUS\n\
                         abc123        acm-demo  node:18  running";

        let from_json = container_from_record(&parse_records(json_raw)[0]).unwrap();
        let from_table = container_from_record(&parse_records(table_raw)[0]).unwrap();

        assert_eq!(from_json.id, from_table.id);
        assert_eq!(from_json.name, from_table.name);
        assert_eq!(from_json.image, from_table.image);
        assert_eq!(from_json.status, from_table.status);
    }

    #[test]
    fn test_nested_field_paths() {
        let raw = r#"[{
            "configuration": {
                "id": "acm-demo",
                "image": {"reference": "node:18"},
                "resources": {"cpus": 4, "memoryInBytes": 2147483648}
            },
            "status": "running",
            "networks": [{"address": "192.168.64.3/24"}]
        }]"#;
        let records = parse_records(raw);
        let summary = container_from_record(&records[0]).unwrap();
        assert_eq!(summary.id, "acm-demo");
        assert_eq!(summary.image, "node:18");
        assert_eq!(summary.cpus.as_deref(), Some("4"));
        assert_eq!(summary.memory.as_deref(), Some("2.0 GB"));
        assert_eq!(summary.address.as_deref(), Some("192.168.64.3/24"));
    }

    #[test]
    fn test_format_bytes_boundaries() {
        assert_eq!(format_bytes(0), "0 B");
        assert_eq!(format_bytes(1023), "1023 B");
        assert_eq!(format_bytes(1024), "1.0 KB");
        assert_eq!(format_bytes(10240), "10 KB");
        assert_eq!(format_bytes(1536), "1.5 KB");
        assert_eq!(format_bytes(1024 * 1024), "1.0 MB");
        assert_eq!(format_bytes(5 * 1024 * 1024 * 1024), "5.0 GB");
    }

    #[test]
    fn test_port_bindings_object_form() {
        let value = json!({
            "8080/tcp": [{"HostIp": "0.0.0.0", "HostPort": "8080"}],
            "22/tcp": [{"HostIp": "127.0.0.1", "HostPort": "2222"}]
        });
        let rendered = normalize_port_bindings(&value).unwrap();
        assert!(rendered.contains("8080->8080/tcp"));
        assert!(!rendered.contains("0.0.0.0"));
        assert!(rendered.contains("127.0.0.1:2222->22/tcp"));
    }

    #[test]
    fn test_port_bindings_array_form_dedup() {
        let value = json!([
            {"hostPort": 8080, "containerPort": 80, "protocol": "tcp"},
            {"hostPort": 8080, "containerPort": 80, "protocol": "tcp"}
        ]);
        assert_eq!(
            normalize_port_bindings(&value).unwrap(),
            "8080->80/tcp"
        );
    }

    #[test]
    fn test_image_reference_split_and_default_tag() {
        let raw = r#"[{"reference": "ghcr.io/acme/tool:v2", "size": 1048576}]"#;
        let image = image_from_record(&parse_records(raw)[0]).unwrap();
        assert_eq!(image.repository, "ghcr.io/acme/tool");
        assert_eq!(image.tag, "v2");
        assert_eq!(image.size.as_deref(), Some("1.0 MB"));

        let raw = r#"[{"reference": "ubuntu"}]"#;
        let image = image_from_record(&parse_records(raw)[0]).unwrap();
        assert_eq!(image.tag, "latest");
    }

    #[test]
    fn test_image_reference_from_oci_annotation() {
        let raw = r#"[{
            "descriptor": {
                "digest": "sha256:deadbeef",
                "size": 123,
                "annotations": {"org.opencontainers.image.ref.name": "node:18"}
            }
        }]"#;
        let image = image_from_record(&parse_records(raw)[0]).unwrap();
        assert_eq!(image.repository, "node");
        assert_eq!(image.tag, "18");
        assert_eq!(image.digest.as_deref(), Some("sha256:deadbeef"));
    }

    #[test]
    fn test_registry_port_does_not_split_tag() {
        let (repo, tag) = split_reference("localhost:5000/app");
        assert_eq!(repo.as_deref(), Some("localhost:5000/app"));
        assert_eq!(tag, None);
    }

    #[test]
    fn test_mark_images_in_use() {
        let containers = vec![
            container_from_record(
                &parse_records(r#"[{"id": "c1", "image": "node:18", "status": "running"}]"#)[0],
            )
            .unwrap(),
        ];
        let mut images = vec![
            image_from_record(&parse_records(r#"[{"reference": "node:18", "id": "i1"}]"#)[0])
                .unwrap(),
            image_from_record(&parse_records(r#"[{"reference": "ubuntu:22.04", "id": "i2"}]"#)[0])
                .unwrap(),
            image_from_record(
                &parse_records(r#"[{"reference": "docker.io/node:18", "id": "i3"}]"#)[0],
            )
            .unwrap(),
        ];
        mark_images_in_use(&mut images, &containers);
        assert!(images[0].in_use);
        assert!(!images[1].in_use);
        assert!(images[2].in_use, "registry prefix must be stripped");
    }

    #[test]
    fn test_empty_and_garbage_input() {
        assert!(parse_records("").is_empty());
        assert!(parse_records("   \n  ").is_empty());
        assert!(parse_records("no structure here").is_empty());
    }
}
