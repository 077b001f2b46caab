//! Port forwarding specifications
//!
//! `forwardPorts` entries are numbers or strings; a bare port `N` expands to
//! the symmetric mapping `N:N`. The resolved form is a deduplicated set of
//! `host:container[/proto]` strings whose insertion order is preserved only
//! for display.

use crate::config::PortSpec;
use indexmap::IndexSet;

/// Host port used for the SSH config entry when no `:22` forwarding rule is
/// declared.
pub const DEFAULT_SSH_PORT: u16 = 2222;

/// Expand one port spec into its `host:container` form.
pub fn expand_port(spec: &PortSpec) -> String {
    match spec {
        PortSpec::Number(port) => format!("{}:{}", port, port),
        PortSpec::String(s) => {
            let trimmed = s.trim();
            if trimmed.contains(':') {
                trimmed.to_string()
            } else {
                format!("{}:{}", trimmed, trimmed)
            }
        }
    }
}

/// Resolve a descriptor's forwarded ports into a deduplicated set.
pub fn resolve_ports(specs: &[PortSpec]) -> IndexSet<String> {
    specs.iter().map(expand_port).collect()
}

/// Host and container parts of a resolved port entry, tolerating the
/// `proto:host:container` form and a `/proto` suffix.
fn split_entry(entry: &str) -> Option<(&str, &str)> {
    let without_proto = entry.split('/').next().unwrap_or(entry);
    let parts: Vec<&str> = without_proto.split(':').collect();
    match parts.as_slice() {
        [host, container] => Some((host, container)),
        [_proto, host, container] => Some((host, container)),
        _ => None,
    }
}

/// The host port forwarding to container port 22, or [`DEFAULT_SSH_PORT`]
/// when no such rule exists.
pub fn ssh_host_port(ports: &IndexSet<String>) -> u16 {
    for entry in ports {
        if let Some((host, container)) = split_entry(entry) {
            if container == "22" {
                if let Ok(port) = host.parse::<u16>() {
                    return port;
                }
            }
        }
    }
    DEFAULT_SSH_PORT
}
