//! Recognized runtime failure-text signatures
//!
//! The wrapped tool reports failures as free text, so classification is
//! substring matching against observed wordings, enumerated here in one
//! place, with tests pinned to the exact messages seen in the wild.
//! Upgrading the wrapped runtime tool may require re-pinning these.

/// A create failure that means the name is already taken, either by a live
/// container or by an untracked zombie record.
pub fn indicates_name_collision(message: &str) -> bool {
    message.to_ascii_lowercase().contains("exists")
}

/// A removal failure that means the backing record is already gone: the goal
/// ("this name is free") is met, so the removal counts as successful.
pub fn indicates_missing_record(message: &str) -> bool {
    let lower = message.to_ascii_lowercase();
    lower.contains("no such file or directory")
        || lower.contains("does not exist")
        || lower.contains("not found")
}

/// A failure that means the subcommand spelling itself was not understood,
/// so an alternate spelling should be tried.
pub fn indicates_unknown_subcommand(message: &str) -> bool {
    let lower = message.to_ascii_lowercase();
    lower.contains("unknown command")
        || lower.contains("unrecognized subcommand")
        || lower.contains("unexpected argument")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_collision_wordings() {
        assert!(indicates_name_collision(
            "Error: container with name \"acm-demo\" already exists"
        ));
        assert!(indicates_name_collision("error: \"acm-demo\" exists"));
        assert!(!indicates_name_collision("error: image not present locally"));
    }

    #[test]
    fn test_missing_record_wordings() {
        assert!(indicates_missing_record(
            "Error: open /var/lib/container/acm-demo/state.json: No such file or directory"
        ));
        assert!(indicates_missing_record("Error: container \"acm-demo\" does not exist"));
        assert!(indicates_missing_record("Error: container acm-demo not found"));
        assert!(!indicates_missing_record("error: permission denied"));
    }

    #[test]
    fn test_missing_record_is_not_a_collision() {
        // "does not exist" must not read as a name collision
        let message = "Error: container \"acm-demo\" does not exist";
        assert!(!indicates_name_collision(message));
        assert!(indicates_missing_record(message));
    }

    #[test]
    fn test_unknown_subcommand_wordings() {
        assert!(indicates_unknown_subcommand("Error: unknown command \"rm\" for \"container\""));
        assert!(indicates_unknown_subcommand(
            "error: unrecognized subcommand 'list'"
        ));
        assert!(!indicates_unknown_subcommand("Error: container not running"));
    }
}
