//! Applied-configuration cache
//!
//! Remembers the last successfully applied [`ResolvedConfig`] per workspace
//! so follow-up operations (connection instructions, re-running lifecycle
//! hooks) do not have to re-resolve. Owned by the orchestrator instance:
//! process-memory only, cleared on disposal, never persisted.

use crate::resolve::ResolvedConfig;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Default)]
pub struct AppliedStore {
    entries: HashMap<PathBuf, ResolvedConfig>,
}

impl AppliedStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the applied configuration for `workspace`. Only successful
    /// apply/build operations call this.
    pub fn record(&mut self, workspace: &Path, resolved: ResolvedConfig) {
        self.entries.insert(workspace.to_path_buf(), resolved);
    }

    pub fn get(&self, workspace: &Path) -> Option<&ResolvedConfig> {
        self.entries.get(workspace)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
