//! Registry of compiled-in automation scripts.

use std::sync::Arc;

use crate::navigator::NavigatorTree;
use crate::script::Script;

/// Scripts addressable by slash-separated path.
#[derive(Default)]
pub struct ScriptRegistry {
    scripts: Vec<Arc<dyn Script>>,
}

impl ScriptRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a script. A duplicate path replaces the earlier entry in
    /// place with a warning.
    pub fn register(&mut self, script: Arc<dyn Script>) {
        if let Some(slot) = self
            .scripts
            .iter_mut()
            .find(|s| s.path() == script.path())
        {
            log::warn!("replacing script registered at '{}'", script.path());
            *slot = script;
        } else {
            self.scripts.push(script);
        }
    }

    pub fn get(&self, path: &str) -> Option<Arc<dyn Script>> {
        self.scripts.iter().find(|s| s.path() == path).cloned()
    }

    /// Registered paths, sorted.
    pub fn paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self.scripts.iter().map(|s| s.path().to_string()).collect();
        paths.sort();
        paths
    }

    /// Registration-ordered listing for `footman list`.
    pub fn scripts(&self) -> &[Arc<dyn Script>] {
        &self.scripts
    }

    /// Navigation tree over every registered path.
    pub fn navigator(&self) -> NavigatorTree {
        NavigatorTree::from_paths(self.paths())
    }

    pub fn len(&self) -> usize {
        self.scripts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scripts.is_empty()
    }
}
