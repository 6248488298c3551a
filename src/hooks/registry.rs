//! Hook lookup by name.

use std::collections::HashMap;
use std::sync::Arc;

use crate::hooks::{Hook, HookPipeline};

/// Named hooks available to rules.
#[derive(Clone, Default)]
pub struct HookRegistry {
    hooks: HashMap<String, Arc<dyn Hook>>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a hook under its own name, returning any hook it replaced.
    pub fn register(&mut self, hook: Arc<dyn Hook>) -> Option<Arc<dyn Hook>> {
        let name = hook.name().to_string();
        if self.hooks.contains_key(&name) {
            tracing::warn!(hook = %name, "Replacing registered hook");
        }
        self.hooks.insert(name, hook)
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Hook>> {
        self.hooks.get(name).cloned()
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    /// Resolve names into a pipeline. Returns the first unknown name.
    pub fn resolve(&self, names: &[String]) -> Result<HookPipeline, String> {
        names
            .iter()
            .map(|name| self.get(name).ok_or_else(|| name.clone()))
            .collect::<Result<Vec<_>, _>>()
            .map(HookPipeline::new)
    }
}

impl std::fmt::Debug for HookRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.hooks.keys()).finish()
    }
}
