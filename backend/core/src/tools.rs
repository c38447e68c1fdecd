use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::error::TurnstileError;
use crate::traits::Tool;

/// Name → tool lookup shared by the executor.
#[derive(Default, Clone)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Register a tool, replacing any previous tool with the same name.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        debug!(tool = %tool.name(), "Registering tool");
        self.tools.insert(tool.name().to_string(), tool);
    }

    pub fn resolve(&self, name: &str) -> Result<Arc<dyn Tool>, TurnstileError> {
        self.tools
            .get(name)
            .cloned()
            .ok_or_else(|| TurnstileError::ToolNotFound(name.to_string()))
    }

    /// Registered tool names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}
