use crate::traits::{Tool, ToolResult, ToolSpec};
use anyhow::{Result, bail};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Name-keyed set of tools, populated at startup and looked up on dispatch.
pub struct ToolRegistry {
    tools: RwLock<HashMap<String, Arc<dyn Tool>>>,
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: RwLock::new(HashMap::new()),
        }
    }

    pub fn register(&self, tool: Arc<dyn Tool>) -> Result<()> {
        let mut tools = self.tools.write().unwrap_or_else(|e| e.into_inner());
        let name = tool.name().to_string();
        if tools.contains_key(&name) {
            bail!("Tool '{}' is already registered", name);
        }
        tracing::debug!(tool = %name, "Registered tool");
        tools.insert(name, tool);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        let tools = self.tools.read().unwrap_or_else(|e| e.into_inner());
        tools.get(name).cloned()
    }

    pub fn names(&self) -> Vec<String> {
        let tools = self.tools.read().unwrap_or_else(|e| e.into_inner());
        let mut names: Vec<String> = tools.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn get_specs(&self) -> Vec<ToolSpec> {
        let tools = self.tools.read().unwrap_or_else(|e| e.into_inner());
        let mut specs: Vec<ToolSpec> = tools.values().map(|t| t.spec()).collect();
        specs.sort_by(|a, b| a.name.cmp(&b.name));
        specs
    }

    pub async fn execute(&self, name: &str, args: serde_json::Value) -> ToolResult {
        let Some(tool) = self.get(name) else {
            return ToolResult::error(format!("Tool '{}' not found", name));
        };

        match tool.execute(args).await {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!(tool = name, "Tool execution failed: {}", e);
                ToolResult::error(format!("Execution failed: {}", e))
            }
        }
    }
}
