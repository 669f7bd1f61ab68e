use std::collections::HashMap;
use std::sync::Arc;

use tracing::{info, warn};

use nova_core::traits::{FanLetterStore, ScheduleStore, Tool};
use nova_core::types::{ToolContext, ToolDefinition, ToolOutcome};

/// Name-keyed table of the tools the router may select.
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Add a tool under its own name; a repeated name replaces the entry.
    pub fn register(&mut self, tool: impl Tool) {
        let name = tool.name().to_string();
        self.tools.insert(name, Arc::new(tool));
    }

    /// Look up a tool by exact name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// List all registered tool names.
    pub fn list(&self) -> Vec<&str> {
        self.tools.keys().map(|s| s.as_str()).collect()
    }

    /// Tool definitions for building the router's tool catalog.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools
            .values()
            .map(|t| ToolDefinition {
                name: t.name().to_string(),
                description: t.description().to_string(),
                input_schema: t.input_schema(),
            })
            .collect()
    }

    /// Run a tool by name. Dispatch itself never fails: unknown names and
    /// execution errors both come back as failure outcomes, so a bad tool
    /// call degrades the turn instead of aborting it.
    pub async fn dispatch(
        &self,
        name: &str,
        input: serde_json::Value,
        ctx: ToolContext,
    ) -> ToolOutcome {
        let tool = match self.get(name) {
            Some(t) => t,
            None => {
                warn!(tool = %name, "Unknown tool requested");
                return ToolOutcome::failure(format!("unknown tool: {}", name));
            }
        };

        info!(tool = %name, "Running tool");
        match tool.execute(input, ctx).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(tool = %name, error = %e, "Tool execution failed");
                ToolOutcome::failure(e.to_string())
            }
        }
    }

    /// Registry preloaded with the four built-in tools.
    pub fn with_builtins(
        schedules: Arc<dyn ScheduleStore>,
        letters: Arc<dyn FanLetterStore>,
    ) -> Self {
        let mut registry = Self::new();
        registry.register(crate::builtin::schedule::GetScheduleTool::new(schedules));
        registry.register(crate::builtin::fan_letter::SendFanLetterTool::new(letters));
        registry.register(crate::builtin::song::RecommendSongTool);
        registry.register(crate::builtin::weather::GetWeatherTool);
        registry
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}
