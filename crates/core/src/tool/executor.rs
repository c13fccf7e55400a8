use std::collections::HashMap;
use std::pin::Pin;

use search_agent_model::{ModelTool, ToolCallRequest};

use crate::tool::{ToolObject, ToolResult};

/// An executor that handles tool call requests from the model.
pub struct Executor {
    tools: HashMap<String, Box<dyn ToolObject>>,
}

impl Executor {
    pub fn with_tools(tools: Vec<Box<dyn ToolObject>>) -> Self {
        let mut tool_map = HashMap::with_capacity(tools.len());
        for tool in tools {
            let name = tool.name();
            if tool_map.contains_key(name) {
                warn!("tool registered twice, keeping the last one: {name}");
            }
            tool_map.insert(name.to_owned(), tool);
        }
        let tools = tool_map;
        Self { tools }
    }

    /// Returns the tool definitions, ordered by name.
    pub fn definitions(&self) -> Vec<ModelTool> {
        let mut definitions: Vec<_> =
            self.tools.values().map(|tool| tool.definition()).collect();
        definitions.sort_by(|a, b| a.name.cmp(&b.name));
        definitions
    }

    /// Starts executing the requested tool.
    ///
    /// Returns `None` if no tool with the requested name is registered.
    pub fn execute(
        &self,
        request: &ToolCallRequest,
    ) -> Option<Pin<Box<dyn Future<Output = ToolResult> + Send>>> {
        let Some(tool) = self.tools.get(&request.name) else {
            warn!("tool not found: {}", request.name);
            return None;
        };
        trace!(
            "spawning a tool ({}) with args: {:?}",
            request.id, request.arguments
        );
        Some(tool.execute(request.arguments.clone()))
    }
}
