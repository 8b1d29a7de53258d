//! Tool registry and handler trait

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

pub mod change_title;

/// Public description of a tool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

/// Text result of a tool call, flagged when the action failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOutput {
    pub text: String,
    pub is_error: bool,
}

impl ToolOutput {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_error: false,
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_error: true,
        }
    }
}

/// Individual tool handler
///
/// `execute` returns `Err` only when the call itself is malformed. Failures of
/// the action are reported as an `Ok` output with `is_error` set.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    fn input_schema(&self) -> Value;
    async fn execute(&self, input: Value) -> Result<ToolOutput>;
}

/// Registry of available tools, kept in registration order
pub struct ToolRegistry {
    tools: Vec<Arc<dyn ToolHandler>>,
}

impl ToolRegistry {
    /// Create a new empty tool registry
    pub fn new() -> Self {
        Self { tools: Vec::new() }
    }

    /// Register a tool handler, replacing any tool with the same name
    pub fn register(&mut self, handler: Arc<dyn ToolHandler>) {
        debug!("Registering tool: {}", handler.name());
        match self.tools.iter().position(|t| t.name() == handler.name()) {
            Some(idx) => self.tools[idx] = handler,
            None => self.tools.push(handler),
        }
    }

    /// Get a tool by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn ToolHandler>> {
        self.tools.iter().find(|t| t.name() == name).cloned()
    }

    /// Number of registered tools
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Check if registry is empty
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Names of all registered tools
    pub fn names(&self) -> Vec<String> {
        self.tools.iter().map(|t| t.name().to_string()).collect()
    }

    /// Definitions of all registered tools
    pub fn list_tools(&self) -> Vec<ToolDefinition> {
        self.tools
            .iter()
            .map(|handler| ToolDefinition {
                name: handler.name().to_string(),
                description: handler.description().to_string(),
                input_schema: handler.input_schema(),
            })
            .collect()
    }

    /// Execute a tool by name
    pub async fn execute(&self, tool_name: &str, input: Value) -> Result<ToolOutput> {
        debug!("Executing tool: {} with input: {:?}", tool_name, input);

        let handler = self
            .get(tool_name)
            .ok_or_else(|| anyhow!("Unknown tool: {}", tool_name))?;

        match handler.execute(input).await {
            Ok(output) => {
                if output.is_error {
                    warn!("Tool {} reported failure: {}", tool_name, output.text);
                } else {
                    debug!("Tool {} succeeded", tool_name);
                }
                Ok(output)
            }
            Err(e) => {
                warn!("Tool {} rejected input: {}", tool_name, e);
                Err(e)
            }
        }
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Helper function to create a JSON schema for tool input
pub fn json_schema(properties: Value, required: Vec<&str>) -> Value {
    serde_json::json!({
        "type": "object",
        "properties": properties,
        "required": required,
    })
}
