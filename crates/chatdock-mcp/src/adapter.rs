//! Adapter between a ToolRegistry and the MCP protocol

use serde_json::Value;
use tracing::{debug, info, warn};

use chatdock_core::tools::{ToolOutput, ToolRegistry};

use crate::protocol::*;

/// Answers MCP requests from the tools of one registry
pub struct McpToolAdapter {
    registry: ToolRegistry,
    server_name: String,
    server_version: String,
}

impl McpToolAdapter {
    /// Create a new adapter owning a ToolRegistry
    pub fn new(registry: ToolRegistry) -> Self {
        Self {
            registry,
            server_name: "chatdock".to_string(),
            server_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// Set the name and version reported in the initialize handshake
    pub fn with_server_info(mut self, name: impl Into<String>, version: impl Into<String>) -> Self {
        self.server_name = name.into();
        self.server_version = version.into();
        self
    }

    /// List all tools as MCP tool definitions
    pub fn list_tools(&self) -> Vec<McpTool> {
        self.registry
            .list_tools()
            .into_iter()
            .map(|t| McpTool {
                name: t.name,
                description: t.description,
                input_schema: t.input_schema,
            })
            .collect()
    }

    /// Execute a tool and return the MCP-formatted result
    ///
    /// `Err` carries the JSON-RPC error for calls that never reached the tool
    /// body or were rejected by it.
    pub async fn call_tool(&self, name: &str, arguments: Value) -> Result<ToolCallResult, JsonRpcError> {
        if self.registry.get(name).is_none() {
            return Err(JsonRpcError {
                code: INVALID_PARAMS,
                message: format!("Tool {} not found", name),
            });
        }

        debug!("MCP calling tool: {}", name);
        match self.registry.execute(name, arguments).await {
            Ok(output) => Ok(tool_call_result(output)),
            Err(e) => Err(JsonRpcError {
                code: INVALID_PARAMS,
                message: format!("Invalid arguments for tool {}: {}", name, e),
            }),
        }
    }

    /// Handle a single JSON-RPC message. Notifications produce no response.
    pub async fn handle_request(
        &self,
        request: JsonRpcRequest,
    ) -> Result<Option<JsonRpcResponse>, serde_json::Error> {
        let id = request.id.clone().unwrap_or(Value::Null);

        let response = match request.method.as_str() {
            "initialize" => {
                let requested = request
                    .params
                    .get("protocolVersion")
                    .and_then(|v| v.as_str());
                let result = InitializeResult {
                    protocol_version: negotiate_protocol_version(requested).to_string(),
                    capabilities: ServerCapabilities {
                        tools: ToolsCapability { list_changed: false },
                    },
                    server_info: ServerInfo {
                        name: self.server_name.clone(),
                        version: self.server_version.clone(),
                    },
                };
                info!("MCP initialize (client asked for {:?})", requested);
                JsonRpcResponse::success(id, serde_json::to_value(result)?)
            }

            method if method.starts_with("notifications/") => {
                debug!("MCP notification: {}", method);
                return Ok(None);
            }

            "ping" => JsonRpcResponse::success(id, serde_json::json!({})),

            "tools/list" => {
                let tools = self.list_tools();
                debug!("MCP tools/list: returning {} tools", tools.len());
                JsonRpcResponse::success(id, serde_json::json!({ "tools": tools }))
            }

            "tools/call" => {
                let name = request
                    .params
                    .get("name")
                    .and_then(|v| v.as_str())
                    .unwrap_or("");
                let arguments = request
                    .params
                    .get("arguments")
                    .cloned()
                    .unwrap_or(serde_json::json!({}));

                if name.is_empty() {
                    JsonRpcResponse::error(id, INVALID_PARAMS, "Missing 'name' parameter".to_string())
                } else {
                    info!("MCP tools/call: {}", name);
                    match self.call_tool(name, arguments).await {
                        Ok(result) => JsonRpcResponse::success(id, serde_json::to_value(result)?),
                        Err(e) => JsonRpcResponse::error(id, e.code, e.message),
                    }
                }
            }

            _ => {
                warn!("MCP unknown method: {}", request.method);
                if request.is_notification() {
                    return Ok(None);
                }
                JsonRpcResponse::error(
                    id,
                    METHOD_NOT_FOUND,
                    format!("Method not found: {}", request.method),
                )
            }
        };

        if request.is_notification() {
            return Ok(None);
        }
        Ok(Some(response))
    }
}

fn tool_call_result(output: ToolOutput) -> ToolCallResult {
    ToolCallResult {
        content: vec![ToolContent::text(output.text)],
        is_error: output.is_error,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use anyhow::{Result, anyhow};
    use async_trait::async_trait;
    use chatdock_core::tools::{ToolHandler, json_schema};

    struct EchoTool;

    #[async_trait]
    impl ToolHandler for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }

        fn description(&self) -> &str {
            "Echo the input text"
        }

        fn input_schema(&self) -> Value {
            json_schema(serde_json::json!({"text": {"type": "string"}}), vec!["text"])
        }

        async fn execute(&self, input: Value) -> Result<ToolOutput> {
            match input.get("text").and_then(|v| v.as_str()) {
                Some("boom") => Ok(ToolOutput::error("echo failed")),
                Some(text) => Ok(ToolOutput::text(text)),
                None => Err(anyhow!("Missing 'text' parameter")),
            }
        }
    }

    fn make_adapter() -> McpToolAdapter {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool));
        McpToolAdapter::new(registry)
    }

    fn request(id: Option<Value>, method: &str, params: Value) -> JsonRpcRequest {
        JsonRpcRequest {
            jsonrpc: "2.0".to_string(),
            id,
            method: method.to_string(),
            params,
        }
    }

    async fn call(adapter: &McpToolAdapter, req: JsonRpcRequest) -> Value {
        let resp = adapter.handle_request(req).await.unwrap().unwrap();
        serde_json::to_value(resp).unwrap()
    }

    #[tokio::test]
    async fn test_handle_initialize() {
        let adapter = make_adapter().with_server_info("test-server", "9.9.9");
        let resp = call(
            &adapter,
            request(
                Some(serde_json::json!(1)),
                "initialize",
                serde_json::json!({"protocolVersion": "2025-03-26"}),
            ),
        )
        .await;
        assert_eq!(resp["result"]["protocolVersion"], "2025-03-26");
        assert_eq!(resp["result"]["serverInfo"]["name"], "test-server");
        assert_eq!(resp["result"]["serverInfo"]["version"], "9.9.9");
    }

    #[tokio::test]
    async fn test_handle_tools_list() {
        let adapter = make_adapter();
        let resp = call(&adapter, request(Some(serde_json::json!(2)), "tools/list", Value::Null)).await;
        let tools = resp["result"]["tools"].as_array().unwrap();
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0]["name"], "echo");
        assert_eq!(tools[0]["inputSchema"]["required"][0], "text");
    }

    #[tokio::test]
    async fn test_handle_tools_call() {
        let adapter = make_adapter();
        let resp = call(
            &adapter,
            request(
                Some(serde_json::json!(3)),
                "tools/call",
                serde_json::json!({"name": "echo", "arguments": {"text": "hi"}}),
            ),
        )
        .await;
        assert_eq!(resp["id"], 3);
        assert_eq!(resp["result"]["content"][0]["text"], "hi");
        assert_eq!(resp["result"]["isError"], false);
    }

    #[tokio::test]
    async fn test_handle_tools_call_reported_failure() {
        let adapter = make_adapter();
        let resp = call(
            &adapter,
            request(
                Some(serde_json::json!(4)),
                "tools/call",
                serde_json::json!({"name": "echo", "arguments": {"text": "boom"}}),
            ),
        )
        .await;
        assert!(resp.get("error").is_none());
        assert_eq!(resp["result"]["isError"], true);
        assert_eq!(resp["result"]["content"][0]["text"], "echo failed");
    }

    #[tokio::test]
    async fn test_handle_tools_call_missing_name() {
        let adapter = make_adapter();
        let resp = call(
            &adapter,
            request(Some(serde_json::json!(5)), "tools/call", serde_json::json!({})),
        )
        .await;
        assert_eq!(resp["error"]["code"], INVALID_PARAMS);
    }

    #[tokio::test]
    async fn test_handle_tools_call_unknown_tool() {
        let adapter = make_adapter();
        let resp = call(
            &adapter,
            request(
                Some(serde_json::json!(6)),
                "tools/call",
                serde_json::json!({"name": "nope", "arguments": {}}),
            ),
        )
        .await;
        assert_eq!(resp["error"]["code"], INVALID_PARAMS);
        assert_eq!(resp["error"]["message"], "Tool nope not found");
    }

    #[tokio::test]
    async fn test_handle_tools_call_invalid_arguments() {
        let adapter = make_adapter();
        let resp = call(
            &adapter,
            request(
                Some(serde_json::json!(7)),
                "tools/call",
                serde_json::json!({"name": "echo", "arguments": {}}),
            ),
        )
        .await;
        assert_eq!(resp["error"]["code"], INVALID_PARAMS);
        assert!(
            resp["error"]["message"]
                .as_str()
                .unwrap()
                .starts_with("Invalid arguments for tool echo")
        );
    }

    #[tokio::test]
    async fn test_handle_ping() {
        let adapter = make_adapter();
        let resp = call(&adapter, request(Some(serde_json::json!(8)), "ping", Value::Null)).await;
        assert_eq!(resp["result"], serde_json::json!({}));
    }

    #[tokio::test]
    async fn test_handle_unknown_method() {
        let adapter = make_adapter();
        let resp = call(
            &adapter,
            request(Some(serde_json::json!(9)), "resources/list", Value::Null),
        )
        .await;
        assert_eq!(resp["error"]["code"], METHOD_NOT_FOUND);
    }

    #[tokio::test]
    async fn test_notifications_get_no_response() {
        let adapter = make_adapter();
        for method in ["notifications/initialized", "notifications/cancelled", "unknown/thing"] {
            let resp = adapter
                .handle_request(request(None, method, Value::Null))
                .await
                .unwrap();
            assert!(resp.is_none(), "{} should not be answered", method);
        }
    }
}
