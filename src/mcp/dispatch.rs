//! MCP method dispatch
//!
//! Routes `initialize`, `ping`, `tools/list` and `tools/call` to the tool
//! registry. Used by the SSE and stdio transports, and by the HTTP bridge
//! for those method names.

use super::protocol::{JsonRpcError, JsonRpcRequest, JsonRpcResponse, JSONRPC_VERSION};
use super::registry::ToolRegistry;
use crate::context::ServerContext;
use crate::error::{BridgeError, Result};
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tokio::task::JoinError;
use tracing::{debug, warn};

/// MCP protocol revision announced in `initialize`
pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// Server name announced to clients
pub const SERVER_NAME: &str = "learnbridge";

/// Protocol methods handled here rather than as tools
pub const PROTOCOL_METHODS: [&str; 4] = ["initialize", "ping", "tools/list", "tools/call"];

/// Registry plus context, cheap to clone into handlers and tasks
#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<ToolRegistry>,
    ctx: Arc<ServerContext>,
}

impl Dispatcher {
    pub fn new(registry: Arc<ToolRegistry>, ctx: Arc<ServerContext>) -> Self {
        Self { registry, ctx }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub fn context(&self) -> &Arc<ServerContext> {
        &self.ctx
    }

    pub fn is_protocol_method(method: &str) -> bool {
        PROTOCOL_METHODS.contains(&method)
    }

    /// Parse and dispatch one raw message; `None` when no reply is due
    pub async fn handle_message(&self, raw: &str) -> Option<JsonRpcResponse> {
        match serde_json::from_str::<JsonRpcRequest>(raw) {
            Ok(request) => self.dispatch(request).await,
            Err(e) => Some(JsonRpcResponse::error(
                None,
                JsonRpcError::parse_error(format!("Invalid JSON: {}", e)),
            )),
        }
    }

    /// Dispatch a request. Notifications get no reply.
    pub async fn dispatch(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        if request.is_notification() {
            debug!("Received notification: {}", request.method);
            return None;
        }

        if request.jsonrpc != JSONRPC_VERSION {
            return Some(JsonRpcResponse::error(
                request.id,
                JsonRpcError::invalid_request("Must be JSON-RPC 2.0"),
            ));
        }

        Some(
            self.dispatch_method(request.id, &request.method, request.params)
                .await,
        )
    }

    /// Run a method and always produce a response
    pub async fn dispatch_method(
        &self,
        id: Option<Value>,
        method: &str,
        params: Value,
    ) -> JsonRpcResponse {
        match method {
            "initialize" => {
                debug!("Handling initialize");
                JsonRpcResponse::success(id, self.initialize_result())
            }
            "ping" => JsonRpcResponse::success(id, json!({})),
            "tools/list" => {
                debug!("Handling tools/list");
                JsonRpcResponse::success(id, json!({ "tools": self.registry.definitions() }))
            }
            "tools/call" => self.handle_tools_call(id, params).await,
            _ => JsonRpcResponse::error(id, JsonRpcError::method_not_found(method)),
        }
    }

    fn initialize_result(&self) -> Value {
        json!({
            "protocolVersion": PROTOCOL_VERSION,
            "serverInfo": {
                "name": SERVER_NAME,
                "version": env!("CARGO_PKG_VERSION")
            },
            "capabilities": {
                "tools": {}
            }
        })
    }

    async fn handle_tools_call(&self, id: Option<Value>, params: Value) -> JsonRpcResponse {
        debug!("Handling tools/call");

        let Some(params) = params.as_object() else {
            return JsonRpcResponse::error(
                id,
                JsonRpcError::invalid_params("params must be an object"),
            );
        };

        let Some(tool) = params.get("name").and_then(Value::as_str) else {
            return JsonRpcResponse::error(id, JsonRpcError::invalid_params("missing 'name' field"));
        };

        let arguments = params
            .get("arguments")
            .cloned()
            .unwrap_or_else(|| Value::Object(Map::new()));

        match self.run_tool(tool, arguments).await {
            Ok(Ok(result)) => {
                let text = serde_json::to_string_pretty(&result)
                    .unwrap_or_else(|_| result.to_string());
                JsonRpcResponse::success(
                    id,
                    json!({
                        "content": [
                            { "type": "text", "text": text }
                        ]
                    }),
                )
            }
            Ok(Err(e)) => JsonRpcResponse::error(id, tool_error(tool, &e)),
            Err(join_error) => JsonRpcResponse::error(
                id,
                JsonRpcError::internal_error(format!("Internal error: {}", join_error)),
            ),
        }
    }

    /// Run a tool on its own task so a panicking handler cannot take the
    /// transport down with it.
    pub async fn run_tool(
        &self,
        tool: &str,
        arguments: Value,
    ) -> std::result::Result<Result<Value>, JoinError> {
        let registry = self.registry.clone();
        let ctx = self.ctx.clone();
        let name = tool.to_string();
        let outcome = tokio::spawn(async move { registry.invoke(&name, &ctx, arguments).await }).await;
        if let Err(e) = &outcome {
            warn!("Tool {} aborted: {}", tool, e);
        }
        outcome
    }
}

/// JSON-RPC error for a failed tool call
pub fn tool_error(tool: &str, error: &BridgeError) -> JsonRpcError {
    match error {
        BridgeError::InvalidParams(message) => {
            JsonRpcError::invalid_params(format!("Invalid params for {}: {}", tool, message))
        }
        BridgeError::ToolNotFound(name) => JsonRpcError::method_not_found(name),
        other => {
            warn!("Tool {} execution error: {}", tool, other);
            JsonRpcError::application_error(
                other.json_rpc_code(),
                format!("Tool execution failed: {}", other),
            )
            .with_data(json!({ "method": tool, "error_type": other.kind() }))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BridgeConfig;
    use crate::mcp::registry::{ToolDefinition, ToolModule};
    use crate::services::{MockKnowledgeService, MockProjectService};
    use async_trait::async_trait;

    struct StubTools;

    #[async_trait]
    impl ToolModule for StubTools {
        fn name(&self) -> &'static str {
            "stub"
        }

        fn tools(&self) -> Vec<ToolDefinition> {
            vec![
                ToolDefinition::new("ok", "Returns its arguments", json!({"type": "object"})),
                ToolDefinition::new("fail", "Always fails", json!({"type": "object"})),
                ToolDefinition::new("bad_args", "Rejects arguments", json!({"type": "object"})),
                ToolDefinition::new("explode", "Panics", json!({"type": "object"})),
            ]
        }

        async fn call(&self, tool: &str, _ctx: &ServerContext, args: Value) -> Result<Value> {
            match tool {
                "ok" => Ok(args),
                "fail" => Err(BridgeError::Upstream {
                    status: 502,
                    body: "bad gateway".into(),
                }),
                "bad_args" => Err(BridgeError::InvalidParams("missing field `query`".into())),
                _ => panic!("handler bug"),
            }
        }
    }

    fn dispatcher() -> Dispatcher {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(StubTools)).unwrap();
        let ctx = ServerContext::new(
            BridgeConfig::default(),
            Arc::new(MockKnowledgeService::new()),
            Arc::new(MockProjectService::new()),
        );
        Dispatcher::new(Arc::new(registry), Arc::new(ctx))
    }

    fn call(name: &str, arguments: Value) -> String {
        json!({
            "jsonrpc": "2.0",
            "id": 7,
            "method": "tools/call",
            "params": {"name": name, "arguments": arguments}
        })
        .to_string()
    }

    #[tokio::test]
    async fn test_initialize_and_list() {
        let d = dispatcher();
        let init = d
            .handle_message(r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{}}"#)
            .await
            .unwrap();
        let result = init.result.unwrap();
        assert_eq!(result["protocolVersion"], PROTOCOL_VERSION);
        assert_eq!(result["serverInfo"]["name"], SERVER_NAME);

        let list = d
            .handle_message(r#"{"jsonrpc":"2.0","id":2,"method":"tools/list"}"#)
            .await
            .unwrap();
        let tools = &list.result.unwrap()["tools"];
        assert_eq!(tools.as_array().unwrap().len(), 4);
        assert!(tools[0].get("inputSchema").is_some());
    }

    #[tokio::test]
    async fn test_notifications_get_no_reply() {
        let d = dispatcher();
        let reply = d
            .handle_message(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#)
            .await;
        assert!(reply.is_none());
    }

    #[tokio::test]
    async fn test_null_id_gets_a_reply() {
        let d = dispatcher();
        let reply = d
            .handle_message(r#"{"jsonrpc":"2.0","id":null,"method":"ping"}"#)
            .await
            .expect("null id is a request, not a notification");
        assert!(!reply.is_error());
        assert_eq!(reply.id, Some(Value::Null));
    }

    #[tokio::test]
    async fn test_tools_call_wraps_result_as_text() {
        let d = dispatcher();
        let reply = d.handle_message(&call("ok", json!({"a": 1}))).await.unwrap();
        let content = &reply.result.unwrap()["content"][0];
        assert_eq!(content["type"], "text");
        let inner: Value = serde_json::from_str(content["text"].as_str().unwrap()).unwrap();
        assert_eq!(inner, json!({"a": 1}));
    }

    #[tokio::test]
    async fn test_tool_errors_map_to_codes() {
        let d = dispatcher();

        let failed = d.handle_message(&call("fail", json!({}))).await.unwrap();
        let error = failed.error.unwrap();
        assert_eq!(error.code, -32000);
        assert!(error.message.starts_with("Tool execution failed: "));
        assert_eq!(error.data.unwrap()["error_type"], "Upstream");

        let invalid = d.handle_message(&call("bad_args", json!({}))).await.unwrap();
        assert_eq!(invalid.error.unwrap().code, -32602);

        let missing = d.handle_message(&call("nope", json!({}))).await.unwrap();
        assert_eq!(missing.error.unwrap().code, -32601);

        let panicked = d.handle_message(&call("explode", json!({}))).await.unwrap();
        assert_eq!(panicked.error.unwrap().code, -32603);
    }

    #[tokio::test]
    async fn test_protocol_errors() {
        let d = dispatcher();

        let parse = d.handle_message("{not json").await.unwrap();
        assert_eq!(parse.error.unwrap().code, -32700);

        let version = d
            .handle_message(r#"{"jsonrpc":"1.0","id":1,"method":"ping"}"#)
            .await
            .unwrap();
        assert_eq!(version.error.unwrap().code, -32600);

        let unknown = d
            .handle_message(r#"{"jsonrpc":"2.0","id":1,"method":"resources/list"}"#)
            .await
            .unwrap();
        assert_eq!(unknown.error.unwrap().code, -32601);

        let no_name = d
            .handle_message(r#"{"jsonrpc":"2.0","id":1,"method":"tools/call","params":{}}"#)
            .await
            .unwrap();
        assert_eq!(no_name.error.unwrap().code, -32602);
    }
}
