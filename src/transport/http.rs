//! HTTP JSON-RPC bridge
//!
//! `POST /mcp` accepts a single JSON-RPC 2.0 request whose `method` names a
//! tool directly. Every JSON-RPC outcome, including errors, is returned
//! with HTTP 200.

use crate::error::BridgeError;
use crate::mcp::dispatch::{tool_error, Dispatcher, SERVER_NAME};
use crate::mcp::protocol::{JsonRpcError, JsonRpcResponse, JSONRPC_VERSION};
use axum::{body::Bytes, extract::State, Json};
use serde::Serialize;
use serde_json::{json, Map, Value};
use tracing::{debug, info, warn};

/// `POST /mcp`
pub async fn mcp_post_handler(
    State(dispatcher): State<Dispatcher>,
    body: Bytes,
) -> Json<JsonRpcResponse> {
    Json(handle_bridge_request(&dispatcher, &body).await)
}

/// Validate and execute one bridge request
pub async fn handle_bridge_request(dispatcher: &Dispatcher, body: &[u8]) -> JsonRpcResponse {
    let parsed: Value = match serde_json::from_slice(body) {
        Ok(value) => value,
        Err(_) => {
            return JsonRpcResponse::error(None, JsonRpcError::parse_error("Parse error: Invalid JSON"))
        }
    };

    let Value::Object(request) = parsed else {
        return JsonRpcResponse::error(
            None,
            JsonRpcError::invalid_request("Request must be JSON object"),
        );
    };
    info!("HTTP MCP request: {}", serde_json::Value::Object(request.clone()));

    let id = request.get("id").cloned();

    if request.get("jsonrpc").and_then(Value::as_str) != Some(JSONRPC_VERSION) {
        return JsonRpcResponse::error(id, JsonRpcError::invalid_request("Must be JSON-RPC 2.0"));
    }

    let method = match request.get("method").and_then(Value::as_str) {
        Some(method) if !method.is_empty() => method.to_string(),
        _ => {
            return JsonRpcResponse::error(
                id,
                JsonRpcError::invalid_request("Missing 'method' field"),
            )
        }
    };

    let params = match request.get("params") {
        None | Some(Value::Null) => Value::Object(Map::new()),
        Some(value) => value.clone(),
    };

    if Dispatcher::is_protocol_method(&method) {
        debug!("Routing protocol method {} through dispatch", method);
        return dispatcher.dispatch_method(id, &method, params).await;
    }

    if !dispatcher.registry().contains(&method) {
        return JsonRpcResponse::error(
            id,
            JsonRpcError::method_not_found(&method)
                .with_data(json!({ "available_methods": dispatcher.registry().tool_names() })),
        );
    }

    if !params.is_object() {
        return JsonRpcResponse::error(
            id,
            invalid_params(&method, "params must be an object", &params),
        );
    }

    match dispatcher.run_tool(&method, params.clone()).await {
        Ok(Ok(result)) => JsonRpcResponse::success(id, unwrap_json_string(result)),
        Ok(Err(BridgeError::InvalidParams(message))) => {
            JsonRpcResponse::error(id, invalid_params(&method, &message, &params))
        }
        Ok(Err(e)) => JsonRpcResponse::error(id, tool_error(&method, &e)),
        Err(e) => {
            warn!("HTTP MCP endpoint error: {}", e);
            JsonRpcResponse::error(id, JsonRpcError::internal_error(format!("Internal error: {}", e)))
        }
    }
}

fn invalid_params(method: &str, message: &str, params: &Value) -> JsonRpcError {
    JsonRpcError::invalid_params(format!("Invalid params for {}: {}", method, message))
        .with_data(json!({ "method": method, "params": params }))
}

/// String results that hold JSON are returned as the parsed value
fn unwrap_json_string(result: Value) -> Value {
    match result {
        Value::String(text) => serde_json::from_str(&text).unwrap_or(Value::String(text)),
        other => other,
    }
}

#[derive(Debug, Serialize)]
pub struct ServerInfo {
    pub name: &'static str,
    pub description: &'static str,
    pub version: &'static str,
    pub transports: [&'static str; 2],
    pub endpoints: Endpoints,
    pub tools: Vec<String>,
    pub status: &'static str,
}

#[derive(Debug, Serialize)]
pub struct Endpoints {
    pub http: &'static str,
    pub sse: &'static str,
}

/// `GET /mcp`
pub async fn mcp_info_handler(State(dispatcher): State<Dispatcher>) -> Json<ServerInfo> {
    Json(ServerInfo {
        name: SERVER_NAME,
        description: "Learning capture MCP server with HTTP and SSE transport support",
        version: env!("CARGO_PKG_VERSION"),
        transports: ["http", "sse"],
        endpoints: Endpoints {
            http: "/mcp",
            sse: "/sse",
        },
        tools: dispatcher.registry().tool_names(),
        status: "ready",
    })
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub uptime_seconds: u64,
}

/// `GET /health`
pub async fn health_handler(State(dispatcher): State<Dispatcher>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        uptime_seconds: dispatcher.context().uptime().as_secs(),
    })
}
