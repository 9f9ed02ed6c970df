//! Server health and session tools

use crate::context::ServerContext;
use crate::error::{BridgeError, Result};
use crate::mcp::registry::{parse_args, ToolDefinition, ToolModule};
use async_trait::async_trait;
use chrono::Local;
use serde::Deserialize;
use serde_json::{json, Value};

/// Always-registered server tools
pub struct SystemTools;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct NoArgs {}

#[async_trait]
impl ToolModule for SystemTools {
    fn name(&self) -> &'static str {
        "system"
    }

    fn tools(&self) -> Vec<ToolDefinition> {
        let no_args = json!({ "type": "object", "properties": {} });
        vec![
            ToolDefinition::new(
                "health_check",
                "Perform a health check on the MCP server and its dependencies.",
                no_args.clone(),
            ),
            ToolDefinition::new(
                "session_info",
                "Get information about the current session and all active sessions.",
                no_args,
            ),
        ]
    }

    async fn call(&self, tool: &str, ctx: &ServerContext, args: Value) -> Result<Value> {
        let _: NoArgs = parse_args(tool, args)?;
        match tool {
            "health_check" => Ok(health_check(ctx).await),
            "session_info" => Ok(session_info(ctx).await),
            _ => Err(BridgeError::ToolNotFound(tool.to_string())),
        }
    }
}

async fn health_check(ctx: &ServerContext) -> Value {
    let health = ctx.perform_health_checks().await;
    json!({
        "success": true,
        "health": health,
        "uptime_seconds": ctx.uptime().as_secs_f64(),
        "timestamp": Local::now().to_rfc3339(),
    })
}

async fn session_info(ctx: &ServerContext) -> Value {
    json!({
        "success": true,
        "session_management": {
            "active_sessions": ctx.sessions.active_count().await,
            "session_timeout": ctx.sessions.timeout().as_secs(),
            "server_uptime_seconds": ctx.uptime().as_secs_f64(),
            "sessions": ctx.sessions.summaries().await,
        },
        "timestamp": Local::now().to_rfc3339(),
    })
}
