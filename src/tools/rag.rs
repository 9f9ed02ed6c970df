//! RAG tools, forwarded to the knowledge service

use crate::context::ServerContext;
use crate::error::{BridgeError, Result};
use crate::mcp::registry::{parse_args, ToolDefinition, ToolModule};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use super::forwarded;

pub struct RagTools;

fn five() -> usize {
    5
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct NoArgs {}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RagQueryArgs {
    query: String,
    #[serde(default)]
    source: Option<String>,
    #[serde(default = "five")]
    match_count: usize,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CodeExampleArgs {
    query: String,
    #[serde(default)]
    source_id: Option<String>,
    #[serde(default = "five")]
    match_count: usize,
}

#[async_trait]
impl ToolModule for RagTools {
    fn name(&self) -> &'static str {
        "rag"
    }

    fn tools(&self) -> Vec<ToolDefinition> {
        vec![
            ToolDefinition::new(
                "get_available_sources",
                "List the sources available for RAG queries.",
                json!({ "type": "object", "properties": {} }),
            ),
            ToolDefinition::new(
                "perform_rag_query",
                "Search the knowledge base for content relevant to a query.",
                json!({
                    "type": "object",
                    "properties": {
                        "query": {"type": "string", "description": "Search query"},
                        "source": {"type": "string", "description": "Optional source domain filter"},
                        "match_count": {"type": "integer", "default": 5}
                    },
                    "required": ["query"]
                }),
            ),
            ToolDefinition::new(
                "search_code_examples",
                "Search for code examples relevant to a query.",
                json!({
                    "type": "object",
                    "properties": {
                        "query": {"type": "string", "description": "Search query"},
                        "source_id": {"type": "string", "description": "Optional source id filter"},
                        "match_count": {"type": "integer", "default": 5}
                    },
                    "required": ["query"]
                }),
            ),
        ]
    }

    async fn call(&self, tool: &str, ctx: &ServerContext, args: Value) -> Result<Value> {
        match tool {
            "get_available_sources" => {
                let _: NoArgs = parse_args(tool, args)?;
                Ok(forwarded(tool, ctx.knowledge.list_sources().await))
            }
            "perform_rag_query" => {
                let args: RagQueryArgs = parse_args(tool, args)?;
                require_query(&args.query)?;
                Ok(forwarded(
                    tool,
                    ctx.knowledge
                        .rag_query(args.query, args.source, args.match_count)
                        .await,
                ))
            }
            "search_code_examples" => {
                let args: CodeExampleArgs = parse_args(tool, args)?;
                require_query(&args.query)?;
                Ok(forwarded(
                    tool,
                    ctx.knowledge
                        .search_code_examples(args.query, args.source_id, args.match_count)
                        .await,
                ))
            }
            _ => Err(BridgeError::ToolNotFound(tool.to_string())),
        }
    }
}

fn require_query(query: &str) -> Result<()> {
    if query.trim().is_empty() {
        return Err(BridgeError::InvalidParams("query must not be empty".to_string()));
    }
    Ok(())
}
