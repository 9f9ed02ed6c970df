//! Tool registry
//!
//! Tools are grouped into modules. The registry maps each tool name to the
//! module that serves it and is shared by every transport.

use crate::config::ModulesConfig;
use crate::context::ServerContext;
use crate::error::{BridgeError, Result};
use crate::tools::{LearningTools, ProjectTools, RagTools, SystemTools};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Tool schema definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,

    pub description: String,

    /// JSON Schema for the tool's arguments
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

impl ToolDefinition {
    pub fn new(name: &str, description: &str, input_schema: Value) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            input_schema,
        }
    }
}

/// A named group of tools
#[async_trait]
pub trait ToolModule: Send + Sync {
    /// Module name used in logs
    fn name(&self) -> &'static str;

    fn tools(&self) -> Vec<ToolDefinition>;

    /// Run one of this module's tools
    async fn call(&self, tool: &str, ctx: &ServerContext, args: Value) -> Result<Value>;
}

/// Tool name to module lookup
#[derive(Default)]
pub struct ToolRegistry {
    modules: Vec<Arc<dyn ToolModule>>,
    definitions: Vec<ToolDefinition>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a module; tool names must be unique across modules
    pub fn register(&mut self, module: Arc<dyn ToolModule>) -> Result<()> {
        let tools = module.tools();
        if let Some(duplicate) = tools.iter().find(|t| self.index.contains_key(&t.name)) {
            return Err(BridgeError::McpProtocol(format!(
                "Tool {} from module {} is already registered",
                duplicate.name,
                module.name()
            )));
        }

        let slot = self.modules.len();
        for tool in tools {
            self.index.insert(tool.name.clone(), slot);
            self.definitions.push(tool);
        }
        debug!("Registered module {}", module.name());
        self.modules.push(module);
        Ok(())
    }

    pub fn contains(&self, tool: &str) -> bool {
        self.index.contains_key(tool)
    }

    /// Tool names in registration order
    pub fn tool_names(&self) -> Vec<String> {
        self.definitions.iter().map(|d| d.name.clone()).collect()
    }

    pub fn definitions(&self) -> &[ToolDefinition] {
        &self.definitions
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Invoke a tool by name
    pub async fn invoke(&self, tool: &str, ctx: &ServerContext, args: Value) -> Result<Value> {
        let slot = self
            .index
            .get(tool)
            .copied()
            .ok_or_else(|| BridgeError::ToolNotFound(tool.to_string()))?;
        debug!("Executing tool: {}", tool);
        self.modules[slot].call(tool, ctx, args).await
    }
}

/// Build the registry for the enabled modules.
///
/// System tools are always present. At least one of the RAG, learning and
/// project modules must be enabled.
pub fn register_modules(modules: &ModulesConfig) -> Result<ToolRegistry> {
    info!("Registering MCP tool modules...");
    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(SystemTools))?;

    let mut registered = 0;

    if modules.rag {
        registry.register(Arc::new(RagTools))?;
        registered += 1;
        info!("RAG module registered");
    } else {
        info!("RAG module skipped - disabled in configuration");
    }

    if modules.learning {
        registry.register(Arc::new(LearningTools))?;
        registered += 1;
        info!("Learning capture module registered");
    } else {
        info!("Learning capture module skipped - disabled in configuration");
    }

    if modules.projects_enabled {
        registry.register(Arc::new(ProjectTools))?;
        registered += 1;
        info!("Project module registered");
    } else {
        info!("Project module skipped - Projects are disabled");
    }

    info!("Total modules registered: {}", registered);
    if registered == 0 {
        warn!("No modules were successfully registered");
        return Err(BridgeError::Other("No MCP modules available".to_string()));
    }

    Ok(registry)
}

/// Bind tool arguments to a typed parameter struct.
///
/// Arguments must be a JSON object (null counts as empty); any mismatch is
/// reported as invalid params.
pub fn parse_args<T: DeserializeOwned>(tool: &str, args: Value) -> Result<T> {
    let args = match args {
        Value::Null => Value::Object(Default::default()),
        Value::Object(map) => Value::Object(map),
        other => {
            return Err(BridgeError::InvalidParams(format!(
                "{} arguments must be an object, got {}",
                tool, other
            )))
        }
    };
    serde_json::from_value(args).map_err(|e| BridgeError::InvalidParams(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct EchoTools;

    #[async_trait]
    impl ToolModule for EchoTools {
        fn name(&self) -> &'static str {
            "echo"
        }

        fn tools(&self) -> Vec<ToolDefinition> {
            vec![ToolDefinition::new("echo", "Echo arguments", json!({"type": "object"}))]
        }

        async fn call(&self, _tool: &str, _ctx: &ServerContext, args: Value) -> Result<Value> {
            Ok(args)
        }
    }

    #[derive(Debug, Deserialize)]
    #[serde(deny_unknown_fields)]
    struct QueryArgs {
        query: String,
        #[serde(default)]
        limit: Option<usize>,
    }

    #[test]
    fn test_parse_args_accepts_object_and_null() {
        let args: QueryArgs = parse_args("t", json!({"query": "q", "limit": 3})).unwrap();
        assert_eq!(args.query, "q");
        assert_eq!(args.limit, Some(3));

        #[derive(Debug, Deserialize)]
        struct Empty {}
        parse_args::<Empty>("t", Value::Null).unwrap();
    }

    #[test]
    fn test_parse_args_rejects_mismatches() {
        for bad in [json!([1, 2]), json!({"limit": 3}), json!({"query": "q", "extra": 1})] {
            let err = parse_args::<QueryArgs>("t", bad).unwrap_err();
            assert!(matches!(err, BridgeError::InvalidParams(_)), "{err:?}");
        }
    }

    #[test]
    fn test_duplicate_tool_names_rejected() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTools)).unwrap();
        assert!(registry.register(Arc::new(EchoTools)).is_err());
        assert_eq!(registry.tool_names(), vec!["echo"]);
    }

    #[test]
    fn test_register_modules_respects_config() {
        let all = register_modules(&ModulesConfig {
            rag: true,
            learning: true,
            projects_enabled: true,
        })
        .unwrap();
        assert!(all.contains("health_check"));
        assert!(all.contains("perform_rag_query"));
        assert!(all.contains("capture_learning"));
        assert!(all.contains("list_projects"));

        let no_projects = register_modules(&ModulesConfig {
            rag: true,
            learning: true,
            projects_enabled: false,
        })
        .unwrap();
        assert!(!no_projects.contains("list_projects"));
        assert!(no_projects.contains("session_info"));
    }

    #[test]
    fn test_zero_modules_is_an_error() {
        let err = register_modules(&ModulesConfig {
            rag: false,
            learning: false,
            projects_enabled: false,
        })
        .err()
        .unwrap();
        assert_eq!(err.to_string(), "No MCP modules available");
    }
}
