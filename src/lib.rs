//! learnbridge - MCP tool server for debugging-session learning capture
//!
//! Exposes a registry of tools over an HTTP JSON-RPC bridge, an SSE
//! transport and stdio. Most tools forward to external HTTP services; the
//! learning-capture tools turn debugging narratives into structured
//! markdown learning entries.
//!
//! # Architecture
//!
//! - **Config**: layered settings (defaults, TOML file, environment, CLI)
//! - **Context**: shared server state (service clients, health, sessions)
//! - **MCP**: protocol types, tool registry, method dispatch
//! - **Tools**: system, RAG, learning-capture and project tool modules
//! - **Metacognition**: the learning-entry pipeline and its markdown store
//! - **Services**: reqwest clients for the knowledge and project services
//! - **Transport**: axum router for `/mcp` and `/sse`, plus stdio
//!
//! # Example
//!
//! ```ignore
//! use learnbridge_core::{register_modules, BridgeConfig, Dispatcher, ServerContext};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = BridgeConfig::load(None, Default::default())?;
//!     let addr = config.bind_addr()?;
//!     let registry = register_modules(&config.modules)?;
//!     let ctx = ServerContext::from_config(config);
//!     let dispatcher = Dispatcher::new(Arc::new(registry), Arc::new(ctx));
//!
//!     learnbridge_core::transport::serve(dispatcher, &addr, learnbridge_core::transport::ctrl_c()).await
//! }
//! ```

pub mod config;
pub mod context;
pub mod error;
pub mod mcp;
pub mod metacognition;
pub mod services;
pub mod tools;
pub mod transport;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use config::{BridgeConfig, ConfigOverrides};
pub use context::{HealthState, HealthStatus, ServerContext};
pub use error::{BridgeError, Result};
pub use mcp::{register_modules, Dispatcher, ToolRegistry};
pub use metacognition::KnowledgeStore;
pub use services::{KnowledgeService, ProjectService, ServiceClient};
pub use types::{DebuggingExperience, EntryVersion, LearningEntry, SessionData};
