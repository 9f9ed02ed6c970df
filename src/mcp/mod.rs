//! Model Context Protocol (MCP) implementation
//!
//! JSON-RPC 2.0 types, the tool registry and protocol method dispatch.
//! The transports in [`crate::transport`] sit on top of this module.

pub mod dispatch;
pub mod protocol;
pub mod registry;

pub use dispatch::{tool_error, Dispatcher, PROTOCOL_VERSION, SERVER_NAME};
pub use protocol::{JsonRpcError, JsonRpcRequest, JsonRpcResponse};
pub use registry::{register_modules, ToolDefinition, ToolModule, ToolRegistry};
