//! Error types for the learnbridge server
//!
//! This module provides comprehensive error handling using thiserror for
//! structured error definitions and anyhow for error propagation.

use crate::mcp::protocol;
use thiserror::Error;

/// Main error type for learnbridge operations
#[derive(Error, Debug)]
pub enum BridgeError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// HTTP request error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// External service answered with a non-success status
    #[error("Upstream service returned {status}: {body}")]
    Upstream { status: u16, body: String },

    /// Tool arguments did not match the tool's signature
    #[error("{0}")]
    InvalidParams(String),

    /// No tool registered under this name
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    /// Input failed validation
    #[error("Validation error: {0}")]
    Validation(String),

    /// MCP protocol error
    #[error("MCP protocol error: {0}")]
    McpProtocol(String),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl BridgeError {
    /// JSON-RPC error code used when this error escapes a tool call
    pub fn json_rpc_code(&self) -> i32 {
        match self {
            BridgeError::InvalidParams(_) => protocol::INVALID_PARAMS,
            BridgeError::ToolNotFound(_) => protocol::METHOD_NOT_FOUND,
            _ => protocol::SERVER_ERROR,
        }
    }

    /// Short variant name, reported as `error_type` in JSON-RPC error data
    pub fn kind(&self) -> &'static str {
        match self {
            BridgeError::Config(_) => "Config",
            BridgeError::Io(_) => "Io",
            BridgeError::Serialization(_) => "Serialization",
            BridgeError::Http(_) => "Http",
            BridgeError::Upstream { .. } => "Upstream",
            BridgeError::InvalidParams(_) => "InvalidParams",
            BridgeError::ToolNotFound(_) => "ToolNotFound",
            BridgeError::Validation(_) => "Validation",
            BridgeError::McpProtocol(_) => "McpProtocol",
            BridgeError::Other(_) => "Other",
        }
    }
}

/// Result type alias for learnbridge operations
pub type Result<T> = std::result::Result<T, BridgeError>;

/// Convert anyhow::Error to BridgeError
impl From<anyhow::Error> for BridgeError {
    fn from(err: anyhow::Error) -> Self {
        BridgeError::Other(err.to_string())
    }
}
