//! MCP tool modules
//!
//! Every tool is a thin adapter: arguments are validated here and the work
//! is forwarded to an external service or to the metacognition pipeline.

pub mod learning;
pub mod project;
pub mod rag;
pub mod system;

pub use learning::LearningTools;
pub use project::ProjectTools;
pub use rag::RagTools;
pub use system::SystemTools;

use crate::error::Result;
use serde_json::{json, Value};
use tracing::error;

/// Wrap an upstream answer in a success envelope.
///
/// Object responses are passed through with `success` added; anything
/// else lands under `result`. Upstream failures become
/// `{"success": false, "error": ...}` rather than JSON-RPC errors.
pub(crate) fn forwarded(tool: &str, outcome: Result<Value>) -> Value {
    match outcome {
        Ok(Value::Object(mut map)) => {
            map.entry("success").or_insert(json!(true));
            Value::Object(map)
        }
        Ok(other) => json!({ "success": true, "result": other }),
        Err(e) => {
            error!("{} failed: {}", tool, e);
            json!({ "success": false, "error": e.to_string() })
        }
    }
}
