//! Stdio transport
//!
//! Newline-delimited JSON-RPC over stdin/stdout for local MCP clients.
//! Logging goes to stderr so stdout carries protocol messages only.

use crate::error::Result;
use crate::mcp::dispatch::Dispatcher;
use crate::mcp::protocol::{JsonRpcError, JsonRpcResponse};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, error, info};

/// Serve on the process's stdin and stdout until EOF
pub async fn run(dispatcher: Dispatcher) -> Result<()> {
    info!("MCP server started, listening on stdin...");
    let reader = BufReader::new(tokio::io::stdin());
    let writer = tokio::io::stdout();
    serve_lines(&dispatcher, reader, writer).await?;
    info!("MCP server shutting down");
    Ok(())
}

/// Process one request per line until the reader is exhausted
pub async fn serve_lines<R, W>(dispatcher: &Dispatcher, mut reader: R, mut writer: W) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut line = String::new();

    loop {
        line.clear();

        match reader.read_line(&mut line).await {
            Ok(0) => {
                debug!("Received EOF, shutting down");
                break;
            }
            Ok(_) => {
                let request = line.trim();
                if request.is_empty() {
                    continue;
                }

                debug!("Received request: {}", request);

                let Some(response) = dispatcher.handle_message(request).await else {
                    continue;
                };

                let response_json = encode(&response);
                debug!("Sending response: {}", response_json);

                writer.write_all(response_json.as_bytes()).await?;
                writer.write_all(b"\n").await?;
                writer.flush().await?;
            }
            Err(e) => {
                error!("Failed to read from stdin: {}", e);
                return Err(e.into());
            }
        }
    }

    Ok(())
}

fn encode(response: &JsonRpcResponse) -> String {
    serde_json::to_string(response).unwrap_or_else(|e| {
        error!("Failed to serialize response: {}", e);
        let fallback = JsonRpcResponse::error(
            response.id.clone(),
            JsonRpcError::internal_error(format!("Serialization error: {}", e)),
        );
        serde_json::to_string(&fallback).unwrap_or_default()
    })
}
