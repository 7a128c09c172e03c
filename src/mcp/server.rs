//! MCP Server implementation
//!
//! Line-delimited JSON-RPC over stdio.

use std::sync::Arc;

use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};

use crate::error::Result;
use crate::mcp::catalog;
use crate::mcp::dispatcher::ToolDispatcher;
use crate::mcp::types::*;

/// MCP Server info
pub const SERVER_NAME: &str = "google-workspace";
const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// MCP Server for Gmail, Drive and Calendar
pub struct McpServer {
    dispatcher: Arc<ToolDispatcher>,

    /// Set once the client sends `notifications/initialized`
    initialized: bool,
}

impl McpServer {
    pub fn new(dispatcher: Arc<ToolDispatcher>) -> Self {
        Self {
            dispatcher,
            initialized: false,
        }
    }

    /// Run the server on stdio
    pub async fn run_stdio(&mut self) -> Result<()> {
        let stdin = BufReader::new(tokio::io::stdin());
        let stdout = tokio::io::stdout();
        self.run(stdin, stdout).await
    }

    /// Serve requests from `reader` until EOF, one JSON message per line
    pub async fn run<R, W>(&mut self, reader: R, mut writer: W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = reader.lines();

        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }

            if let Some(response) = self.handle_message(&line).await {
                let mut encoded = serde_json::to_string(&response)?;
                encoded.push('\n');
                writer.write_all(encoded.as_bytes()).await?;
                writer.flush().await?;
            }
        }

        tracing::info!("Input closed, shutting down");
        Ok(())
    }

    /// Handle one JSON-RPC message; notifications produce no response
    pub async fn handle_message(&mut self, message: &str) -> Option<JsonRpcResponse> {
        let request: JsonRpcRequest = match serde_json::from_str(message) {
            Ok(req) => req,
            Err(e) => {
                tracing::warn!("Unparsable message: {}", e);
                return Some(JsonRpcResponse::error(
                    None,
                    JsonRpcError::parse_error(format!("Parse error: {}", e)),
                ));
            }
        };

        let Some(id) = request.id.clone() else {
            self.handle_notification(&request.method);
            return None;
        };

        let response = match request.method.as_str() {
            methods::INITIALIZE => to_response(id, &self.initialize_result()),
            methods::PING => JsonRpcResponse::success(Some(id), serde_json::json!({})),
            methods::LIST_TOOLS => to_response(
                id,
                &ListToolsResult {
                    tools: catalog::list_tools(),
                },
            ),
            methods::CALL_TOOL => {
                let result = self.handle_call_tool(request.params).await;
                to_response(id, &result)
            }
            _ => {
                tracing::debug!("Unknown method: {}", request.method);
                JsonRpcResponse::error(Some(id), JsonRpcError::method_not_found(&request.method))
            }
        };

        Some(response)
    }

    fn handle_notification(&mut self, method: &str) {
        if method == methods::INITIALIZED {
            self.initialized = true;
            tracing::info!("Client initialized");
        } else {
            tracing::debug!("Ignoring notification {}", method);
        }
    }

    fn initialize_result(&self) -> InitializeResult {
        InitializeResult {
            protocol_version: MCP_VERSION.to_string(),
            server_info: ServerInfo {
                name: SERVER_NAME.to_string(),
                version: SERVER_VERSION.to_string(),
            },
            capabilities: ServerCapabilities {
                tools: Some(ToolsCapability {}),
            },
        }
    }

    async fn handle_call_tool(&self, params: Option<Value>) -> CallToolResult {
        let params: CallToolParams = match params.map(serde_json::from_value) {
            Some(Ok(params)) => params,
            Some(Err(e)) => return CallToolResult::error(format!("Invalid tool parameters: {}", e)),
            None => return CallToolResult::error("Missing tool parameters"),
        };

        self.dispatcher.dispatch(&params.name, params.arguments).await
    }
}

fn to_response<T: serde::Serialize>(id: RequestId, result: &T) -> JsonRpcResponse {
    match serde_json::to_value(result) {
        Ok(value) => JsonRpcResponse::success(Some(id), value),
        Err(e) => JsonRpcResponse::error(Some(id), JsonRpcError::internal_error(e.to_string())),
    }
}
