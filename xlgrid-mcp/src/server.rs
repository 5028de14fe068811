//! Line-delimited JSON-RPC loop over stdio.

use serde_json::{json, Value};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, warn};
use xlgrid_core::DocumentCache;

use crate::error::McpError;
use crate::protocol::{CallToolParams, Request, Response, RpcError, DEFAULT_PROTOCOL_VERSION, PARSE_ERROR};
use crate::tools;

pub const SERVER_NAME: &str = env!("CARGO_PKG_NAME");
pub const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// An MCP server answering one request at a time against a shared document cache.
pub struct Server {
    cache: DocumentCache,
}

impl Server {
    pub fn new(cache: DocumentCache) -> Self {
        Server { cache }
    }

    pub fn cache(&self) -> &DocumentCache {
        &self.cache
    }

    /// Read messages from `reader` until it closes, writing one response line per request.
    pub async fn run<R, W>(&self, reader: R, mut writer: W) -> std::io::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        info!(
            name = SERVER_NAME,
            version = SERVER_VERSION,
            cache_capacity = ?self.cache.capacity(),
            "MCP server started"
        );
        let mut lines = reader.lines();
        while let Some(line) = lines.next_line().await? {
            if let Some(response) = self.handle_message(&line).await {
                let mut bytes = serde_json::to_vec(&response)?;
                bytes.push(b'\n');
                writer.write_all(&bytes).await?;
                writer.flush().await?;
            }
        }
        info!("input closed, shutting down");
        Ok(())
    }

    /// Handle one raw message. Notifications and blank lines yield no response.
    pub async fn handle_message(&self, line: &str) -> Option<Value> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }

        let message: Value = match serde_json::from_str(line) {
            Ok(message) => message,
            Err(e) => {
                warn!(error = %e, "unparseable message");
                let error = RpcError {
                    code: PARSE_ERROR,
                    message: format!("Parse error: {e}"),
                };
                return to_value(Response::failure(Value::Null, error));
            }
        };

        let id = message.get("id").cloned().unwrap_or(Value::Null);
        let request: Request = match serde_json::from_value(message) {
            Ok(request) => request,
            Err(e) => {
                let error = McpError::InvalidRequest(e.to_string());
                return to_value(Response::failure(id, error.to_rpc()));
            }
        };

        if request.is_notification() {
            debug!(method = %request.method, "notification");
            return None;
        }

        let response = match self.dispatch(&request.method, request.params).await {
            Ok(result) => Response::success(id, result),
            Err(e) => {
                warn!(method = %request.method, code = e.code(), error = %e, "request failed");
                Response::failure(id, e.to_rpc())
            }
        };
        to_value(response)
    }

    async fn dispatch(&self, method: &str, params: Option<Value>) -> Result<Value, McpError> {
        match method {
            "initialize" => {
                let version = params
                    .as_ref()
                    .and_then(|p| p.get("protocolVersion"))
                    .and_then(Value::as_str)
                    .unwrap_or(DEFAULT_PROTOCOL_VERSION);
                Ok(json!({
                    "protocolVersion": version,
                    "capabilities": { "tools": {} },
                    "serverInfo": { "name": SERVER_NAME, "version": SERVER_VERSION },
                }))
            }
            "ping" => Ok(json!({})),
            "tools/list" => Ok(tools::list_tools()),
            "tools/call" => {
                let params: CallToolParams =
                    serde_json::from_value(params.unwrap_or(Value::Null))?;
                debug!(tool = %params.name, "tool call");
                let result = tools::call_tool(&self.cache, &params.name, params.arguments).await?;
                encode_result(result)
            }
            other => Err(McpError::MethodNotFound(other.to_string())),
        }
    }
}

/// A result that fails to serialize is the server's fault, not the caller's.
fn encode_result<T: serde::Serialize>(result: T) -> Result<Value, McpError> {
    serde_json::to_value(result).map_err(|e| McpError::Internal(e.to_string()))
}

fn to_value(response: Response) -> Option<Value> {
    match serde_json::to_value(response) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(error = %e, "failed to serialize response");
            None
        }
    }
}
