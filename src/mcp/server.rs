//! MCP server over newline-delimited JSON-RPC.
//!
//! ```text
//! MCP client (agent)
//!   │ stdin/stdout, one JSON message per line
//!   ▼
//! McpServer ── tools ── MalClient ── MAL API
//! ```

use serde_json::{Value, json};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, error, info, warn};

use super::protocol::*;
use super::tools::{Tool, build_tools};
use crate::error::Result;
use crate::mal::MalClient;

/// Lifecycle of a constructed server. There is no uninitialized value: a
/// server only exists once its client and tool registry are built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    Ready,
    Serving,
    Terminated,
}

pub struct McpServer {
    client: MalClient,
    tools: Vec<Tool>,
    state: ServerState,
}

impl McpServer {
    pub fn new(client: MalClient) -> Self {
        let tools = build_tools();
        info!(tools = tools.len(), "MCP tools registered");

        Self {
            client,
            tools,
            state: ServerState::Ready,
        }
    }

    pub fn state(&self) -> ServerState {
        self.state
    }

    pub async fn run_stdio(&mut self) -> Result<()> {
        let reader = BufReader::new(tokio::io::stdin());
        let writer = tokio::io::stdout();
        self.run(reader, writer).await
    }

    /// Serve requests until EOF. Requests are handled one at a time.
    pub async fn run<R, W>(&mut self, mut reader: R, mut writer: W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        self.state = ServerState::Serving;
        info!("MCP server listening on stdio");

        let result = self.serve(&mut reader, &mut writer).await;
        self.state = ServerState::Terminated;

        match &result {
            Ok(()) => info!("MCP server: client disconnected"),
            Err(e) => error!("MCP server stopped: {}", e),
        }
        result
    }

    async fn serve<R, W>(&mut self, reader: &mut R, writer: &mut W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut buf = Vec::new();
        loop {
            buf.clear();
            if reader.read_until(b'\n', &mut buf).await? == 0 {
                return Ok(());
            }

            let line = match std::str::from_utf8(&buf) {
                Ok(line) => line.trim(),
                Err(e) => {
                    warn!("MCP server: message is not valid UTF-8: {}", e);
                    let response = JsonRpcResponse::failure(
                        Value::Null,
                        error_codes::PARSE_ERROR,
                        format!("Parse error: {}", e),
                    );
                    write_response(writer, &response).await?;
                    continue;
                }
            };
            if line.is_empty() {
                continue;
            }

            if let Some(response) = self.handle_line(line).await {
                write_response(writer, &response).await?;
            }
        }
    }

    /// Handle one raw message. Only messages without an `id` member are
    /// notifications; `"id": null` still gets a response.
    pub async fn handle_line(&mut self, line: &str) -> Option<JsonRpcResponse> {
        let raw: Value = match serde_json::from_str(line) {
            Ok(raw) => raw,
            Err(e) => {
                warn!("MCP server: failed to parse message: {}", e);
                return Some(JsonRpcResponse::failure(
                    Value::Null,
                    error_codes::PARSE_ERROR,
                    format!("Parse error: {}", e),
                ));
            }
        };
        let id = raw.get("id").cloned();

        let message: IncomingMessage = match serde_json::from_value(raw) {
            Ok(message) => message,
            Err(e) => {
                warn!("MCP server: invalid request: {}", e);
                return Some(JsonRpcResponse::failure(
                    id.unwrap_or(Value::Null),
                    error_codes::INVALID_REQUEST,
                    format!("Invalid request: {}", e),
                ));
            }
        };

        let Some(id) = id else {
            debug!(method = %message.method, "MCP notification");
            return None;
        };
        Some(self.handle_request(id, &message).await)
    }

    async fn handle_request(&self, id: Value, message: &IncomingMessage) -> JsonRpcResponse {
        match message.method.as_str() {
            "initialize" => self.handle_initialize(id),
            "ping" => JsonRpcResponse::success(id, json!({})),
            "tools/list" => self.handle_tools_list(id),
            "tools/call" => self.handle_tools_call(id, message.params.clone()).await,
            other => JsonRpcResponse::failure(
                id,
                error_codes::METHOD_NOT_FOUND,
                format!("Method not found: {}", other),
            ),
        }
    }

    fn handle_initialize(&self, id: Value) -> JsonRpcResponse {
        let result = InitializeResult {
            protocol_version: MCP_PROTOCOL_VERSION.to_string(),
            capabilities: json!({ "tools": { "listChanged": false } }),
            server_info: ServerInfo {
                name: env!("CARGO_PKG_NAME").to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
        };

        match serde_json::to_value(result) {
            Ok(value) => JsonRpcResponse::success(id, value),
            Err(e) => JsonRpcResponse::failure(id, error_codes::INTERNAL_ERROR, e.to_string()),
        }
    }

    fn handle_tools_list(&self, id: Value) -> JsonRpcResponse {
        let tools: Vec<Value> = self.tools.iter().map(Tool::definition).collect();
        JsonRpcResponse::success(id, json!({ "tools": tools }))
    }

    async fn handle_tools_call(&self, id: Value, params: Option<Value>) -> JsonRpcResponse {
        let params: ToolCallParams = match params.map(serde_json::from_value::<ToolCallParams>) {
            Some(Ok(params)) => params,
            Some(Err(e)) => {
                return JsonRpcResponse::failure(
                    id,
                    error_codes::INVALID_PARAMS,
                    format!("Invalid params: {}", e),
                );
            }
            None => {
                return JsonRpcResponse::failure(id, error_codes::INVALID_PARAMS, "Missing params");
            }
        };

        let Some(tool) = self.tools.iter().find(|t| t.name == params.name) else {
            return JsonRpcResponse::failure(
                id,
                error_codes::INVALID_PARAMS,
                format!("Unknown tool: {}", params.name),
            );
        };

        let arguments = params.arguments.unwrap_or_else(|| json!({}));
        let result = match (tool.handler)(&self.client, arguments).await {
            Ok(value) => ToolCallResult::ok(value),
            Err(e) => {
                warn!(tool = tool.name, "Tool call failed: {}", e);
                ToolCallResult::error(e.to_string())
            }
        };

        match serde_json::to_value(result) {
            Ok(value) => JsonRpcResponse::success(id, value),
            Err(e) => JsonRpcResponse::failure(id, error_codes::INTERNAL_ERROR, e.to_string()),
        }
    }
}

async fn write_response<W>(writer: &mut W, response: &JsonRpcResponse) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut payload = serde_json::to_vec(response)?;
    payload.push(b'\n');
    writer.write_all(&payload).await?;
    writer.flush().await?;
    Ok(())
}
