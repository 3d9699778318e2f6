use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Value};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use crate::pipeline::Reader;
use crate::response::tool_content;

pub const PROTOCOL_VERSION: &str = "2024-11-05";
pub const TOOL_NAME: &str = "web_reader";

const PARSE_ERROR: i64 = -32700;
const METHOD_NOT_FOUND: i64 = -32601;
const INVALID_PARAMS: i64 = -32602;

// ── Envelope ─────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct RpcRequest {
    /// `None` only when the member is absent; `"id": null` is still a request.
    #[serde(default, deserialize_with = "present")]
    pub id: Option<Value>,
    #[serde(default)]
    pub method: String,
    #[serde(default)]
    pub params: Option<Value>,
}

fn present<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Value>, D::Error> {
    Value::deserialize(deserializer).map(Some)
}

#[derive(Debug, Serialize, PartialEq)]
pub struct RpcResponse {
    pub jsonrpc: &'static str,
    pub id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
}

impl RpcResponse {
    fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: Some(result),
            error: None,
        }
    }

    fn failure(id: Value, code: i64, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: None,
            error: Some(RpcError {
                code,
                message: message.into(),
            }),
        }
    }
}

#[derive(Debug, Deserialize)]
struct InitializeParams {
    #[serde(rename = "clientInfo", default)]
    client_info: Option<ClientInfo>,
}

#[derive(Debug, Deserialize)]
struct ClientInfo {
    #[serde(default)]
    name: String,
}

#[derive(Debug, Deserialize)]
struct CallToolParams {
    name: String,
    #[serde(default)]
    arguments: Value,
}

// ── Stdio loop ───────────────────────────────────────────────────────────────

/// Serve newline-delimited JSON-RPC until `input` reaches EOF. Messages are
/// handled one at a time, in arrival order.
pub async fn serve<R, W>(reader: &Reader, input: R, mut output: W) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = input.lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let message: RpcRequest = match serde_json::from_str(line) {
            Ok(m) => m,
            Err(e) => {
                tracing::warn!(error = %e, "error decoding message");
                continue;
            }
        };
        tracing::info!(method = %message.method, id = ?message.id, "received message");

        if let Some(response) = handle_message(reader, message).await {
            let mut frame = serde_json::to_string(&response)?;
            frame.push('\n');
            output.write_all(frame.as_bytes()).await?;
            output.flush().await?;
        }
    }

    tracing::info!("received EOF, shutting down");
    Ok(())
}

/// Dispatch one message. Notifications (no `id`) produce no response.
pub async fn handle_message(reader: &Reader, message: RpcRequest) -> Option<RpcResponse> {
    let Some(id) = message.id else {
        tracing::debug!(method = %message.method, "notification");
        return None;
    };
    let params = message.params.unwrap_or(Value::Null);

    let response = match message.method.as_str() {
        "initialize" => initialize(id, params),
        "tools/list" => RpcResponse::success(id, json!({ "tools": [tool_definition()] })),
        "tools/call" => call_tool(reader, id, params).await,
        "ping" => RpcResponse::success(id, json!("pong")),
        other => RpcResponse::failure(id, METHOD_NOT_FOUND, format!("Method not found: {}", other)),
    };
    Some(response)
}

fn initialize(id: Value, params: Value) -> RpcResponse {
    let params: InitializeParams = match serde_json::from_value(params) {
        Ok(p) => p,
        Err(e) => {
            tracing::warn!(error = %e, "error decoding initialize params");
            return RpcResponse::failure(id, PARSE_ERROR, "Parse error");
        }
    };
    let client = params.client_info.map(|c| c.name).unwrap_or_default();
    tracing::info!(client = %client, "initialize request");

    RpcResponse::success(
        id,
        json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": { "tools": {}, "resources": {} },
            "serverInfo": {
                "name": "web-reader-mcp",
                "version": env!("CARGO_PKG_VERSION"),
            },
        }),
    )
}

async fn call_tool(reader: &Reader, id: Value, params: Value) -> RpcResponse {
    let params: CallToolParams = match serde_json::from_value(params) {
        Ok(p) => p,
        Err(_) => return RpcResponse::failure(id, INVALID_PARAMS, "Invalid params"),
    };
    tracing::info!(tool = %params.name, "tool call");

    if params.name != TOOL_NAME {
        return RpcResponse::failure(id, METHOD_NOT_FOUND, format!("Unknown tool: {}", params.name));
    }

    match reader.read_arguments(&params.arguments).await {
        Ok(result) => RpcResponse::success(id, json!({ "content": tool_content(&result) })),
        Err(e) => RpcResponse::failure(id, e.code(), e.to_string()),
    }
}

pub fn tool_definition() -> Value {
    json!({
        "name": TOOL_NAME,
        "description": "Fetch web content and convert it to clean Markdown format. Optionally extract images and links with metadata.",
        "inputSchema": {
            "type": "object",
            "properties": {
                "url": { "type": "string", "description": "The URL to fetch content from" },
                "model": { "type": "string", "description": "AI model to use for conversion" },
                "maxTokens": { "type": "integer", "description": "Maximum tokens in response (default: 4000)" },
                "temperature": { "type": "number", "description": "AI temperature 0-1 (default: 0.7; an explicit 0 is sent as 0)" },
                "retain_images": { "type": "boolean", "description": "Extract images from content" },
                "keep_img_data_url": { "type": "boolean", "description": "Download and convert images to base64 data URLs" },
                "with_images_summary": { "type": "boolean", "description": "Include image metadata in response" },
                "with_links_summary": { "type": "boolean", "description": "Extract and include link metadata" },
            },
            "required": ["url"],
        },
    })
}
