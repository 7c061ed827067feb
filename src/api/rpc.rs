//! Line-delimited JSON-RPC 2.0 over stdio, in the shape MCP tool servers use:
//! `initialize`, `tools/list` and `tools/call`.

use super::{cancelled_body, error_body, submitted_body, SERVER_NAME, SERVER_VERSION, TOOLS};
use crate::{jobs::JobKind, service::DownloadService};
use anyhow::{Context, Result};
use serde_json::{json, Value};
use tokio::{
    io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt},
    task::JoinSet,
};
use tracing::{debug, info, warn};

const PROTOCOL_VERSION: &str = "2024-11-05";

const PARSE_ERROR: i64 = -32700;
const INVALID_REQUEST: i64 = -32600;
const METHOD_NOT_FOUND: i64 = -32601;
const INVALID_PARAMS: i64 = -32602;

#[derive(Debug)]
struct RpcError {
    code: i64,
    message: String,
}

impl RpcError {
    fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    fn invalid_params(message: impl Into<String>) -> Self {
        Self::new(INVALID_PARAMS, message)
    }
}

pub async fn serve_stdio(service: DownloadService) -> Result<()> {
    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    serve(service, stdin, tokio::io::stdout()).await
}

/// Answers requests until `reader` reaches EOF and every request in flight has been answered.
/// Each request runs in its own task, so responses are written in completion order.
pub async fn serve<R, W>(service: DownloadService, reader: R, mut writer: W) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    info!("RPC server ready on stdio");
    let mut lines = reader.lines();
    let mut in_flight: JoinSet<Option<Value>> = JoinSet::new();
    let mut input_open = true;

    while input_open || !in_flight.is_empty() {
        tokio::select! {
            line = lines.next_line(), if input_open => {
                match line.context("Failed to read request")? {
                    Some(line) if !line.trim().is_empty() => {
                        let service = service.clone();
                        in_flight.spawn(async move { handle_line(&service, &line).await });
                    }
                    Some(_) => {}
                    None => input_open = false,
                }
            }
            Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => {
                match joined {
                    Ok(Some(response)) => write_frame(&mut writer, &response).await?,
                    Ok(None) => {}
                    Err(e) => warn!("RPC request task failed: {}", e),
                }
            }
        }
    }

    info!("RPC input closed");
    Ok(())
}

async fn write_frame<W: AsyncWrite + Unpin>(writer: &mut W, response: &Value) -> Result<()> {
    let mut frame = response.to_string();
    frame.push('\n');
    writer
        .write_all(frame.as_bytes())
        .await
        .context("Failed to write response")?;
    writer.flush().await.context("Failed to flush response")
}

/// Returns the response frame, or `None` for notifications.
pub async fn handle_line(service: &DownloadService, line: &str) -> Option<Value> {
    let message: Value = match serde_json::from_str(line) {
        Ok(message) => message,
        Err(e) => {
            return Some(error_response(
                Value::Null,
                RpcError::new(PARSE_ERROR, format!("Parse error: {}", e)),
            ))
        }
    };

    let id = message.get("id").cloned();
    let Some(method) = message["method"].as_str() else {
        return Some(error_response(
            id.unwrap_or(Value::Null),
            RpcError::new(INVALID_REQUEST, "Missing method"),
        ));
    };
    debug!("RPC request: {}", method);

    let result = dispatch(service, method, &message["params"]).await;
    let id = id?;

    Some(match result {
        Ok(result) => json!({ "jsonrpc": "2.0", "id": id, "result": result }),
        Err(err) => error_response(id, err),
    })
}

async fn dispatch(service: &DownloadService, method: &str, params: &Value) -> Result<Value, RpcError> {
    match method {
        "initialize" => Ok(json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": { "tools": {} },
            "serverInfo": { "name": SERVER_NAME, "version": SERVER_VERSION },
        })),
        "ping" => Ok(json!({})),
        "tools/list" => Ok(json!({ "tools": tool_definitions() })),
        "tools/call" => {
            let name = params["name"]
                .as_str()
                .ok_or_else(|| RpcError::invalid_params("Missing tool name"))?;
            let arguments = params.get("arguments").cloned().unwrap_or_else(|| json!({}));

            let (body, is_error) = match call_tool(service, name, &arguments).await? {
                Ok(body) => (body, false),
                Err(body) => (body, true),
            };
            Ok(json!({
                "content": [{ "type": "text", "text": body.to_string() }],
                "structuredContent": body,
                "isError": is_error,
            }))
        }
        method if method.starts_with("notifications/") => Ok(Value::Null),
        _ => Err(RpcError::new(
            METHOD_NOT_FOUND,
            format!("Method not found: {}", method),
        )),
    }
}

/// Outer error: malformed call. Inner error: the tool ran and reports `{"error": ..}`.
async fn call_tool(
    service: &DownloadService,
    name: &str,
    arguments: &Value,
) -> Result<Result<Value, Value>, RpcError> {
    let outcome = match name {
        "download_video" | "download_playlist" => {
            let url = required_str(arguments, "url")?;
            let quality = arguments["quality"].as_str();
            let (kind, message) = if name == "download_video" {
                (JobKind::Single, "Video download started")
            } else {
                (JobKind::Playlist, "Playlist download started")
            };
            service
                .submit(url, kind, quality)
                .map(|id| submitted_body(&id.to_string(), message))
        }
        "get_download_status" => {
            let job_id = required_str(arguments, "job_id")?;
            service.get_status(job_id).map(|snapshot| json!(snapshot))
        }
        "cancel_download" => {
            let job_id = required_str(arguments, "job_id")?;
            service.cancel(job_id).map(|_| cancelled_body(job_id))
        }
        "list_downloads" => {
            let jobs = service.list_jobs();
            Ok(json!({ "total_jobs": jobs.len(), "jobs": jobs }))
        }
        "get_video_metadata" => {
            let url = required_str(arguments, "url")?;
            service.fetch_metadata(url).await.map(|(kind, metadata)| {
                json!({ "url": url, "type": kind, "metadata": metadata })
            })
        }
        _ => return Err(RpcError::invalid_params(format!("Unknown tool: {}", name))),
    };

    Ok(outcome.map_err(|e| error_body(&e)))
}

fn required_str<'a>(arguments: &'a Value, key: &str) -> Result<&'a str, RpcError> {
    arguments[key]
        .as_str()
        .ok_or_else(|| RpcError::invalid_params(format!("Missing string argument: {}", key)))
}

fn tool_definitions() -> Vec<Value> {
    TOOLS
        .iter()
        .map(|tool| {
            json!({
                "name": tool.name,
                "description": tool.description,
                "inputSchema": input_schema(tool.name),
            })
        })
        .collect()
}

fn input_schema(tool: &str) -> Value {
    match tool {
        "download_video" | "download_playlist" => json!({
            "type": "object",
            "properties": {
                "url": { "type": "string", "description": "URL to download" },
                "quality": {
                    "type": "string",
                    "description": "Maximum height, e.g. 480p, 720p, 1080p",
                    "default": "720p"
                }
            },
            "required": ["url"]
        }),
        "get_download_status" | "cancel_download" => json!({
            "type": "object",
            "properties": { "job_id": { "type": "string" } },
            "required": ["job_id"]
        }),
        "get_video_metadata" => json!({
            "type": "object",
            "properties": { "url": { "type": "string" } },
            "required": ["url"]
        }),
        _ => json!({ "type": "object", "properties": {} }),
    }
}

fn error_response(id: Value, err: RpcError) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "error": { "code": err.code, "message": err.message },
    })
}
