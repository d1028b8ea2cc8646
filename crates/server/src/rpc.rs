//! Minimal MCP endpoint: JSON-RPC 2.0 over a single HTTP POST route.
//!
//! Supports `initialize`, `ping`, `tools/list` and `tools/call`. Messages
//! without an `id` are notifications and are acknowledged with `202`.

use crate::app::AppState;
use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tooling::{Dispatcher, ErrorKind, ToolRequest, ToolResult};

pub const PROTOCOL_VERSION: &str = "2024-11-05";
pub const SERVER_NAME: &str = "gemini-mcp-server";

/// Standard JSON-RPC error codes.
pub mod error_codes {
    pub const PARSE_ERROR: i64 = -32700;
    pub const INVALID_REQUEST: i64 = -32600;
    pub const METHOD_NOT_FOUND: i64 = -32601;
    pub const INVALID_PARAMS: i64 = -32602;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcRequest {
    pub jsonrpc: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcResponse {
    pub jsonrpc: String,
    pub id: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl RpcError {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    pub fn with_data(mut self, data: Option<Value>) -> Self {
        self.data = data;
        self
    }
}

impl RpcResponse {
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(id: Value, error: RpcError) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: None,
            error: Some(error),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

pub async fn handle_rpc(State(state): State<AppState>, body: Bytes) -> Response {
    let message: Value = match serde_json::from_slice(&body) {
        Ok(message) => message,
        Err(e) => {
            return reply(RpcResponse::failure(
                Value::Null,
                RpcError::new(error_codes::PARSE_ERROR, format!("Parse error: {}", e)),
            ))
        }
    };

    if message.is_array() {
        return reply(RpcResponse::failure(
            Value::Null,
            RpcError::new(
                error_codes::INVALID_REQUEST,
                "Batch requests are not supported",
            ),
        ));
    }

    let id = message.get("id").cloned().unwrap_or(Value::Null);
    let request: RpcRequest = match serde_json::from_value(message) {
        Ok(request) => request,
        Err(e) => {
            return reply(RpcResponse::failure(
                id,
                RpcError::new(
                    error_codes::INVALID_REQUEST,
                    format!("Invalid request: {}", e),
                ),
            ))
        }
    };

    if request.jsonrpc != "2.0" {
        return reply(RpcResponse::failure(
            id,
            RpcError::new(error_codes::INVALID_REQUEST, "jsonrpc must be \"2.0\""),
        ));
    }

    let Some(id) = request.id else {
        debug!("Acknowledged notification '{}'", request.method);
        return StatusCode::ACCEPTED.into_response();
    };

    let response = match call_method(&state.dispatcher, &request.method, request.params).await {
        Ok(result) => RpcResponse::success(id, result),
        Err(error) => RpcResponse::failure(id, error),
    };
    reply(response)
}

fn reply(response: RpcResponse) -> Response {
    (StatusCode::OK, Json(response)).into_response()
}

async fn call_method(
    dispatcher: &Dispatcher,
    method: &str,
    params: Option<Value>,
) -> Result<Value, RpcError> {
    match method {
        "initialize" => {
            info!("MCP client initialized");
            Ok(json!({
                "protocolVersion": PROTOCOL_VERSION,
                "capabilities": {"tools": {"listChanged": false}},
                "serverInfo": {
                    "name": SERVER_NAME,
                    "version": env!("CARGO_PKG_VERSION")
                }
            }))
        }
        "ping" => Ok(json!({})),
        "tools/list" => Ok(json!({ "tools": dispatcher.registry().discovery() })),
        "tools/call" => call_tool(dispatcher, params).await,
        other => Err(RpcError::new(
            error_codes::METHOD_NOT_FOUND,
            format!("Method not found: {}", other),
        )),
    }
}

async fn call_tool(dispatcher: &Dispatcher, params: Option<Value>) -> Result<Value, RpcError> {
    let params = params.ok_or_else(|| {
        RpcError::new(error_codes::INVALID_PARAMS, "tools/call requires params")
    })?;
    let request: ToolRequest = serde_json::from_value(params).map_err(|e| {
        RpcError::new(
            error_codes::INVALID_PARAMS,
            format!("Invalid tools/call params: {}", e),
        )
    })?;

    match dispatcher.dispatch_request(request).await {
        ToolResult::Success { payload } => Ok(json!({
            "content": [{"type": "text", "text": payload.to_string()}],
            "structuredContent": payload,
            "isError": false
        })),
        ToolResult::Failure(failure) if failure.kind == ErrorKind::UnknownTool => Err(
            RpcError::new(error_codes::INVALID_PARAMS, failure.message).with_data(failure.details),
        ),
        ToolResult::Failure(failure) => Ok(json!({
            "content": [{"type": "text", "text": failure.message.clone()}],
            "structuredContent": {"error": failure},
            "isError": true
        })),
    }
}
