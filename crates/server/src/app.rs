use crate::errors::ApiError;
use crate::models::{HealthResponse, ToolCallResponse, ToolListResponse};
use crate::rpc::handle_rpc;
use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tooling::{Dispatcher, ErrorKind, ToolFailure, ToolRequest, ToolResult};

#[derive(Debug, Clone)]
pub struct AppState {
    pub dispatcher: Arc<Dispatcher>,
}

impl AppState {
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self {
            dispatcher: Arc::new(dispatcher),
        }
    }
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

async fn list_tools(State(state): State<AppState>) -> Json<ToolListResponse> {
    Json(ToolListResponse {
        tools: state.dispatcher.registry().discovery(),
    })
}

async fn call_tool(State(state): State<AppState>, body: Bytes) -> Response {
    let request: ToolRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(e) => {
            return ApiError(ToolFailure {
                kind: ErrorKind::InvalidInput,
                message: format!("Invalid tool call body: {}", e),
                details: None,
            })
            .into_response()
        }
    };

    match state.dispatcher.dispatch_request(request).await {
        ToolResult::Success { payload } => (
            StatusCode::OK,
            Json(ToolCallResponse::Success { content: payload }),
        )
            .into_response(),
        ToolResult::Failure(failure) => ApiError(failure).into_response(),
    }
}

pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/tools", get(list_tools))
        .route("/tools/call", post(call_tool))
        .route("/mcp", post(handle_rpc))
        .with_state(state)
}
