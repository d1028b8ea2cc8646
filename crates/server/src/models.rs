use serde::{Deserialize, Serialize};
use serde_json::Value;
use tooling::{ToolFailure, ToolInfo, ToolResult};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolListResponse {
    pub tools: Vec<ToolInfo>,
}

/// Body of a tool-call response: `{content}` or `{error}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ToolCallResponse {
    Success { content: Value },
    Failure { error: ToolFailure },
}

impl From<ToolResult> for ToolCallResponse {
    fn from(result: ToolResult) -> Self {
        match result {
            ToolResult::Success { payload } => ToolCallResponse::Success { content: payload },
            ToolResult::Failure(error) => ToolCallResponse::Failure { error },
        }
    }
}
