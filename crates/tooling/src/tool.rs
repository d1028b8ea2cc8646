use crate::schema::{summarize, Violation};
use anyhow::Result;
use async_trait::async_trait;
use llm::LlmError;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolRequest {
    pub name: String,
    #[serde(default = "empty_arguments")]
    pub arguments: Value,
}

fn empty_arguments() -> Value {
    Value::Object(Map::new())
}

impl ToolRequest {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            arguments: empty_arguments(),
        }
    }

    pub fn with_arguments(mut self, arguments: Value) -> Self {
        self.arguments = arguments;
        self
    }

    pub fn with_argument<T: Serialize>(mut self, key: &str, value: T) -> Result<Self> {
        let json_value = serde_json::to_value(value)?;
        match self.arguments.as_object_mut() {
            Some(arguments) => {
                arguments.insert(key.to_string(), json_value);
            }
            None => anyhow::bail!("Arguments for '{}' are not an object", self.name),
        }
        Ok(self)
    }
}

/// Why a handler could not produce a result.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum HandlerFailure {
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("Upstream provider error: {0}")]
    Upstream(String),

    #[error("Upstream provider timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("Upstream provider rejected the credentials: {0}")]
    Authentication(String),

    #[error("Upstream provider rate limited the request: {0}")]
    RateLimited(String),

    #[error("Provider response could not be used: {reason}")]
    MalformedResponse { reason: String, raw: String },

    #[error(
        "Provider response does not match the requested schema: {}",
        summarize(.violations)
    )]
    SchemaMismatch { violations: Vec<Violation> },

    #[error("Handler panicked: {0}")]
    Panicked(String),
}

impl HandlerFailure {
    pub fn kind(&self) -> &'static str {
        match self {
            HandlerFailure::InvalidArguments(_) => "invalid_arguments",
            HandlerFailure::Upstream(_) => "upstream",
            HandlerFailure::Timeout { .. } => "timeout",
            HandlerFailure::Authentication(_) => "authentication",
            HandlerFailure::RateLimited(_) => "rate_limited",
            HandlerFailure::MalformedResponse { .. } => "malformed_response",
            HandlerFailure::SchemaMismatch { .. } => "schema_mismatch",
            HandlerFailure::Panicked(_) => "panicked",
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            HandlerFailure::Upstream(_)
                | HandlerFailure::Timeout { .. }
                | HandlerFailure::RateLimited(_)
        )
    }

    /// Machine-readable description carried in the failure `details`.
    pub fn details(&self) -> Value {
        let mut details = json!({
            "cause": self.kind(),
            "message": self.to_string(),
            "retryable": self.is_retryable(),
        });
        match self {
            HandlerFailure::MalformedResponse { raw, .. } => {
                details["raw_response"] = Value::String(raw.clone());
            }
            HandlerFailure::SchemaMismatch { violations } => {
                details["violations"] = json!(violations);
            }
            _ => {}
        }
        details
    }
}

impl From<LlmError> for HandlerFailure {
    fn from(error: LlmError) -> Self {
        match error {
            LlmError::Timeout { timeout_secs } => HandlerFailure::Timeout { timeout_secs },
            LlmError::Authentication { .. } => HandlerFailure::Authentication(error.to_string()),
            LlmError::RateLimited { .. } => HandlerFailure::RateLimited(error.to_string()),
            other => HandlerFailure::Upstream(other.to_string()),
        }
    }
}

#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn invoke(&self, arguments: Value) -> Result<Value, HandlerFailure>;
}

/// A registered tool: its contract plus the handler that fulfils it.
#[derive(Clone)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
    pub output_schema: Value,
    pub handler: Arc<dyn ToolHandler>,
}

impl ToolDescriptor {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        handler: Arc<dyn ToolHandler>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema: json!({"type": "object"}),
            output_schema: json!({}),
            handler,
        }
    }

    pub fn with_input_schema(mut self, schema: Value) -> Self {
        self.input_schema = schema;
        self
    }

    pub fn with_output_schema(mut self, schema: Value) -> Self {
        self.output_schema = schema;
        self
    }

    pub fn info(&self) -> ToolInfo {
        ToolInfo {
            name: self.name.clone(),
            description: self.description.clone(),
            input_schema: self.input_schema.clone(),
            output_schema: self.output_schema.clone(),
        }
    }
}

impl std::fmt::Debug for ToolDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolDescriptor")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("input_schema", &self.input_schema)
            .field("output_schema", &self.output_schema)
            .finish_non_exhaustive()
    }
}

/// Tool-discovery entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolInfo {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
    pub output_schema: Value,
}
