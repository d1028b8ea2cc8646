use crate::registry::ToolRegistry;
use crate::schema::{summarize, validate};
use crate::tool::{HandlerFailure, ToolRequest};
use futures::FutureExt;
use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    UnknownTool,
    InvalidInput,
    HandlerError,
    OutputContractViolation,
}

impl ErrorKind {
    /// True when the failure points at a bug on our side rather than at the caller or upstream.
    pub fn requires_attention(&self) -> bool {
        matches!(self, ErrorKind::OutputContractViolation)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::UnknownTool => "UnknownTool",
            ErrorKind::InvalidInput => "InvalidInput",
            ErrorKind::HandlerError => "HandlerError",
            ErrorKind::OutputContractViolation => "OutputContractViolation",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolFailure {
    pub kind: ErrorKind,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ToolResult {
    Success { payload: Value },
    Failure(ToolFailure),
}

impl ToolResult {
    fn failure(kind: ErrorKind, message: String, details: Option<Value>) -> Self {
        ToolResult::Failure(ToolFailure {
            kind,
            message,
            details,
        })
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ToolResult::Success { .. })
    }

    pub fn failure_kind(&self) -> Option<ErrorKind> {
        match self {
            ToolResult::Success { .. } => None,
            ToolResult::Failure(failure) => Some(failure.kind),
        }
    }
}

/// Runs the validate, invoke, validate pipeline around every tool call.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    registry: Arc<ToolRegistry>,
}

impl Dispatcher {
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Entry point for wire requests; `"arguments": null` counts as `{}`.
    pub async fn dispatch_request(&self, request: ToolRequest) -> ToolResult {
        let arguments = match request.arguments {
            Value::Null => Value::Object(Map::new()),
            arguments => arguments,
        };
        self.dispatch(&request.name, arguments).await
    }

    pub async fn dispatch(&self, name: &str, arguments: Value) -> ToolResult {
        let started = Instant::now();

        let descriptor = match self.registry.lookup(name) {
            Ok(descriptor) => descriptor,
            Err(e) => {
                info!("Rejected call to unknown tool '{}'", name);
                let available: Vec<&str> =
                    self.registry.list().iter().map(|t| t.name.as_str()).collect();
                return ToolResult::failure(
                    ErrorKind::UnknownTool,
                    e.to_string(),
                    Some(json!({ "available_tools": available })),
                );
            }
        };

        let violations = validate(&arguments, &descriptor.input_schema);
        if !violations.is_empty() {
            info!(
                "Rejected arguments for '{}': {}",
                name,
                summarize(&violations)
            );
            return ToolResult::failure(
                ErrorKind::InvalidInput,
                format!("Invalid arguments for '{}': {}", name, summarize(&violations)),
                Some(json!(violations)),
            );
        }

        let outcome = AssertUnwindSafe(descriptor.handler.invoke(arguments))
            .catch_unwind()
            .await;

        let payload = match outcome {
            Ok(Ok(payload)) => payload,
            Ok(Err(failure)) => return handler_failure(name, failure),
            Err(panic) => {
                let failure = HandlerFailure::Panicked(panic_message(panic.as_ref()));
                error!("Tool '{}' panicked: {}", name, failure);
                return handler_failure(name, failure);
            }
        };

        let violations = validate(&payload, &descriptor.output_schema);
        if !violations.is_empty() {
            error!(
                "Tool '{}' broke its output contract ({}); payload: {}",
                name,
                summarize(&violations),
                payload
            );
            return ToolResult::failure(
                ErrorKind::OutputContractViolation,
                format!(
                    "Tool '{}' produced output that violates its declared schema",
                    name
                ),
                Some(json!(violations)),
            );
        }

        info!(
            "Tool '{}' completed in {}ms",
            name,
            started.elapsed().as_millis()
        );
        ToolResult::Success { payload }
    }
}

fn handler_failure(name: &str, failure: HandlerFailure) -> ToolResult {
    warn!("Tool '{}' failed: {}", name, failure);
    ToolResult::failure(
        ErrorKind::HandlerError,
        format!("Tool '{}' failed: {}", name, failure),
        Some(failure.details()),
    )
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
