pub mod direct_call;
pub mod dispatcher;
mod json_text;
pub mod registry;
pub mod schema;
pub mod tool;
pub mod websearch;

pub use direct_call::{GeminiCallTool, CALL_TOOL_NAME};
pub use dispatcher::{Dispatcher, ErrorKind, ToolFailure, ToolResult};
pub use registry::{build_registry, RegistryError, ToolRegistry};
pub use schema::{validate, Violation, ViolationReason};
pub use tool::{HandlerFailure, ToolDescriptor, ToolHandler, ToolInfo, ToolRequest};
pub use websearch::{GeminiWebSearchTool, WEBSEARCH_TOOL_NAME};
