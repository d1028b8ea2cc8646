use crate::direct_call::GeminiCallTool;
use crate::tool::{ToolDescriptor, ToolInfo};
use crate::websearch::GeminiWebSearchTool;
use llm::ContentGenerator;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Tool '{0}' is already registered")]
    DuplicateTool(String),

    #[error("Tool '{0}' not found in registry")]
    UnknownTool(String),
}

/// Write-once catalogue of tools, kept in registration order.
#[derive(Debug, Default)]
pub struct ToolRegistry {
    tools: Vec<Arc<ToolDescriptor>>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, descriptor: ToolDescriptor) -> Result<(), RegistryError> {
        if self.index.contains_key(&descriptor.name) {
            return Err(RegistryError::DuplicateTool(descriptor.name));
        }

        self.index.insert(descriptor.name.clone(), self.tools.len());
        self.tools.push(Arc::new(descriptor));
        Ok(())
    }

    pub fn lookup(&self, name: &str) -> Result<Arc<ToolDescriptor>, RegistryError> {
        self.index
            .get(name)
            .and_then(|&position| self.tools.get(position))
            .cloned()
            .ok_or_else(|| RegistryError::UnknownTool(name.to_string()))
    }

    pub fn list(&self) -> &[Arc<ToolDescriptor>] {
        &self.tools
    }

    pub fn discovery(&self) -> Vec<ToolInfo> {
        self.tools.iter().map(|tool| tool.info()).collect()
    }

    pub fn tool_count(&self) -> usize {
        self.tools.len()
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }
}

/// Registers `gemini_websearch` and `gemini_call` on top of one generator.
pub fn build_registry(generator: Arc<dyn ContentGenerator>) -> Result<ToolRegistry, RegistryError> {
    let mut registry = ToolRegistry::new();
    registry.register(GeminiWebSearchTool::new(generator.clone()).descriptor())?;
    registry.register(GeminiCallTool::new(generator).descriptor())?;
    Ok(registry)
}
