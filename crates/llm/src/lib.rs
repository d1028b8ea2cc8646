pub mod error;
pub mod gemini;
pub mod models;

pub use error::LlmError;
pub use gemini::GeminiClient;
pub use models::{GenerateRequest, GenerateResponse, GroundingSource, ModelConfig};

use async_trait::async_trait;

/// A text-generation backend. Tool handlers only see this trait, so tests can
/// substitute a stub for the real provider.
#[async_trait]
pub trait ContentGenerator: Send + Sync {
    async fn generate(&self, request: GenerateRequest) -> Result<GenerateResponse, LlmError>;
}
