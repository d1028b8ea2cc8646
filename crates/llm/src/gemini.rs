use crate::error::LlmError;
use crate::models::{GeminiRequest, GeminiResponse, GenerateRequest, GenerateResponse, ModelConfig};
use crate::ContentGenerator;
use anyhow::{Context, Result};
use async_trait::async_trait;
use gemini_mcp_core::ApiCredentials;
use log::{debug, error, info};
use reqwest::Client;
use std::time::Duration;

pub struct GeminiClient {
    client: Client,
    api_key: String,
    config: ModelConfig,
}

impl std::fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl GeminiClient {
    pub fn new(credentials: &ApiCredentials, config: ModelConfig) -> Result<Self> {
        info!("Initializing GeminiClient for model {}", config.model);
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            api_key: credentials.api_key().to_string(),
            config,
        })
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.config.base_url, self.config.model
        )
    }

    async fn send(&self, request: &GenerateRequest) -> Result<GenerateResponse, LlmError> {
        let body = GeminiRequest::new(request, &self.config);

        debug!(
            "Sending generateContent to {} (grounded: {}, json: {})",
            self.config.model, request.grounded, request.json_response
        );
        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::from_transport(e, self.config.timeout_secs))?;

        let status = response.status();
        let response_text = response
            .text()
            .await
            .map_err(|e| LlmError::from_transport(e, self.config.timeout_secs))?;

        if !status.is_success() {
            error!("Gemini API returned {}: {}", status, response_text);
            return Err(LlmError::from_status(status.as_u16(), response_text));
        }

        let parsed: GeminiResponse = serde_json::from_str(&response_text).map_err(|e| {
            error!("Failed to parse Gemini response: {}. Body: {}", e, response_text);
            LlmError::ResponseParsing(e.to_string())
        })?;

        parsed.into_generate_response()
    }
}

#[async_trait]
impl ContentGenerator for GeminiClient {
    async fn generate(&self, request: GenerateRequest) -> Result<GenerateResponse, LlmError> {
        let generated = self.send(&request).await?;
        info!(
            "Received {} chars and {} grounding sources from {}",
            generated.text.len(),
            generated.sources.len(),
            self.config.model
        );
        Ok(generated)
    }
}
