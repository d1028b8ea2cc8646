use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LlmError {
    #[error("Network error talking to Gemini: {0}")]
    Network(String),

    #[error("Gemini request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("Gemini rejected the API key (status {status}): {details}")]
    Authentication { status: u16, details: String },

    #[error("Gemini rate limit exceeded: {details}")]
    RateLimited { details: String },

    #[error("Gemini rejected the request (status {status}): {details}")]
    InvalidRequest { status: u16, details: String },

    #[error("Gemini server error (status {status}): {details}")]
    Server { status: u16, details: String },

    #[error("Unexpected Gemini response status {status}: {details}")]
    Unknown { status: u16, details: String },

    #[error(
        "Gemini returned no text (finish reason: {})",
        finish_reason.as_deref().unwrap_or("unknown")
    )]
    EmptyResponse { finish_reason: Option<String> },

    #[error("Failed to parse Gemini response: {0}")]
    ResponseParsing(String),
}

impl LlmError {
    /// Maps a non-success HTTP status from the Gemini API onto an error.
    pub fn from_status(status: u16, details: String) -> Self {
        match status {
            401 | 403 => LlmError::Authentication { status, details },
            429 => LlmError::RateLimited { details },
            400 | 404 => LlmError::InvalidRequest { status, details },
            500..=599 => LlmError::Server { status, details },
            _ => LlmError::Unknown { status, details },
        }
    }

    pub fn from_transport(error: reqwest::Error, timeout_secs: u64) -> Self {
        if error.is_timeout() {
            LlmError::Timeout { timeout_secs }
        } else {
            LlmError::Network(error.to_string())
        }
    }

    /// Returns true if repeating the same request later could succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            LlmError::Network(_) => true,
            LlmError::Timeout { .. } => true,
            LlmError::RateLimited { .. } => true,
            LlmError::Server { .. } => true,
            LlmError::Authentication { .. } => false,
            LlmError::InvalidRequest { .. } => false,
            LlmError::Unknown { .. } => false,
            LlmError::EmptyResponse { .. } => false,
            LlmError::ResponseParsing(_) => false,
        }
    }
}
