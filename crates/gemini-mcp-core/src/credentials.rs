use crate::config::ConfigError;
use std::env;
use std::fmt;

pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

/// The Gemini API key, resolved once at startup and handed to the client.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiCredentials {
    api_key: String,
}

impl ApiCredentials {
    pub fn new(api_key: impl Into<String>) -> Result<Self, ConfigError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(ConfigError::MissingApiKey);
        }
        Ok(Self {
            api_key: api_key.trim().to_string(),
        })
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = lookup(API_KEY_ENV).ok_or(ConfigError::MissingApiKey)?;
        Self::new(api_key)
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }
}

impl fmt::Debug for ApiCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiCredentials")
            .field("api_key", &"<redacted>")
            .finish()
    }
}
