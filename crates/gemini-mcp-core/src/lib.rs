pub mod config;
pub mod credentials;

pub use config::{Config, ConfigError, GeminiConfig, ServerConfig};
pub use credentials::{ApiCredentials, API_KEY_ENV};
