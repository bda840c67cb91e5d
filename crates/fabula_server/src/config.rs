//! Server configuration.
//!
//! Loaded with precedence: `fabula.toml` in the working directory, then
//! `FABULA_`-prefixed environment variables. Secrets (the database URL and
//! the model API key) are usually supplied through the environment; a
//! `.env` file is honored when present.

use config::{Config, Environment, File};
use fabula_error::{ConfigError, FabulaResult};
use serde::Deserialize;
use std::time::Duration;

fn default_bind_addr() -> String {
    "0.0.0.0:8000".to_string()
}

fn default_worker_count() -> usize {
    4
}

fn default_queue_capacity() -> usize {
    64
}

fn default_lock_ttl_secs() -> u64 {
    2000
}

fn default_model_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_standard_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_premium_model() -> String {
    "o1-mini".to_string()
}

fn default_image_model() -> String {
    "dall-e-3".to_string()
}

fn default_media_root() -> String {
    "./media".to_string()
}

fn default_media_base_url() -> String {
    "http://localhost:8000/media".to_string()
}

/// Model provider connection settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ModelConfig {
    /// Base URL of the OpenAI-compatible endpoint
    #[serde(default = "default_model_base_url")]
    pub base_url: String,
    /// API key, usually set as `FABULA_MODEL__API_KEY`
    #[serde(default)]
    pub api_key: String,
    /// Model for the standard tier
    #[serde(default = "default_standard_model")]
    pub standard_model: String,
    /// Model for the premium tier
    #[serde(default = "default_premium_model")]
    pub premium_model: String,
    /// Model for image generation
    #[serde(default = "default_image_model")]
    pub image_model: String,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            base_url: default_model_base_url(),
            api_key: String::new(),
            standard_model: default_standard_model(),
            premium_model: default_premium_model(),
            image_model: default_image_model(),
        }
    }
}

/// Media storage settings.
#[derive(Debug, Clone, Deserialize)]
pub struct MediaConfig {
    /// Directory generated images are written to
    #[serde(default = "default_media_root")]
    pub root: String,
    /// Public base URL the media directory is served from
    #[serde(default = "default_media_base_url")]
    pub public_base_url: String,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            root: default_media_root(),
            public_base_url: default_media_base_url(),
        }
    }
}

/// Top-level server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct FabulaConfig {
    /// Address the HTTP server binds to
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
    /// Postgres connection URL; falls back to the `DATABASE_URL`
    /// environment variable when unset
    #[serde(default)]
    pub database_url: Option<String>,
    /// Number of worker tasks draining the generation queue
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,
    /// Buffer capacity of the in-process task queue
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    /// Generation lock lifetime in seconds
    #[serde(default = "default_lock_ttl_secs")]
    pub lock_ttl_secs: u64,
    /// Model provider settings
    #[serde(default)]
    pub model: ModelConfig,
    /// Media storage settings
    #[serde(default)]
    pub media: MediaConfig,
}

impl FabulaConfig {
    /// Load configuration: optional `fabula.toml`, then `FABULA_`
    /// environment overrides (`__` separates nesting levels).
    #[tracing::instrument]
    pub fn load() -> FabulaResult<Self> {
        Config::builder()
            .add_source(File::with_name("fabula").required(false))
            .add_source(Environment::with_prefix("FABULA").separator("__"))
            .build()
            .map_err(|e| ConfigError::new(format!("failed to build configuration: {e}")))?
            .try_deserialize()
            .map_err(|e| ConfigError::new(format!("failed to parse configuration: {e}")).into())
    }

    /// The database URL, preferring the config value over `DATABASE_URL`.
    pub fn database_url(&self) -> FabulaResult<String> {
        if let Some(url) = &self.database_url {
            return Ok(url.clone());
        }
        std::env::var("DATABASE_URL")
            .map_err(|_| ConfigError::new("DATABASE_URL not set and database_url absent").into())
    }

    /// The generation lock TTL as a [`Duration`].
    pub fn lock_ttl(&self) -> Duration {
        Duration::from_secs(self.lock_ttl_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_fill_missing_fields() {
        let config: FabulaConfig = toml_config("");
        assert_eq!(config.bind_addr, "0.0.0.0:8000");
        assert_eq!(config.worker_count, 4);
        assert_eq!(config.lock_ttl(), Duration::from_secs(2000));
        assert_eq!(config.model.standard_model, "gpt-4o-mini");
        assert_eq!(config.media.root, "./media");
    }

    #[test]
    fn test_file_values_override_defaults() {
        let config = toml_config(
            r#"
            bind_addr = "127.0.0.1:9000"
            worker_count = 8

            [model]
            premium_model = "o3"

            [media]
            root = "/var/lib/fabula/media"
            "#,
        );
        assert_eq!(config.bind_addr, "127.0.0.1:9000");
        assert_eq!(config.worker_count, 8);
        assert_eq!(config.model.premium_model, "o3");
        // Unset nested fields keep their defaults.
        assert_eq!(config.model.standard_model, "gpt-4o-mini");
        assert_eq!(config.media.root, "/var/lib/fabula/media");
    }

    fn toml_config(source: &str) -> FabulaConfig {
        Config::builder()
            .add_source(config::File::from_str(source, config::FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }
}
