//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::net::SocketAddr;
use tracing::Level;

/// The Gemini OpenAI-compatibility endpoint used when no base URL is set.
const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/openai";

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub log_level: Level,
    /// Fallback credential used when a request carries no `x-api-key`
    /// header. Optional: without it, requests without a key share the
    /// anonymous namespace and cannot dispatch pipelines.
    pub gemini_api_key: Option<String>,
    pub llm_model: String,
    pub llm_api_base: String,
    /// Upper bound on scraped page content folded into a stage prompt.
    pub scrape_max_chars: usize,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        // --- Load Server Settings ---
        let bind_address_str =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
        let bind_address = bind_address_str.parse::<SocketAddr>().map_err(|e| {
            ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string())
        })?;

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        // --- Load the fallback API key (as optional) ---
        let gemini_api_key = std::env::var("GEMINI_API_KEY")
            .ok()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty());

        // --- Load Adapter-specific Settings ---
        let llm_model =
            std::env::var("LLM_MODEL").unwrap_or_else(|_| "gemini-2.5-flash".to_string());
        let llm_api_base =
            std::env::var("LLM_API_BASE").unwrap_or_else(|_| DEFAULT_API_BASE.to_string());

        let scrape_max_chars = match std::env::var("SCRAPE_MAX_CHARS") {
            Ok(raw) => raw.parse::<usize>().map_err(|_| {
                ConfigError::InvalidValue(
                    "SCRAPE_MAX_CHARS".to_string(),
                    format!("'{}' is not a number", raw),
                )
            })?,
            Err(_) => 8000,
        };

        Ok(Self {
            bind_address,
            log_level,
            gemini_api_key,
            llm_model,
            llm_api_base,
            scrape_max_chars,
        })
    }
}
