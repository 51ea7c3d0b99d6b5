use crate::error::{HistoryError, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::env;

/// Environment variable holding the document store connection string
const MONGODB_URI_VAR: &str = "MONGODB_URI";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub store: StoreConfig,
    pub chat: ChatConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    pub database: String,
    pub collection: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    pub default_title: String,
    pub default_system_prompt: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl Settings {
    /// Load `config/{CONFIG_ENV}` (optional) layered under `APP__*` variables
    pub fn new() -> Result<Self> {
        let config_env = env::var("CONFIG_ENV").unwrap_or_else(|_| "default".to_string());
        Self::load(&format!("config/{}", config_env))
    }

    pub fn load(config_name: &str) -> Result<Self> {
        let config = Config::builder()
            .set_default("store.database", "ai_khichuri")?
            .set_default("store.collection", "history")?
            .set_default("chat.default_title", "New Chat")?
            .set_default("chat.default_system_prompt", "You are a helpful assistant.")?
            .set_default("logging.level", "info")?
            .add_source(File::with_name(config_name).required(false))
            .add_source(Environment::with_prefix("APP").separator("__"))
            .build()?;

        Ok(config.try_deserialize()?)
    }

    /// Connection string for the document store.
    /// Missing or blank is a fatal configuration error.
    pub fn mongodb_uri() -> Result<String> {
        require_uri(env::var(MONGODB_URI_VAR).ok())
    }
}

fn require_uri(value: Option<String>) -> Result<String> {
    match value {
        Some(uri) if !uri.trim().is_empty() => Ok(uri),
        _ => Err(HistoryError::Configuration(format!(
            "{} not found in environment variables",
            MONGODB_URI_VAR
        ))),
    }
}
