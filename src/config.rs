use std::collections::HashMap;

use config::{Config as ConfigLib, ConfigBuilder, ConfigError, Environment, builder::DefaultState};
use serde::{Deserialize, Serialize};

use crate::outbound::webhook::http_client::{DEFAULT_MAX_BODY_BYTES, DEFAULT_USER_AGENT};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub delivery: DeliveryConfig,
    #[serde(default)]
    pub subscriptions: SubscriptionsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Transport and backoff settings shared by every delivery.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryConfig {
    pub user_agent: String,
    pub max_response_body_bytes: usize,
    pub backoff_base_ms: u64,
    pub backoff_max_ms: u64,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            max_response_body_bytes: DEFAULT_MAX_BODY_BYTES,
            backoff_base_ms: 1_000,
            backoff_max_ms: 30_000,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubscriptionsConfig {
    /// JSON array of subscription records to serve from memory
    pub seed_file: Option<String>,
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with_sources(None)
    }

    fn load_with_sources(env_vars: Option<HashMap<String, String>>) -> Result<Self, ConfigError> {
        let mut builder = Self::set_defaults()?;
        // If env_vars is provided, we use it instead of system environment
        // This is to avoid systems variables pollution across tests
        if let Some(vars) = env_vars {
            for (key, value) in vars {
                builder = builder.set_override(&key, value)?;
            }
        } else {
            // Use system environment variables
            // e.g. APP_SERVER__PORT or APP_DELIVERY__BACKOFF_BASE_MS
            builder = builder.add_source(
                Environment::with_prefix("APP")
                    .prefix_separator("_")
                    .separator("__"),
            );
        }

        builder.build()?.try_deserialize()
    }

    /// Set default values for the configuration.
    /// This is used when no environment variables or config file are provided
    fn set_defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        let delivery = DeliveryConfig::default();

        ConfigLib::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 3000)?
            .set_default("delivery.user_agent", delivery.user_agent)?
            .set_default(
                "delivery.max_response_body_bytes",
                delivery.max_response_body_bytes as u64,
            )?
            .set_default("delivery.backoff_base_ms", delivery.backoff_base_ms)?
            .set_default("delivery.backoff_max_ms", delivery.backoff_max_ms)
    }
}
