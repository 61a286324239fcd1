//! Configuration for the tether publisher.

use std::time::Duration;

use anyhow::{Context, Result};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use tether_broker::{AccessToken, ClientConfig, EventType, FlowId};
use tether_exec::{RetryPolicy, DEFAULT_MAX_ATTEMPTS};

const CONFIG_FILE: &str = "tether.toml";

/// Publisher configuration with defaults, file, and environment overrides.
///
/// Configuration is loaded in priority order:
/// 1. Environment variables (highest priority)
/// 2. Configuration file (`tether.toml`)
/// 3. Built-in defaults (lowest priority)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Base URL of the event broker.
    ///
    /// Environment variable: `BROKER_URL`
    #[serde(default = "default_broker_url", alias = "BROKER_URL")]
    pub broker_url: String,
    /// Bearer token for the broker.
    ///
    /// Environment variable: `BROKER_TOKEN`
    #[serde(default, alias = "BROKER_TOKEN", skip_serializing)]
    pub broker_token: String,
    /// Event type the events are published to.
    ///
    /// Environment variable: `EVENT_TYPE`
    #[serde(default, alias = "EVENT_TYPE")]
    pub event_type: String,
    /// Attempts per publish call, including the first.
    ///
    /// Environment variable: `MAX_ATTEMPTS`
    #[serde(default = "default_max_attempts", alias = "MAX_ATTEMPTS")]
    pub max_attempts: u32,
    /// Timeout of a single HTTP request in milliseconds.
    ///
    /// Environment variable: `REQUEST_TIMEOUT_MS`
    #[serde(default = "default_request_timeout_ms", alias = "REQUEST_TIMEOUT_MS")]
    pub request_timeout_ms: u64,
    /// Flow id to send; a random one is generated when unset.
    ///
    /// Environment variable: `FLOW_ID`
    #[serde(default, alias = "FLOW_ID")]
    pub flow_id: Option<String>,
    /// Log filter directives.
    ///
    /// Environment variable: `RUST_LOG`
    #[serde(default = "default_log_level", alias = "RUST_LOG")]
    pub rust_log: String,
}

impl Config {
    /// Load configuration from defaults, config file, and environment
    /// variable overrides, then validate it.
    pub fn load() -> Result<Self> {
        let figment = Figment::new()
            .merge(Serialized::defaults(Self::default()))
            .merge(Toml::file(CONFIG_FILE))
            .merge(Env::prefixed(""));

        let config: Self = figment.extract().context("Failed to load configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Convert to broker client configuration.
    pub fn to_client_config(&self) -> ClientConfig {
        ClientConfig {
            base_url: self.broker_url.clone(),
            timeout: Duration::from_millis(self.request_timeout_ms),
            ..ClientConfig::default()
        }
    }

    /// Convert to retry policy.
    pub fn to_retry_policy(&self) -> Result<RetryPolicy> {
        RetryPolicy::new(self.max_attempts).context("Invalid max_attempts")
    }

    /// Token used to authenticate against the broker.
    pub fn access_token(&self) -> AccessToken {
        AccessToken::new(self.broker_token.clone())
    }

    /// Event type to publish to.
    pub fn event_type(&self) -> EventType {
        EventType::new(self.event_type.clone())
    }

    /// Configured flow id, or a fresh random one.
    pub fn flow_id(&self) -> FlowId {
        self.flow_id.clone().map_or_else(FlowId::random, FlowId::from)
    }

    /// Validate configuration values.
    fn validate(&self) -> Result<()> {
        if self.broker_url.trim().is_empty() {
            anyhow::bail!("broker_url must not be empty");
        }

        if self.broker_token.is_empty() {
            anyhow::bail!("broker_token must be set");
        }

        if self.event_type.trim().is_empty() {
            anyhow::bail!("event_type must not be empty");
        }

        if self.max_attempts == 0 {
            anyhow::bail!("max_attempts must be greater than 0");
        }

        if self.request_timeout_ms == 0 {
            anyhow::bail!("request_timeout_ms must be greater than 0");
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            broker_url: default_broker_url(),
            broker_token: String::new(),
            event_type: String::new(),
            max_attempts: default_max_attempts(),
            request_timeout_ms: default_request_timeout_ms(),
            flow_id: None,
            rust_log: default_log_level(),
        }
    }
}

fn default_broker_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_max_attempts() -> u32 {
    DEFAULT_MAX_ATTEMPTS
}

fn default_request_timeout_ms() -> u64 {
    10_000
}

fn default_log_level() -> String {
    "info,tether=debug".to_string()
}
