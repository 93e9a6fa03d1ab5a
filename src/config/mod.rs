//! Configuration management
//!
//! One immutable `Config` value is constructed at startup (YAML file plus
//! environment overrides for secrets) and passed by reference into the
//! router and server constructors. Request-handling code never reads the
//! environment.

pub mod models;

pub use models::{
    AuthConfig, CorsConfig, LogFormat, LoggingConfig, ModelConfig, ProviderConfig, ProxyConfig,
    ServerConfig,
};

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use url::Url;

use crate::utils::error::{BridgeError, Result};

/// Root configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub proxy: ProxyConfig,
    pub logging: LoggingConfig,
    pub providers: Vec<ProviderConfig>,
}

impl Config {
    /// Load configuration from a YAML file, apply environment overrides,
    /// and validate
    pub async fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|err| {
            BridgeError::config(format!("failed to read config file {path:?}: {err}"))
        })?;

        let mut config: Config = serde_yaml::from_str(&content)
            .map_err(|err| BridgeError::config(format!("failed to parse config: {err}")))?;

        config.apply_env_overrides();
        config.validate()?;

        debug!(providers = config.providers.len(), "configuration loaded");
        Ok(config)
    }

    /// Fill secrets from the environment
    ///
    /// `{NAME}_API_KEY` overrides a provider's upstream key (name upper
    /// cased, `-` mapped to `_`); `ACCESS_API_KEYS` extends the inbound
    /// access-key set, comma-separated.
    pub fn apply_env_overrides(&mut self) {
        for provider in &mut self.providers {
            let env_key = format!(
                "{}_API_KEY",
                provider.name.to_uppercase().replace('-', "_")
            );
            if let Ok(key) = std::env::var(&env_key) {
                if !key.is_empty() {
                    provider.api_key = key;
                }
            }
        }

        if let Ok(keys) = std::env::var("ACCESS_API_KEYS") {
            for key in keys.split(',').map(str::trim).filter(|k| !k.is_empty()) {
                if !self.auth.is_valid_key(key) {
                    self.auth.access_keys.push(key.to_string());
                }
            }
        }
    }

    /// Validate the configuration
    ///
    /// Everything that would otherwise fail deep in a request path is
    /// rejected here: empty names, invalid URLs, zero limits, duplicate
    /// providers, providers without models.
    pub fn validate(&self) -> Result<()> {
        let mut seen = std::collections::HashSet::new();

        for provider in &self.providers {
            if provider.name.is_empty() {
                return Err(BridgeError::config("provider name must not be empty"));
            }
            if provider.name.contains('/') {
                return Err(BridgeError::config(format!(
                    "provider name {:?} must not contain '/'",
                    provider.name
                )));
            }
            if !seen.insert(provider.name.as_str()) {
                return Err(BridgeError::config(format!(
                    "duplicate provider: {}",
                    provider.name
                )));
            }
            Url::parse(&provider.base_url).map_err(|err| {
                BridgeError::config(format!(
                    "provider {} has invalid base_url {:?}: {err}",
                    provider.name, provider.base_url
                ))
            })?;
            if provider.models.is_empty() {
                return Err(BridgeError::config(format!(
                    "provider {} has no models",
                    provider.name
                )));
            }
            if provider.requires_proxy && self.proxy.url.is_none() {
                return Err(BridgeError::config(format!(
                    "provider {} requires a proxy but no proxy url is configured",
                    provider.name
                )));
            }
            for (model_name, model) in &provider.models {
                if model_name.is_empty() {
                    return Err(BridgeError::config(format!(
                        "provider {} has a model with an empty name",
                        provider.name
                    )));
                }
                if model.max_tokens == 0 {
                    return Err(BridgeError::config(format!(
                        "model {}/{model_name}: max_tokens must be positive",
                        provider.name
                    )));
                }
                if model.timeout_seconds == 0 {
                    return Err(BridgeError::config(format!(
                        "model {}/{model_name}: timeout_seconds must be positive",
                        provider.name
                    )));
                }
            }
        }

        if let Some(proxy_url) = &self.proxy.url {
            Url::parse(proxy_url).map_err(|err| {
                BridgeError::config(format!("invalid proxy url {proxy_url:?}: {err}"))
            })?;
        }

        if self.auth.access_keys.is_empty() {
            warn!("no access keys configured; all inbound requests will be rejected");
        }

        Ok(())
    }
}
