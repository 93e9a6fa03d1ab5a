//! Configuration models

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::core::adapters::AdapterKind;
use crate::core::transform::ParamRules;

/// Server binding configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address
    pub host: String,
    /// Bind port
    pub port: u16,
    /// CORS settings
    pub cors: CorsConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            cors: CorsConfig::default(),
        }
    }
}

/// CORS configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CorsConfig {
    pub enabled: bool,
    /// Allowed origins; `*` allows any origin
    pub allowed_origins: Vec<String>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            allowed_origins: vec!["*".to_string()],
        }
    }
}

impl CorsConfig {
    pub fn allows_all_origins(&self) -> bool {
        self.allowed_origins.iter().any(|origin| origin == "*")
    }
}

/// Inbound access-key configuration
///
/// Keys listed here (or in the `ACCESS_API_KEYS` env var, comma-separated)
/// authenticate callers of the bridge. They are unrelated to the per
/// provider upstream credentials.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub access_keys: Vec<String>,
}

impl AuthConfig {
    pub fn is_valid_key(&self, key: &str) -> bool {
        self.access_keys.iter().any(|known| known == key)
    }
}

/// Outbound proxy configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    /// Proxy URL (`socks5://` or `http://`) used for providers with
    /// `requires_proxy` set
    pub url: Option<String>,
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Text,
    Json,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text,
        }
    }
}

/// One upstream provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Provider name; the left side of `provider/model` identifiers
    pub name: String,
    /// Full chat-completions endpoint URL
    pub base_url: String,
    /// Upstream API key; overridden by `{NAME}_API_KEY` env var at load
    #[serde(default)]
    pub api_key: String,
    /// Route outbound calls through the configured proxy
    #[serde(default)]
    pub requires_proxy: bool,
    /// Wire-format family
    pub adapter: AdapterKind,
    /// Models served by this provider, keyed by upstream model name
    pub models: HashMap<String, ModelConfig>,
}

/// Per-model settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Default `max_tokens` when the caller does not supply one
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Outbound call timeout
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
    /// Parameter rules applied to the outbound payload
    #[serde(default)]
    pub param_rules: ParamRules,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            max_tokens: default_max_tokens(),
            timeout_seconds: default_timeout_seconds(),
            param_rules: ParamRules::default(),
        }
    }
}

fn default_max_tokens() -> u32 {
    4096
}

fn default_timeout_seconds() -> u64 {
    600
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_config_defaults() {
        let config: ModelConfig = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config.max_tokens, 4096);
        assert_eq!(config.timeout_seconds, 600);
        assert!(config.param_rules.is_empty());
    }

    #[test]
    fn provider_config_deserializes_with_param_rules() {
        let yaml = r#"
name: deepseek
base_url: https://api.deepseek.com/chat/completions
adapter: openai_compatible
models:
  deepseek-chat: {}
  deepseek-reasoner:
    max_tokens: 8192
    timeout_seconds: 300
    param_rules:
      update:
        temperature: 0.6
      rename:
        max_tokens: max_reasoning_token
"#;
        let config: ProviderConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.name, "deepseek");
        assert!(!config.requires_proxy);
        assert_eq!(config.models.len(), 2);

        let reasoner = &config.models["deepseek-reasoner"];
        assert_eq!(reasoner.max_tokens, 8192);
        assert_eq!(
            reasoner.param_rules.rename["max_tokens"],
            "max_reasoning_token"
        );
    }

    #[test]
    fn unknown_adapter_kind_fails_at_deserialization() {
        let yaml = r#"
name: x
base_url: https://example.com
adapter: carrier_pigeon
models:
  m: {}
"#;
        assert!(serde_yaml::from_str::<ProviderConfig>(yaml).is_err());
    }

    #[test]
    fn auth_config_matches_exact_keys_only() {
        let auth = AuthConfig {
            access_keys: vec!["sk-alpha".into()],
        };
        assert!(auth.is_valid_key("sk-alpha"));
        assert!(!auth.is_valid_key("sk-Alpha"));
        assert!(!auth.is_valid_key(""));
    }
}
