//! Shared test fixtures
#![allow(dead_code)]

use std::collections::HashMap;

use llm_bridge::config::{AuthConfig, Config, ModelConfig, ProviderConfig};
use llm_bridge::core::adapters::AdapterKind;

pub const ACCESS_KEY: &str = "sk-bridge-test";

/// Provider pointing at a test double
pub fn provider(
    name: &str,
    endpoint: &str,
    models: HashMap<String, ModelConfig>,
) -> ProviderConfig {
    ProviderConfig {
        name: name.to_string(),
        base_url: endpoint.to_string(),
        api_key: "sk-upstream".to_string(),
        requires_proxy: false,
        adapter: AdapterKind::OpenAiCompatible,
        models,
    }
}

/// Single-model provider with default model settings
pub fn simple_provider(name: &str, endpoint: &str, model: &str) -> ProviderConfig {
    provider(
        name,
        endpoint,
        HashMap::from([(model.to_string(), ModelConfig::default())]),
    )
}

/// Config with one access key and the given providers
pub fn config(providers: Vec<ProviderConfig>) -> Config {
    Config {
        auth: AuthConfig {
            access_keys: vec![ACCESS_KEY.to_string()],
        },
        providers,
        ..Config::default()
    }
}
