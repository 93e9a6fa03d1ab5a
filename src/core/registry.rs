//! Read-only provider registry
//!
//! Built once from configuration at startup and shared behind an `Arc`.
//! Never mutated afterwards, so concurrent reads need no locking.

use std::collections::HashMap;

use crate::config::{ModelConfig, ProviderConfig};
use crate::utils::error::{BridgeError, Result};

/// Static table of providers and their models
#[derive(Debug, Clone)]
pub struct ProviderRegistry {
    providers: HashMap<String, ProviderConfig>,
}

impl ProviderRegistry {
    /// Build the registry from configured providers
    pub fn from_config(providers: &[ProviderConfig]) -> Result<Self> {
        let mut map = HashMap::with_capacity(providers.len());
        for provider in providers {
            if map
                .insert(provider.name.clone(), provider.clone())
                .is_some()
            {
                return Err(BridgeError::config(format!(
                    "duplicate provider: {}",
                    provider.name
                )));
            }
        }
        Ok(Self { providers: map })
    }

    /// Look up a provider by exact name
    pub fn provider(&self, name: &str) -> Option<&ProviderConfig> {
        self.providers.get(name)
    }

    /// Look up a model within a provider, both by exact name
    pub fn model(&self, provider: &str, model: &str) -> Option<&ModelConfig> {
        self.providers.get(provider)?.models.get(model)
    }

    /// Iterate all providers
    pub fn providers(&self) -> impl Iterator<Item = &ProviderConfig> {
        self.providers.values()
    }

    /// All `provider/model` identifiers, sorted
    pub fn model_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .providers
            .values()
            .flat_map(|provider| {
                provider
                    .models
                    .keys()
                    .map(|model| format!("{}/{}", provider.name, model))
            })
            .collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}
