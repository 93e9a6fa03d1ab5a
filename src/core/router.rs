//! Request routing
//!
//! The router is a pure selection/composition layer: it resolves the
//! `provider/model` identifier against the registry, picks the adapter for
//! the provider's wire family, and returns the normalized result. It holds
//! no provider-specific knowledge; new providers are added through registry
//! data, not router changes.

use std::sync::Arc;
use std::time::Instant;

use tracing::{info, warn};

use crate::config::{Config, ModelConfig, ProviderConfig, ProxyConfig};
use crate::core::adapters::{Adapter, ChunkStream};
use crate::core::model_id::ModelIdentifier;
use crate::core::registry::ProviderRegistry;
use crate::core::types::{ChatCompletionRequest, ChatCompletionResponse};
use crate::utils::error::{BridgeError, Result};

/// Registry entries resolved from one identifier
#[derive(Debug)]
pub struct Resolved<'a> {
    pub provider: &'a ProviderConfig,
    pub model: &'a ModelConfig,
    /// Bare model name sent upstream
    pub model_name: &'a str,
}

/// Router over the provider registry
///
/// Both HTTP clients are built once at construction; providers flagged
/// `requires_proxy` use the proxied one.
pub struct Router {
    registry: Arc<ProviderRegistry>,
    client: reqwest::Client,
    proxied_client: reqwest::Client,
}

impl Router {
    /// Create a router over an existing registry
    pub fn new(registry: Arc<ProviderRegistry>, proxy: &ProxyConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|err| BridgeError::config(format!("failed to build http client: {err}")))?;

        let proxied_client = match &proxy.url {
            Some(url) => {
                let proxy = reqwest::Proxy::all(url).map_err(|err| {
                    BridgeError::config(format!("invalid proxy url {url:?}: {err}"))
                })?;
                reqwest::Client::builder()
                    .proxy(proxy)
                    .build()
                    .map_err(|err| {
                        BridgeError::config(format!("failed to build proxied http client: {err}"))
                    })?
            }
            None => client.clone(),
        };

        Ok(Self {
            registry,
            client,
            proxied_client,
        })
    }

    /// Create a router directly from configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        let registry = Arc::new(ProviderRegistry::from_config(&config.providers)?);
        Self::new(registry, &config.proxy)
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    /// Resolve a raw identifier against the registry
    ///
    /// Runs before any network call; a failure here never costs upstream
    /// traffic. Matching is exact, with no fallback or fuzzy matching.
    pub fn resolve(&self, raw: &str) -> Result<Resolved<'_>> {
        let id = ModelIdentifier::parse(raw)?;
        let provider = self
            .registry
            .provider(&id.provider)
            .ok_or_else(|| BridgeError::UnknownProvider(id.provider.clone()))?;
        let (model_name, model) =
            provider
                .models
                .get_key_value(&id.model)
                .ok_or_else(|| BridgeError::UnknownModel {
                    provider: id.provider.clone(),
                    model: id.model.clone(),
                })?;
        Ok(Resolved {
            provider,
            model,
            model_name,
        })
    }

    fn client_for(&self, provider: &ProviderConfig) -> &reqwest::Client {
        if provider.requires_proxy {
            &self.proxied_client
        } else {
            &self.client
        }
    }

    /// Dispatch a non-streaming request
    pub async fn dispatch(
        &self,
        request: &ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse> {
        if request.stream {
            return Err(BridgeError::internal(
                "streaming requests must use dispatch_stream",
            ));
        }

        let resolved = self.resolve(&request.model)?;
        let adapter = Adapter::for_kind(resolved.provider.adapter);
        let outbound =
            adapter.build_request(request, resolved.provider, resolved.model, resolved.model_name)?;
        let client = self.client_for(resolved.provider);

        info!(
            provider = %resolved.provider.name,
            model = %resolved.model_name,
            stream = false,
            "request start"
        );
        let started = Instant::now();

        match adapter.call(client, outbound).await {
            Ok(response) => {
                info!(
                    provider = %resolved.provider.name,
                    model = %resolved.model_name,
                    duration_ms = started.elapsed().as_millis() as u64,
                    "request complete"
                );
                Ok(response)
            }
            Err(error) => {
                warn!(
                    provider = %resolved.provider.name,
                    model = %resolved.model_name,
                    status = error.status().as_u16(),
                    error = %error,
                    "request failed"
                );
                Err(error)
            }
        }
    }

    /// Dispatch a streaming request, returning the chunk sequence
    ///
    /// The returned stream is finite and not restartable; the caller is
    /// expected to drive it to exhaustion or drop it to cancel the
    /// upstream call.
    pub async fn dispatch_stream(&self, request: &ChatCompletionRequest) -> Result<ChunkStream> {
        let resolved = self.resolve(&request.model)?;
        let adapter = Adapter::for_kind(resolved.provider.adapter);
        let outbound =
            adapter.build_request(request, resolved.provider, resolved.model, resolved.model_name)?;
        let client = self.client_for(resolved.provider);

        info!(
            provider = %resolved.provider.name,
            model = %resolved.model_name,
            stream = true,
            "request start"
        );

        match adapter.stream(client, outbound).await {
            Ok(stream) => Ok(stream),
            Err(error) => {
                warn!(
                    provider = %resolved.provider.name,
                    model = %resolved.model_name,
                    status = error.status().as_u16(),
                    error = %error,
                    "request failed"
                );
                Err(error)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ModelConfig;
    use crate::core::adapters::AdapterKind;
    use crate::core::types::{ChatMessage, MessageRole};

    fn router() -> Router {
        let provider = ProviderConfig {
            name: "deepseek".into(),
            base_url: "https://api.deepseek.com/chat/completions".into(),
            api_key: "sk-x".into(),
            requires_proxy: false,
            adapter: AdapterKind::OpenAiCompatible,
            models: [
                ("deepseek-chat".to_string(), ModelConfig::default()),
                ("deepseek-reasoner".to_string(), ModelConfig::default()),
            ]
            .into_iter()
            .collect(),
        };
        let registry = Arc::new(ProviderRegistry::from_config(&[provider]).unwrap());
        Router::new(registry, &ProxyConfig::default()).unwrap()
    }

    #[test]
    fn resolve_returns_the_matching_entries() {
        let router = router();
        let resolved = router.resolve("deepseek/deepseek-reasoner").unwrap();
        assert_eq!(resolved.provider.name, "deepseek");
        assert_eq!(resolved.model_name, "deepseek-reasoner");
    }

    #[test]
    fn resolve_classifies_each_failure() {
        let router = router();

        assert!(matches!(
            router.resolve("deepseek-chat").unwrap_err(),
            BridgeError::MalformedIdentifier(_)
        ));
        assert!(matches!(
            router.resolve("/deepseek-chat").unwrap_err(),
            BridgeError::MalformedIdentifier(_)
        ));
        assert!(matches!(
            router.resolve("foo/bar").unwrap_err(),
            BridgeError::UnknownProvider(_)
        ));
        assert!(matches!(
            router.resolve("deepseek/gpt-4o").unwrap_err(),
            BridgeError::UnknownModel { .. }
        ));
    }

    #[tokio::test]
    async fn dispatch_fails_before_any_network_call_for_unknown_provider() {
        let router = router();
        let request = ChatCompletionRequest {
            model: "foo/bar".into(),
            messages: vec![ChatMessage::text(MessageRole::User, "hi")],
            stream: false,
            temperature: None,
            max_tokens: None,
            top_p: None,
            extra: Default::default(),
        };

        let error = router.dispatch(&request).await.unwrap_err();
        assert!(matches!(error, BridgeError::UnknownProvider(_)));
        assert_eq!(error.status().as_u16(), 400);
    }

    #[tokio::test]
    async fn dispatch_rejects_streaming_requests() {
        let router = router();
        let request = ChatCompletionRequest {
            model: "deepseek/deepseek-chat".into(),
            messages: vec![],
            stream: true,
            temperature: None,
            max_tokens: None,
            top_p: None,
            extra: Default::default(),
        };

        assert!(router.dispatch(&request).await.is_err());
    }
}
