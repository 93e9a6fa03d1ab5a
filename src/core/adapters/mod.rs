//! Adapter implementations, one per wire-format family
//!
//! The set of families is closed: a registry entry names one by tag, and
//! the tag is validated when configuration is deserialized, so an unknown
//! adapter can never surface mid-request.

pub mod openai;
pub mod sse;

use std::pin::Pin;

use futures::Stream;
use serde::{Deserialize, Serialize};

use crate::config::{ModelConfig, ProviderConfig};
use crate::core::types::{ChatCompletionChunk, ChatCompletionRequest, ChatCompletionResponse};
use crate::utils::error::Result;

pub use openai::{OpenAiCompatibleAdapter, OutboundRequest};

/// Lazily produced chunk sequence from a streaming call
///
/// Finite and not restartable; a mid-stream failure surfaces as a final
/// `Err` item rather than silent truncation.
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<ChatCompletionChunk>> + Send>>;

/// Wire-format family tag named by provider configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AdapterKind {
    /// OpenAI chat-completions wire format
    #[serde(rename = "openai_compatible", alias = "openai")]
    OpenAiCompatible,
}

/// Polymorphic adapter, selected by `AdapterKind`
#[derive(Debug, Clone, Copy)]
pub enum Adapter {
    OpenAiCompatible(OpenAiCompatibleAdapter),
}

impl Adapter {
    /// Instantiate the adapter for a configured kind
    pub fn for_kind(kind: AdapterKind) -> Self {
        match kind {
            AdapterKind::OpenAiCompatible => Self::OpenAiCompatible(OpenAiCompatibleAdapter),
        }
    }

    /// Build the outbound request descriptor for a resolved model
    pub fn build_request(
        &self,
        request: &ChatCompletionRequest,
        provider: &ProviderConfig,
        model_cfg: &ModelConfig,
        model_name: &str,
    ) -> Result<OutboundRequest> {
        match self {
            Self::OpenAiCompatible(adapter) => {
                adapter.build_request(request, provider, model_cfg, model_name)
            }
        }
    }

    /// Execute a non-streaming call
    pub async fn call(
        &self,
        client: &reqwest::Client,
        outbound: OutboundRequest,
    ) -> Result<ChatCompletionResponse> {
        match self {
            Self::OpenAiCompatible(adapter) => adapter.call(client, outbound).await,
        }
    }

    /// Open a streaming call
    pub async fn stream(
        &self,
        client: &reqwest::Client,
        outbound: OutboundRequest,
    ) -> Result<ChunkStream> {
        match self {
            Self::OpenAiCompatible(adapter) => {
                let stream = adapter.stream(client, outbound).await?;
                Ok(Box::pin(stream))
            }
        }
    }
}
