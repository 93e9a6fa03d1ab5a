//! OpenAI-compatible wire adapter
//!
//! One adapter covers every provider speaking the OpenAI chat-completions
//! format; per-model divergences are handled by parameter rules, not by
//! new adapter code.

use std::time::Duration;

use serde_json::{Map, Value, json};
use uuid::Uuid;

use super::sse::{OpenAiCompatibleTransformer, SseChunkStream};
use crate::config::{ModelConfig, ProviderConfig};
use crate::core::types::{ChatCompletionRequest, ChatCompletionResponse};
use crate::utils::error::{BridgeError, Result};

/// Outbound HTTP request descriptor
///
/// Carries everything needed to perform the upstream call: endpoint,
/// provider credential (never the caller's access key), the model's
/// timeout, and the fully transformed JSON body.
#[derive(Debug, Clone)]
pub struct OutboundRequest {
    pub provider: String,
    pub url: String,
    pub api_key: String,
    pub timeout: Duration,
    pub body: Map<String, Value>,
}

/// Adapter for the OpenAI-compatible wire family
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenAiCompatibleAdapter;

impl OpenAiCompatibleAdapter {
    /// Build the outbound request descriptor for a resolved model
    ///
    /// The upstream sees the bare model name, never the `provider/model`
    /// identifier. `max_tokens` defaults from the model table when the
    /// caller did not supply one; passthrough fields never override what
    /// the bridge set. Parameter rules run last, over the merged payload.
    pub fn build_request(
        &self,
        request: &ChatCompletionRequest,
        provider: &ProviderConfig,
        model_cfg: &ModelConfig,
        model_name: &str,
    ) -> Result<OutboundRequest> {
        let mut payload = Map::new();
        payload.insert("model".into(), json!(model_name));
        payload.insert("messages".into(), serde_json::to_value(&request.messages)?);
        payload.insert("stream".into(), json!(request.stream));
        if let Some(temperature) = request.temperature {
            payload.insert("temperature".into(), json!(temperature));
        }
        if let Some(top_p) = request.top_p {
            payload.insert("top_p".into(), json!(top_p));
        }
        payload.insert(
            "max_tokens".into(),
            json!(request.max_tokens.unwrap_or(model_cfg.max_tokens)),
        );
        for (key, value) in &request.extra {
            payload.entry(key.clone()).or_insert_with(|| value.clone());
        }

        let body = model_cfg.param_rules.apply(&payload);

        Ok(OutboundRequest {
            provider: provider.name.clone(),
            url: provider.base_url.clone(),
            api_key: provider.api_key.clone(),
            timeout: Duration::from_secs(model_cfg.timeout_seconds),
            body,
        })
    }

    /// Execute a non-streaming call
    ///
    /// Single upstream attempt; every failure is normalized before it
    /// crosses back to the router.
    pub async fn call(
        &self,
        client: &reqwest::Client,
        outbound: OutboundRequest,
    ) -> Result<ChatCompletionResponse> {
        let response = client
            .post(&outbound.url)
            .bearer_auth(&outbound.api_key)
            .timeout(outbound.timeout)
            .json(&outbound.body)
            .send()
            .await
            .map_err(|err| transport_error(&outbound.provider, err))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(upstream_error(&outbound.provider, status.as_u16(), &body));
        }

        let raw: Value = response.json().await.map_err(|err| {
            BridgeError::internal(format!(
                "unparseable response from {}: {err}",
                outbound.provider
            ))
        })?;
        normalize_response(&outbound.provider, raw)
    }

    /// Open a streaming call
    ///
    /// The model timeout bounds connection and response headers; the body
    /// is read incrementally for as long as the upstream keeps producing.
    pub async fn stream(
        &self,
        client: &reqwest::Client,
        outbound: OutboundRequest,
    ) -> Result<SseChunkStream<OpenAiCompatibleTransformer>> {
        let send = client
            .post(&outbound.url)
            .bearer_auth(&outbound.api_key)
            .json(&outbound.body)
            .send();

        let response = tokio::time::timeout(outbound.timeout, send)
            .await
            .map_err(|_| {
                BridgeError::upstream_timeout(
                    &outbound.provider,
                    format!("no response within {}s", outbound.timeout.as_secs()),
                )
            })?
            .map_err(|err| transport_error(&outbound.provider, err))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(upstream_error(&outbound.provider, status.as_u16(), &body));
        }

        Ok(SseChunkStream::new(
            Box::pin(response.bytes_stream()),
            OpenAiCompatibleTransformer::new(&outbound.provider),
        ))
    }
}

fn transport_error(provider: &str, err: reqwest::Error) -> BridgeError {
    if err.is_timeout() {
        BridgeError::upstream_timeout(provider, err.to_string())
    } else {
        BridgeError::network(provider, err.to_string())
    }
}

/// Map a non-2xx upstream response
///
/// The body is parsed best-effort: an OpenAI-style
/// `{"error": {"message": ...}}` yields its message, any other JSON object
/// is kept whole as provider detail, and a non-JSON body falls back to a
/// generic wrapping.
fn upstream_error(provider: &str, status: u16, body: &str) -> BridgeError {
    let detail: Option<Value> = serde_json::from_str(body).ok();
    let message = detail
        .as_ref()
        .and_then(|value| {
            value
                .get("error")
                .and_then(|error| error.get("message"))
                .or_else(|| value.get("message"))
                .and_then(Value::as_str)
        })
        .map(str::to_string)
        .unwrap_or_else(|| {
            if body.trim().is_empty() {
                format!("upstream returned status {status}")
            } else {
                body.trim().to_string()
            }
        });

    if status == 429 {
        BridgeError::upstream_rate_limited(provider, message, detail)
    } else {
        BridgeError::upstream(provider, status, message, detail)
    }
}

/// Normalize a 2xx upstream body into the unified response shape
///
/// Envelope fields some upstreams omit are backfilled; a body without
/// `choices` cannot be represented and is a hard failure.
fn normalize_response(provider: &str, mut raw: Value) -> Result<ChatCompletionResponse> {
    let Some(object) = raw.as_object_mut() else {
        return Err(BridgeError::internal(format!(
            "response from {provider} is not a JSON object"
        )));
    };
    if !object.contains_key("choices") {
        return Err(BridgeError::internal(format!(
            "response from {provider} is missing choices"
        )));
    }

    object
        .entry("id")
        .or_insert_with(|| json!(format!("chatcmpl-{}", Uuid::new_v4())));
    object
        .entry("object")
        .or_insert_with(|| json!("chat.completion"));
    object
        .entry("created")
        .or_insert_with(|| json!(chrono::Utc::now().timestamp()));
    object.entry("model").or_insert_with(|| json!("unknown"));

    serde_json::from_value(raw).map_err(|err| {
        BridgeError::internal(format!("unexpected response shape from {provider}: {err}"))
    })
}
