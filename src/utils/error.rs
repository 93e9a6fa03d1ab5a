//! Error handling for the bridge
//!
//! Every failure that crosses back to a caller is one `BridgeError`
//! variant with a status code drawn from a fixed set: 400, 401, 429,
//! 500, 502. Raw upstream error payloads are carried along as
//! `provider_detail` where available, but never replace the unified shape.

use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use serde_json::{Value, json};
use thiserror::Error;

/// Result type alias for the bridge
pub type Result<T> = std::result::Result<T, BridgeError>;

/// Unified error type
#[derive(Error, Debug, Clone)]
pub enum BridgeError {
    /// Configuration errors (startup only)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Model identifier does not match the `provider/model` grammar
    #[error("Malformed model identifier: {0}")]
    MalformedIdentifier(String),

    /// Provider name not present in the registry
    #[error("Unknown provider: {0}")]
    UnknownProvider(String),

    /// Model name not present in the provider's model table
    #[error("Model {model} not supported by provider {provider}")]
    UnknownModel { provider: String, model: String },

    /// Inbound access key missing or invalid
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Upstream returned 429
    #[error("Rate limited by {provider}: {message}")]
    UpstreamRateLimited {
        provider: String,
        message: String,
        detail: Option<Value>,
    },

    /// Outbound call exceeded the model's configured timeout
    #[error("Timeout calling {provider}: {message}")]
    UpstreamTimeout { provider: String, message: String },

    /// Upstream returned a non-2xx status other than 429
    #[error("Upstream error from {provider} (status {status}): {message}")]
    UpstreamError {
        provider: String,
        status: u16,
        message: String,
        detail: Option<Value>,
    },

    /// Upstream could not be reached at the transport level
    #[error("Network error calling {provider}: {message}")]
    Network { provider: String, message: String },

    /// Anything not otherwise classified
    #[error("Internal error: {0}")]
    Internal(String),
}

impl BridgeError {
    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create an unauthorized error
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized(message.into())
    }

    /// Create an upstream rate-limit error
    pub fn upstream_rate_limited(
        provider: impl Into<String>,
        message: impl Into<String>,
        detail: Option<Value>,
    ) -> Self {
        Self::UpstreamRateLimited {
            provider: provider.into(),
            message: message.into(),
            detail,
        }
    }

    /// Create an upstream timeout error
    pub fn upstream_timeout(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::UpstreamTimeout {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Create an upstream error carrying the upstream status code
    pub fn upstream(
        provider: impl Into<String>,
        status: u16,
        message: impl Into<String>,
        detail: Option<Value>,
    ) -> Self {
        Self::UpstreamError {
            provider: provider.into(),
            status,
            message: message.into(),
            detail,
        }
    }

    /// Create a transport-level network error
    pub fn network(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Network {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Stable machine-readable error kind
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Config(_) => "config_error",
            Self::MalformedIdentifier(_) => "malformed_identifier",
            Self::UnknownProvider(_) => "unknown_provider",
            Self::UnknownModel { .. } => "unknown_model",
            Self::Unauthorized(_) => "unauthorized",
            Self::UpstreamRateLimited { .. } => "upstream_rate_limited",
            Self::UpstreamTimeout { .. } => "upstream_timeout",
            Self::UpstreamError { .. } => "upstream_error",
            Self::Network { .. } => "upstream_error",
            Self::Internal(_) => "internal_error",
        }
    }

    /// Status code returned to the caller
    ///
    /// Always one of 400, 401, 429, 500, 502. Upstream 5xx maps to 502
    /// (bad gateway); any other upstream failure, including timeouts,
    /// maps to 500.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::MalformedIdentifier(_) | Self::UnknownProvider(_) | Self::UnknownModel { .. } => {
                StatusCode::BAD_REQUEST
            }
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::UpstreamRateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::UpstreamError { status, .. } if *status >= 500 => StatusCode::BAD_GATEWAY,
            Self::Network { .. } => StatusCode::BAD_GATEWAY,
            Self::Config(_)
            | Self::UpstreamTimeout { .. }
            | Self::UpstreamError { .. }
            | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Raw upstream error payload, when one was captured
    pub fn provider_detail(&self) -> Option<&Value> {
        match self {
            Self::UpstreamRateLimited { detail, .. } | Self::UpstreamError { detail, .. } => {
                detail.as_ref()
            }
            _ => None,
        }
    }

    /// Unified error body sent to callers, both as HTTP responses and as
    /// terminal frames on streaming connections
    pub fn error_body(&self) -> Value {
        let mut error = json!({
            "message": self.to_string(),
            "type": self.kind(),
            "code": self.status().as_u16(),
        });
        if let Some(detail) = self.provider_detail() {
            error["provider_detail"] = detail.clone();
        }
        json!({ "error": error })
    }
}

impl ResponseError for BridgeError {
    fn status_code(&self) -> StatusCode {
        self.status()
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status()).json(self.error_body())
    }
}

impl From<serde_json::Error> for BridgeError {
    fn from(err: serde_json::Error) -> Self {
        Self::Internal(format!("serialization error: {err}"))
    }
}
