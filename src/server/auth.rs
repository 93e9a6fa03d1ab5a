//! Inbound access-key validation
//!
//! The bridge's own access keys gate every API route. They are checked
//! before the router runs and are unrelated to the upstream provider
//! credentials attached by adapters.

use actix_web::HttpRequest;
use actix_web::http::header;

use crate::config::AuthConfig;
use crate::utils::error::{BridgeError, Result};

/// Extract and validate the bearer access key on a request
pub fn validate_access_key(req: &HttpRequest, auth: &AuthConfig) -> Result<()> {
    let value = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| BridgeError::unauthorized("missing Authorization header"))?;

    validate_key_value(value, auth)
}

/// Validate a raw header or message-level key value
///
/// Accepts the key with or without a `Bearer ` prefix; the WebSocket
/// handler passes keys taken from message payloads through here too.
pub fn validate_key_value(value: &str, auth: &AuthConfig) -> Result<()> {
    let key = value.strip_prefix("Bearer ").unwrap_or(value).trim();
    if key.is_empty() {
        return Err(BridgeError::unauthorized("empty access key"));
    }
    if auth.is_valid_key(key) {
        Ok(())
    } else {
        Err(BridgeError::unauthorized("invalid access key"))
    }
}
