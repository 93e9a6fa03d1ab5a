//! # llm-bridge
//!
//! An OpenAI-compatible chat-completion gateway that forwards to multiple,
//! format-incompatible LLM providers.
//!
//! Callers address models as `"provider/model"`. The router resolves that
//! identifier against a config-driven provider registry, a per-family
//! adapter translates the request (including declarative per-model
//! parameter rules) and performs the outbound call, and responses come
//! back in one unified shape, whether as a single JSON body or as an
//! SSE/WebSocket chunk stream.
//!
//! ## Running the gateway
//!
//! ```rust,no_run
//! use llm_bridge::{Config, HttpServer};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_file("config/gateway.yaml").await?;
//!     HttpServer::new(config)?.start().await?;
//!     Ok(())
//! }
//! ```

#![warn(clippy::all)]

pub mod config;
pub mod core;
pub mod server;
pub mod utils;

pub use crate::config::Config;
pub use crate::core::registry::ProviderRegistry;
pub use crate::core::router::Router;
pub use crate::core::types::{
    ChatCompletionChunk, ChatCompletionRequest, ChatCompletionResponse, ChatMessage,
    MessageContent, MessageRole,
};
pub use crate::server::HttpServer;
pub use crate::utils::error::{BridgeError, Result};
