//! Unified request/response types shared across the bridge
//!
//! The inbound surface is OpenAI-compatible; upstream responses are
//! normalized back into these shapes regardless of provider.

pub mod chat;
pub mod responses;

pub use chat::{ChatCompletionRequest, ChatMessage, MessageContent, MessageRole};
pub use responses::{
    ChatChoice, ChatCompletionChunk, ChatCompletionResponse, ChatDelta, ChunkChoice,
    ResponseMessage, Usage,
};
