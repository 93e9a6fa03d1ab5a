//! Incremental SSE parsing for upstream chunked responses
//!
//! Upstream bytes arrive in arbitrary slices; the parser buffers until it
//! has complete lines, accumulates multi-line `data:` fields into events,
//! ignores `:` comment/heartbeat lines, and stops at the wire family's end
//! marker. Transformation of event payloads into unified chunks is the
//! only per-family piece.

use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures::Stream;
use serde_json::{Value, json};
use tracing::debug;
use uuid::Uuid;

use crate::core::types::ChatCompletionChunk;
use crate::utils::error::{BridgeError, Result};

/// Per-family transformation of SSE event payloads
pub trait SseTransformer: Send + Sync {
    /// Provider name, for logging and error context
    fn provider_name(&self) -> &str;

    /// Whether this event payload terminates the stream
    fn is_end_marker(&self, data: &str) -> bool {
        data.trim() == "[DONE]"
    }

    /// Turn one event payload into a chunk
    ///
    /// `None` skips the event: a single malformed payload mid-stream is
    /// logged and dropped rather than tearing down the whole response.
    fn transform_event(&self, data: &str) -> Option<ChatCompletionChunk>;
}

/// Transformer for the OpenAI chat-completions stream format
///
/// Each event payload is a `chat.completion.chunk` JSON object; the stream
/// ends with a `[DONE]` payload. Envelope fields some upstreams omit are
/// backfilled so every chunk crossing the bridge carries an id.
#[derive(Debug, Clone)]
pub struct OpenAiCompatibleTransformer {
    provider: String,
}

impl OpenAiCompatibleTransformer {
    pub fn new(provider: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
        }
    }
}

impl SseTransformer for OpenAiCompatibleTransformer {
    fn provider_name(&self) -> &str {
        &self.provider
    }

    fn transform_event(&self, data: &str) -> Option<ChatCompletionChunk> {
        let mut value: Value = match serde_json::from_str(data) {
            Ok(value) => value,
            Err(err) => {
                debug!(provider = %self.provider, error = %err, "skipping unparseable stream event");
                return None;
            }
        };

        if let Some(object) = value.as_object_mut() {
            object
                .entry("id")
                .or_insert_with(|| json!(format!("chatcmpl-{}", Uuid::new_v4())));
            object
                .entry("object")
                .or_insert_with(|| json!("chat.completion.chunk"));
            object
                .entry("created")
                .or_insert_with(|| json!(chrono::Utc::now().timestamp()));
            object.entry("model").or_insert_with(|| json!("unknown"));
        }

        match serde_json::from_value(value) {
            Ok(chunk) => Some(chunk),
            Err(err) => {
                debug!(provider = %self.provider, error = %err, "skipping stream event with unexpected shape");
                None
            }
        }
    }
}

/// Incremental SSE parser
pub struct SseParser<T: SseTransformer> {
    transformer: T,
    buffer: String,
    event_data: Vec<String>,
    done: bool,
}

impl<T: SseTransformer> SseParser<T> {
    pub fn new(transformer: T) -> Self {
        Self {
            transformer,
            buffer: String::new(),
            event_data: Vec::new(),
            done: false,
        }
    }

    /// Whether the end marker has been seen
    pub fn is_done(&self) -> bool {
        self.done
    }

    pub fn transformer(&self) -> &T {
        &self.transformer
    }

    /// Feed raw bytes, returning every chunk completed by them
    ///
    /// Incomplete trailing lines stay buffered for the next call.
    pub fn process_bytes(&mut self, bytes: &[u8]) -> Vec<ChatCompletionChunk> {
        if self.done {
            return Vec::new();
        }
        self.buffer.push_str(&String::from_utf8_lossy(bytes));

        let mut chunks = Vec::new();
        while let Some(pos) = self.buffer.find('\n') {
            let line: String = self.buffer.drain(..=pos).collect();
            let line = line.trim_end_matches(['\n', '\r']);
            if let Some(chunk) = self.process_line(line) {
                chunks.push(chunk);
            }
            if self.done {
                break;
            }
        }
        chunks
    }

    fn process_line(&mut self, line: &str) -> Option<ChatCompletionChunk> {
        // Blank line terminates the current event.
        if line.is_empty() {
            if self.event_data.is_empty() {
                return None;
            }
            let data = self.event_data.join("\n");
            self.event_data.clear();
            if self.transformer.is_end_marker(&data) {
                self.done = true;
                return None;
            }
            return self.transformer.transform_event(&data);
        }

        // Comment / keep-alive line.
        if let Some(comment) = line.strip_prefix(':') {
            debug!(provider = %self.transformer.provider_name(), "sse heartbeat: {}", comment.trim());
            return None;
        }

        if let Some(payload) = line.strip_prefix("data:") {
            self.event_data.push(payload.trim_start().to_string());
        }
        // Other SSE fields (event:, id:, retry:) carry nothing for the
        // chat stream and are dropped.
        None
    }
}

/// Boxed byte stream from the upstream HTTP response
pub type UpstreamByteStream =
    Pin<Box<dyn Stream<Item = std::result::Result<Bytes, reqwest::Error>> + Send>>;

/// Stream adapter turning upstream bytes into unified chunks
///
/// Finite and not restartable. Ends cleanly after the end marker; a
/// transport failure mid-stream yields one final error item and then ends.
pub struct SseChunkStream<T: SseTransformer> {
    inner: UpstreamByteStream,
    parser: SseParser<T>,
    buffered: VecDeque<ChatCompletionChunk>,
    finished: bool,
}

impl<T: SseTransformer> SseChunkStream<T> {
    pub fn new(inner: UpstreamByteStream, transformer: T) -> Self {
        Self {
            inner,
            parser: SseParser::new(transformer),
            buffered: VecDeque::new(),
            finished: false,
        }
    }
}

impl<T: SseTransformer + Unpin> Stream for SseChunkStream<T> {
    type Item = Result<ChatCompletionChunk>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        loop {
            if let Some(chunk) = this.buffered.pop_front() {
                return Poll::Ready(Some(Ok(chunk)));
            }
            if this.finished || this.parser.is_done() {
                return Poll::Ready(None);
            }

            match Pin::new(&mut this.inner).poll_next(cx) {
                Poll::Ready(Some(Ok(bytes))) => {
                    this.buffered.extend(this.parser.process_bytes(&bytes));
                }
                Poll::Ready(Some(Err(err))) => {
                    this.finished = true;
                    let provider = this.parser.transformer().provider_name();
                    let error = if err.is_timeout() {
                        BridgeError::upstream_timeout(provider, err.to_string())
                    } else {
                        BridgeError::network(provider, err.to_string())
                    };
                    return Poll::Ready(Some(Err(error)));
                }
                Poll::Ready(None) => {
                    if !this.parser.buffer.trim().is_empty() {
                        debug!(
                            provider = %this.parser.transformer().provider_name(),
                            "stream ended with incomplete data in buffer"
                        );
                    }
                    this.finished = true;
                    return Poll::Ready(None);
                }
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}
