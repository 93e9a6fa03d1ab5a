//! SSE response plumbing
//!
//! Relay frames become `data:` lines on the client connection; the same
//! wire format is reused verbatim for WebSocket text frames.

use actix_web::http::header::{CACHE_CONTROL, CONTENT_TYPE};
use actix_web::{HttpResponse, web};
use async_trait::async_trait;
use futures::stream::Stream;
use tokio::sync::mpsc;
use tracing::error;

use crate::core::relay::{ChunkSink, RelayFrame, SinkClosed};
use crate::utils::error::BridgeError;

/// Channel capacity between the relay and the client connection; the bound
/// is what turns a slow consumer into backpressure on the upstream pull.
pub const SINK_CHANNEL_CAPACITY: usize = 32;

/// A single SSE event
#[derive(Debug, Clone)]
pub struct Event {
    data: String,
}

impl Event {
    pub fn data(data: impl Into<String>) -> Self {
        Self { data: data.into() }
    }

    /// Wire form: a `data:` line followed by a blank line
    pub fn render(&self) -> String {
        format!("data: {}\n\n", self.data)
    }

    pub fn to_bytes(&self) -> web::Bytes {
        web::Bytes::from(self.render())
    }
}

/// Render a relay frame as an SSE event
pub fn frame_event(frame: &RelayFrame) -> Event {
    match frame {
        RelayFrame::Chunk(chunk) => match serde_json::to_string(chunk) {
            Ok(json) => Event::data(json),
            Err(err) => {
                error!(error = %err, "failed to serialize chunk");
                Event::data(
                    BridgeError::internal("chunk serialization failed")
                        .error_body()
                        .to_string(),
                )
            }
        },
        RelayFrame::Error(body) => Event::data(body.to_string()),
        RelayFrame::Done => Event::data("[DONE]"),
    }
}

/// Sink feeding an actix streaming response through a bounded channel
pub struct SseSink {
    tx: mpsc::Sender<Result<web::Bytes, BridgeError>>,
}

impl SseSink {
    pub fn new(tx: mpsc::Sender<Result<web::Bytes, BridgeError>>) -> Self {
        Self { tx }
    }
}

#[async_trait]
impl ChunkSink for SseSink {
    async fn send(&mut self, frame: RelayFrame) -> Result<(), SinkClosed> {
        self.tx
            .send(Ok(frame_event(&frame).to_bytes()))
            .await
            .map_err(|_| SinkClosed)
    }

    fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Build the SSE streaming response
pub fn create_sse_response<S>(stream: S) -> HttpResponse
where
    S: Stream<Item = Result<web::Bytes, BridgeError>> + 'static,
{
    HttpResponse::Ok()
        .insert_header((CONTENT_TYPE, "text/event-stream"))
        .insert_header((CACHE_CONTROL, "no-cache"))
        .insert_header(("Connection", "keep-alive"))
        .streaming(stream)
}
