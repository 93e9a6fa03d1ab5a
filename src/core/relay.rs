//! Streaming relay
//!
//! Connects an adapter's chunk stream (producer) to a client sink
//! (consumer). Each frame is awaited by the sink before the next upstream
//! chunk is pulled, so a slow consumer suspends the relay instead of
//! growing a buffer. Chunks are forwarded in arrival order with no
//! reordering or batching.
//!
//! A relay run ends with exactly one terminal frame: `Done` when the
//! upstream ended cleanly, `Error` when it failed, and none at all when
//! the client itself went away (there is nobody left to tell).

use async_trait::async_trait;
use futures::{Stream, StreamExt};
use serde_json::Value;
use tracing::debug;

use crate::core::types::ChatCompletionChunk;
use crate::utils::error::Result;

/// Frame delivered to the client sink
#[derive(Debug, Clone)]
pub enum RelayFrame {
    /// One forwarded chunk
    Chunk(ChatCompletionChunk),
    /// Terminal frame: the stream failed; payload is the unified error body
    Error(Value),
    /// Terminal frame: upstream ended cleanly
    Done,
}

/// Returned by a sink when the client is gone
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SinkClosed;

/// Client-side frame consumer
#[async_trait]
pub trait ChunkSink: Send {
    /// Deliver one frame; resolves once the frame is accepted
    async fn send(&mut self, frame: RelayFrame) -> std::result::Result<(), SinkClosed>;

    /// Cheap liveness check, consulted before each upstream pull
    ///
    /// Sinks that cannot observe disconnection eagerly may keep the
    /// default; they will report closure through a failed `send` instead.
    fn is_closed(&self) -> bool {
        false
    }
}

/// Relay lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayState {
    /// Accepting upstream chunks and forwarding them
    Open,
    /// Upstream ended or errored, or the client went away; teardown in
    /// flight
    Closing,
    /// Terminal; no transition leaves this state
    Closed,
}

/// How a relay run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayOutcome {
    /// Upstream ended cleanly and `Done` was delivered
    Completed { chunks: u64 },
    /// Upstream failed and a terminal error frame was delivered
    UpstreamFailed { chunks: u64 },
    /// The client went away; upstream was dropped without further pulls
    ClientDisconnected { chunks: u64 },
}

/// Producer/consumer relay between an upstream chunk stream and a sink
pub struct StreamRelay<K> {
    sink: K,
    state: RelayState,
    forwarded: u64,
}

impl<K: ChunkSink> StreamRelay<K> {
    pub fn new(sink: K) -> Self {
        Self {
            sink,
            state: RelayState::Open,
            forwarded: 0,
        }
    }

    pub fn state(&self) -> RelayState {
        self.state
    }

    pub fn sink(&self) -> &K {
        &self.sink
    }

    /// Drive the relay until a terminal state
    ///
    /// Dropping the upstream stream on the way out is what tears down the
    /// outbound call when the client disconnects mid-stream.
    pub async fn run<S>(&mut self, upstream: S) -> RelayOutcome
    where
        S: Stream<Item = Result<ChatCompletionChunk>> + Unpin,
    {
        debug_assert_eq!(self.state, RelayState::Open);
        let mut upstream = upstream;

        let outcome = loop {
            if self.sink.is_closed() {
                self.state = RelayState::Closing;
                break RelayOutcome::ClientDisconnected {
                    chunks: self.forwarded,
                };
            }

            match upstream.next().await {
                Some(Ok(chunk)) => {
                    if self.sink.send(RelayFrame::Chunk(chunk)).await.is_err() {
                        self.state = RelayState::Closing;
                        break RelayOutcome::ClientDisconnected {
                            chunks: self.forwarded,
                        };
                    }
                    self.forwarded += 1;
                }
                Some(Err(error)) => {
                    self.state = RelayState::Closing;
                    let _ = self.sink.send(RelayFrame::Error(error.error_body())).await;
                    break RelayOutcome::UpstreamFailed {
                        chunks: self.forwarded,
                    };
                }
                None => {
                    self.state = RelayState::Closing;
                    let _ = self.sink.send(RelayFrame::Done).await;
                    break RelayOutcome::Completed {
                        chunks: self.forwarded,
                    };
                }
            }
        };

        drop(upstream);
        self.state = RelayState::Closed;
        debug!(?outcome, "relay closed");
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::utils::error::BridgeError;

    fn chunk(id: &str) -> ChatCompletionChunk {
        ChatCompletionChunk {
            id: id.to_string(),
            object: "chat.completion.chunk".into(),
            created: 0,
            model: "m".into(),
            choices: vec![],
            usage: None,
        }
    }

    struct TestSink {
        frames: Vec<RelayFrame>,
        close_after: Option<usize>,
        closed: bool,
    }

    impl TestSink {
        fn new() -> Self {
            Self {
                frames: Vec::new(),
                close_after: None,
                closed: false,
            }
        }

        fn closing_after(accepted: usize) -> Self {
            Self {
                frames: Vec::new(),
                close_after: Some(accepted),
                closed: false,
            }
        }

        fn chunk_ids(&self) -> Vec<&str> {
            self.frames
                .iter()
                .filter_map(|frame| match frame {
                    RelayFrame::Chunk(chunk) => Some(chunk.id.as_str()),
                    _ => None,
                })
                .collect()
        }
    }

    #[async_trait]
    impl ChunkSink for TestSink {
        async fn send(&mut self, frame: RelayFrame) -> std::result::Result<(), SinkClosed> {
            if self.closed {
                return Err(SinkClosed);
            }
            self.frames.push(frame);
            if self.close_after == Some(self.frames.len()) {
                self.closed = true;
            }
            Ok(())
        }

        fn is_closed(&self) -> bool {
            self.closed
        }
    }

    #[tokio::test]
    async fn forwards_chunks_in_order_with_one_done_frame() {
        let upstream = stream::iter(vec![Ok(chunk("a")), Ok(chunk("b")), Ok(chunk("c"))]);
        let mut relay = StreamRelay::new(TestSink::new());

        let outcome = relay.run(upstream).await;

        assert_eq!(outcome, RelayOutcome::Completed { chunks: 3 });
        assert_eq!(relay.state(), RelayState::Closed);
        assert_eq!(relay.sink().chunk_ids(), vec!["a", "b", "c"]);
        assert!(matches!(relay.sink().frames.last(), Some(RelayFrame::Done)));
        let terminals = relay
            .sink()
            .frames
            .iter()
            .filter(|f| matches!(f, RelayFrame::Done | RelayFrame::Error(_)))
            .count();
        assert_eq!(terminals, 1);
    }

    #[tokio::test]
    async fn upstream_error_becomes_the_single_terminal_frame() {
        let upstream = stream::iter(vec![
            Ok(chunk("a")),
            Err(BridgeError::network("deepseek", "connection reset")),
        ]);
        let mut relay = StreamRelay::new(TestSink::new());

        let outcome = relay.run(upstream).await;

        assert_eq!(outcome, RelayOutcome::UpstreamFailed { chunks: 1 });
        let frames = &relay.sink().frames;
        assert_eq!(frames.len(), 2);
        assert!(matches!(frames[0], RelayFrame::Chunk(_)));
        match &frames[1] {
            RelayFrame::Error(body) => {
                assert_eq!(body["error"]["type"], "upstream_error");
                assert_eq!(body["error"]["code"], 502);
            }
            other => panic!("expected error frame, got {other:?}"),
        }
        // No Done after an error.
        assert!(!frames.iter().any(|f| matches!(f, RelayFrame::Done)));
    }

    #[tokio::test]
    async fn client_disconnect_stops_upstream_pulls() {
        let pulled = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&pulled);
        let upstream = stream::iter((0..5).map(|i| Ok::<_, BridgeError>(chunk(&format!("c{i}")))))
            .map(move |item| {
                counter.fetch_add(1, Ordering::SeqCst);
                item
            });
        futures::pin_mut!(upstream);

        let mut relay = StreamRelay::new(TestSink::closing_after(2));
        let outcome = relay.run(upstream).await;

        assert_eq!(outcome, RelayOutcome::ClientDisconnected { chunks: 2 });
        assert_eq!(relay.sink().chunk_ids(), vec!["c0", "c1"]);
        // The sink closed after accepting chunk 2; chunks 3..5 were never
        // requested from upstream.
        assert_eq!(pulled.load(Ordering::SeqCst), 2);
        // And no terminal frame was sent to a client that is gone.
        assert_eq!(relay.sink().frames.len(), 2);
    }

    #[tokio::test]
    async fn empty_upstream_still_sends_done() {
        let upstream = stream::iter(Vec::<Result<ChatCompletionChunk>>::new());
        let mut relay = StreamRelay::new(TestSink::new());

        let outcome = relay.run(upstream).await;

        assert_eq!(outcome, RelayOutcome::Completed { chunks: 0 });
        assert!(matches!(relay.sink().frames.as_slice(), [RelayFrame::Done]));
    }
}
