//! WebSocket chat endpoint
//!
//! Clients send JSON messages of the form
//! `{"type": "chat", "api_key": "...", "payload": {...}}` where `payload`
//! is a chat completion request. Responses are relayed as text frames in
//! the same `data:` line format as the SSE endpoint, with the same
//! single-terminal-frame rule.

use actix_web::{HttpRequest, HttpResponse, Result as ActixResult, web};
use actix_ws::{Message, MessageStream, Session};
use async_trait::async_trait;
use futures_util::StreamExt;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, info};

use crate::core::relay::{ChunkSink, RelayFrame, RelayOutcome, SinkClosed, StreamRelay};
use crate::core::types::ChatCompletionRequest;
use crate::server::auth::validate_key_value;
use crate::server::sse::{Event, frame_event};
use crate::server::state::AppState;

/// Upgrade the connection and spawn the per-client loop
pub async fn websocket(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Payload,
) -> ActixResult<HttpResponse> {
    let (response, session, msg_stream) = actix_ws::handle(&req, body)?;
    info!("websocket client connected");
    actix_web::rt::spawn(connection_loop(state, session, msg_stream));
    Ok(response)
}

async fn connection_loop(
    state: web::Data<AppState>,
    mut session: Session,
    mut msg_stream: MessageStream,
) {
    while let Some(Ok(message)) = msg_stream.next().await {
        match message {
            Message::Text(text) => {
                if handle_chat(&state, &mut session, &text).await.is_err() {
                    break;
                }
            }
            Message::Ping(bytes) => {
                if session.pong(&bytes).await.is_err() {
                    break;
                }
            }
            Message::Close(_) => break,
            _ => {}
        }
    }
    let _ = session.close(None).await;
    info!("websocket client disconnected");
}

#[derive(Debug, Deserialize)]
struct WsChatMessage {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    api_key: Option<String>,
    #[serde(default)]
    payload: Value,
}

/// Sink delivering relay frames as WebSocket text frames
struct WsSink {
    session: Session,
}

#[async_trait]
impl ChunkSink for WsSink {
    async fn send(&mut self, frame: RelayFrame) -> Result<(), SinkClosed> {
        self.session
            .text(frame_event(&frame).render())
            .await
            .map_err(|_| SinkClosed)
    }
}

async fn handle_chat(
    state: &AppState,
    session: &mut Session,
    text: &str,
) -> Result<(), actix_ws::Closed> {
    let message: WsChatMessage = match serde_json::from_str(text) {
        Ok(message) => message,
        Err(err) => {
            return send_error(session, &invalid_request(format!("invalid message: {err}"))).await;
        }
    };

    if message.kind != "chat" {
        return send_error(
            session,
            &invalid_request(format!("unknown message type: {}", message.kind)),
        )
        .await;
    }

    let key = message.api_key.as_deref().unwrap_or("");
    if let Err(error) = validate_key_value(key, &state.config.auth) {
        return send_error(session, &error.error_body()).await;
    }

    // WebSocket chat is always streamed.
    let mut payload = message.payload;
    if let Some(object) = payload.as_object_mut() {
        object.insert("stream".to_string(), json!(true));
    }
    let request: ChatCompletionRequest = match serde_json::from_value(payload) {
        Ok(request) => request,
        Err(err) => {
            return send_error(session, &invalid_request(format!("invalid payload: {err}"))).await;
        }
    };

    match state.router.dispatch_stream(&request).await {
        Ok(upstream) => {
            let mut relay = StreamRelay::new(WsSink {
                session: session.clone(),
            });
            let outcome = relay.run(upstream).await;
            debug!(model = %request.model, ?outcome, "ws stream finished");
            if matches!(outcome, RelayOutcome::ClientDisconnected { .. }) {
                return Err(actix_ws::Closed);
            }
            Ok(())
        }
        Err(error) => send_error(session, &error.error_body()).await,
    }
}

/// Transport-level validation failure, mirroring the 400 the HTTP surface
/// would produce for an unreadable body
fn invalid_request(message: String) -> Value {
    json!({
        "error": {
            "message": message,
            "type": "invalid_request",
            "code": 400,
        }
    })
}

async fn send_error(session: &mut Session, body: &Value) -> Result<(), actix_ws::Closed> {
    session.text(Event::data(body.to_string()).render()).await
}
