//! Chat completions endpoint

use actix_web::{HttpRequest, HttpResponse, Result as ActixResult, web};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::debug;

use crate::core::relay::StreamRelay;
use crate::core::types::ChatCompletionRequest;
use crate::server::auth::validate_access_key;
use crate::server::sse::{SINK_CHANNEL_CAPACITY, SseSink, create_sse_response};
use crate::server::state::AppState;

/// OpenAI-compatible chat completions endpoint
///
/// Non-streaming requests resolve to a single JSON response; streaming
/// requests are relayed chunk by chunk as SSE events, ending with either a
/// `[DONE]` marker or a single error event.
pub async fn chat_completions(
    state: web::Data<AppState>,
    req: HttpRequest,
    request: web::Json<ChatCompletionRequest>,
) -> ActixResult<HttpResponse> {
    validate_access_key(&req, &state.config.auth)?;
    let request = request.into_inner();

    if request.stream {
        let upstream = state.router.dispatch_stream(&request).await?;

        let (tx, rx) = mpsc::channel(SINK_CHANNEL_CAPACITY);
        let model = request.model.clone();
        tokio::spawn(async move {
            let mut relay = StreamRelay::new(SseSink::new(tx));
            let outcome = relay.run(upstream).await;
            debug!(model = %model, ?outcome, "stream finished");
        });

        Ok(create_sse_response(ReceiverStream::new(rx)))
    } else {
        let response = state.router.dispatch(&request).await?;
        Ok(HttpResponse::Ok().json(response))
    }
}
