//! Router and adapter integration tests against a mock upstream

mod common;

use std::collections::HashMap;
use std::time::Duration;

use serde_json::{Value, json};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{config, provider, simple_provider};
use llm_bridge::config::ModelConfig;
use llm_bridge::core::router::Router;
use llm_bridge::core::types::ChatCompletionRequest;
use llm_bridge::utils::error::BridgeError;

fn chat_request(value: Value) -> ChatCompletionRequest {
    serde_json::from_value(value).unwrap()
}

fn completion_body(id: &str, model: &str, content: &str) -> Value {
    json!({
        "id": id,
        "object": "chat.completion",
        "created": 1700000000,
        "model": model,
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": content},
            "finish_reason": "stop"
        }],
        "usage": {"prompt_tokens": 3, "completion_tokens": 2, "total_tokens": 5}
    })
}

fn endpoint(server: &MockServer) -> String {
    format!("{}/chat/completions", server.uri())
}

#[tokio::test]
async fn non_streaming_round_trip() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer sk-upstream"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(completion_body("chatcmpl-up-1", "deepseek-chat", "hello")),
        )
        .expect(1)
        .mount(&server)
        .await;

    let cfg = config(vec![simple_provider(
        "deepseek",
        &endpoint(&server),
        "deepseek-chat",
    )]);
    let router = Router::from_config(&cfg).unwrap();

    let request = chat_request(json!({
        "model": "deepseek/deepseek-chat",
        "messages": [{"role": "user", "content": "hi"}]
    }));

    let response = router.dispatch(&request).await.unwrap();
    assert_eq!(response.id, "chatcmpl-up-1");
    assert_eq!(response.model, "deepseek-chat");
    assert_eq!(response.choices[0].message.content, Some(json!("hello")));
    assert_eq!(response.usage.unwrap().total_tokens, 5);
}

#[tokio::test]
async fn outbound_payload_is_transformed_per_model_rules() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(completion_body("c", "deepseek-reasoner", "ok")),
        )
        .expect(1)
        .mount(&server)
        .await;

    let reasoner: ModelConfig = serde_yaml::from_str(
        r#"
max_tokens: 4096
param_rules:
  update:
    temperature: 0.6
  rename:
    max_tokens: max_reasoning_token
"#,
    )
    .unwrap();

    let cfg = config(vec![provider(
        "deepseek",
        &endpoint(&server),
        HashMap::from([("deepseek-reasoner".to_string(), reasoner)]),
    )]);
    let router = Router::from_config(&cfg).unwrap();

    let request = chat_request(json!({
        "model": "deepseek/deepseek-reasoner",
        "messages": [{"role": "user", "content": "think"}],
        "max_tokens": 8192,
        "temperature": 0.2,
        "seed": 7
    }));
    router.dispatch(&request).await.unwrap();

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    let body: Value = serde_json::from_slice(&requests[0].body).unwrap();

    // Original fields survive, the rename source is gone, the rename
    // target holds the caller's value, and the update pins temperature.
    assert_eq!(body["model"], "deepseek-reasoner");
    assert_eq!(body["stream"], json!(false));
    assert_eq!(body["messages"][0]["content"], "think");
    assert_eq!(body["seed"], json!(7));
    assert_eq!(body["temperature"], json!(0.6));
    assert_eq!(body["max_reasoning_token"], json!(8192));
    assert!(body.get("max_tokens").is_none());
}

#[tokio::test]
async fn unknown_provider_makes_no_upstream_call() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let cfg = config(vec![simple_provider(
        "deepseek",
        &endpoint(&server),
        "deepseek-chat",
    )]);
    let router = Router::from_config(&cfg).unwrap();

    let request = chat_request(json!({
        "model": "foo/bar",
        "messages": [{"role": "user", "content": "hi"}]
    }));

    let error = router.dispatch(&request).await.unwrap_err();
    assert!(matches!(error, BridgeError::UnknownProvider(_)));
    assert_eq!(error.status().as_u16(), 400);
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn upstream_429_maps_to_rate_limited() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429).set_body_json(json!({
            "error": {"message": "tokens per minute exceeded", "type": "rate_limit_error"}
        })))
        .mount(&server)
        .await;

    let cfg = config(vec![simple_provider("openai", &endpoint(&server), "gpt-4o")]);
    let router = Router::from_config(&cfg).unwrap();

    let request = chat_request(json!({
        "model": "openai/gpt-4o",
        "messages": [{"role": "user", "content": "hi"}]
    }));

    let error = router.dispatch(&request).await.unwrap_err();
    assert!(matches!(error, BridgeError::UpstreamRateLimited { .. }));
    assert_eq!(error.status().as_u16(), 429);
    assert!(error.to_string().contains("tokens per minute exceeded"));
}

#[tokio::test]
async fn upstream_5xx_maps_to_bad_gateway_with_detail() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(503).set_body_json(json!({"message": "overloaded"})),
        )
        .mount(&server)
        .await;

    let cfg = config(vec![simple_provider("openai", &endpoint(&server), "gpt-4o")]);
    let router = Router::from_config(&cfg).unwrap();

    let request = chat_request(json!({
        "model": "openai/gpt-4o",
        "messages": [{"role": "user", "content": "hi"}]
    }));

    let error = router.dispatch(&request).await.unwrap_err();
    assert_eq!(error.status().as_u16(), 502);
    assert_eq!(
        error.provider_detail().unwrap()["message"],
        json!("overloaded")
    );
}

#[tokio::test]
async fn upstream_4xx_maps_to_internal_class_500() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": {"message": "invalid request body"}
        })))
        .mount(&server)
        .await;

    let cfg = config(vec![simple_provider("openai", &endpoint(&server), "gpt-4o")]);
    let router = Router::from_config(&cfg).unwrap();

    let request = chat_request(json!({
        "model": "openai/gpt-4o",
        "messages": [{"role": "user", "content": "hi"}]
    }));

    let error = router.dispatch(&request).await.unwrap_err();
    assert!(matches!(error, BridgeError::UpstreamError { status: 400, .. }));
    assert_eq!(error.status().as_u16(), 500);
}

#[tokio::test]
async fn slow_upstream_times_out_with_the_model_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(completion_body("c", "gpt-4o", "late"))
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let model = ModelConfig {
        timeout_seconds: 1,
        ..ModelConfig::default()
    };
    let cfg = config(vec![provider(
        "openai",
        &endpoint(&server),
        HashMap::from([("gpt-4o".to_string(), model)]),
    )]);
    let router = Router::from_config(&cfg).unwrap();

    let request = chat_request(json!({
        "model": "openai/gpt-4o",
        "messages": [{"role": "user", "content": "hi"}]
    }));

    let error = router.dispatch(&request).await.unwrap_err();
    assert!(matches!(error, BridgeError::UpstreamTimeout { .. }));
    assert_eq!(error.status().as_u16(), 500);
}

#[tokio::test]
async fn unreachable_upstream_maps_to_bad_gateway() {
    // Bind-then-drop leaves a port with nothing listening on it.
    let server = MockServer::start().await;
    let dead_endpoint = endpoint(&server);
    drop(server);

    let cfg = config(vec![simple_provider("openai", &dead_endpoint, "gpt-4o")]);
    let router = Router::from_config(&cfg).unwrap();

    let request = chat_request(json!({
        "model": "openai/gpt-4o",
        "messages": [{"role": "user", "content": "hi"}]
    }));

    let error = router.dispatch(&request).await.unwrap_err();
    assert!(matches!(error, BridgeError::Network { .. }));
    assert_eq!(error.status().as_u16(), 502);
}
