//! Integration tests for the OpenAI-compatible adapter against a mock
//! provider served by `wiremock`.

use caregate::config::ProviderConfig;
use caregate::provider::{CallOptions, ModelRequest, OpenAiCompatibleAdapter, ProviderAdapter};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn adapter(server: &MockServer, api_key: Option<&str>) -> OpenAiCompatibleAdapter {
    OpenAiCompatibleAdapter::new(
        ProviderConfig {
            name: "openai".to_string(),
            url: format!("{}/v1", server.uri()),
            api_key: api_key.map(Into::into),
            input_cost_per_1m: 2.5,
            output_cost_per_1m: 10.0,
        },
        reqwest::Client::new(),
    )
}

fn request() -> ModelRequest {
    ModelRequest {
        model: "gpt-4o".to_string(),
        input: "Suggest bathroom modifications".to_string(),
        options: CallOptions {
            temperature: Some(0.2),
            max_tokens: Some(300),
            tools: vec!["recommend_modifications".to_string()],
            system_prompt: Some("You are a care planner.".to_string()),
        },
    }
}

fn completion() -> serde_json::Value {
    serde_json::json!({
        "id": "chatcmpl-mock",
        "object": "chat.completion",
        "model": "gpt-4o-2024-08-06",
        "choices": [{
            "message": {"role": "assistant", "content": "Install grab bars."},
            "index": 0,
            "finish_reason": "stop"
        }],
        "usage": {
            "prompt_tokens": 400,
            "completion_tokens": 100,
            "total_tokens": 500
        }
    })
}

#[tokio::test]
async fn test_invoke_maps_request_and_prices_usage() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .and(body_partial_json(serde_json::json!({
            "model": "gpt-4o",
            "max_tokens": 300,
            "messages": [
                {"role": "system", "content": "You are a care planner."},
                {"role": "user", "content": "Suggest bathroom modifications"}
            ],
            "tools": [{"type": "function", "function": {"name": "recommend_modifications"}}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion()))
        .expect(1)
        .mount(&server)
        .await;

    let response = adapter(&server, Some("sk-test"))
        .invoke(&request())
        .await
        .unwrap();

    assert_eq!(response.output, "Install grab bars.");
    assert_eq!(response.model, "gpt-4o-2024-08-06");
    assert_eq!(response.provider, "openai");
    assert_eq!(response.usage.input_tokens, 400);
    assert_eq!(response.usage.output_tokens, 100);
    assert_eq!(response.usage.total_tokens, 500);
    // 400 * 2.5/1M + 100 * 10/1M
    assert!((response.usage.cost - 0.002).abs() < 1e-12);
}

#[tokio::test]
async fn test_error_status_becomes_provider_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
        .mount(&server)
        .await;

    let err = adapter(&server, None).invoke(&request()).await.unwrap_err();

    assert_eq!(err.provider, "openai");
    assert_eq!(err.status_code, Some(503));
    assert!(err.message.contains("overloaded"), "{}", err.message);
}

#[tokio::test]
async fn test_missing_content_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({ "choices": [] })),
        )
        .mount(&server)
        .await;

    let err = adapter(&server, None).invoke(&request()).await.unwrap_err();
    assert!(err.message.contains("no message content"), "{}", err.message);
    assert_eq!(err.status_code, None);
}

#[tokio::test]
async fn test_missing_usage_costs_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "choices": [{"message": {"role": "assistant", "content": "ok"}}]
        })))
        .mount(&server)
        .await;

    let response = adapter(&server, None).invoke(&request()).await.unwrap();
    assert_eq!(response.model, "gpt-4o");
    assert_eq!(response.usage.total_tokens, 0);
    assert_eq!(response.usage.cost, 0.0);
}

#[test]
fn test_unreachable_provider_is_an_error() {
    let adapter = OpenAiCompatibleAdapter::new(
        ProviderConfig {
            name: "offline".to_string(),
            url: "http://127.0.0.1:9".to_string(),
            api_key: None,
            input_cost_per_1m: 0.0,
            output_cost_per_1m: 0.0,
        },
        reqwest::Client::new(),
    );

    let err = tokio_test::block_on(adapter.invoke(&request())).unwrap_err();
    assert_eq!(err.provider, "offline");
    assert!(err.message.starts_with("Failed to reach provider"), "{}", err.message);
}
