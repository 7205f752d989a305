//! OpenRouter client against a mock HTTP server.

use serde_json::json;
use tether::infrastructure::openrouter::errors::{
    DECODE_ERROR, EMPTY_RESPONSE, HTTP_ERROR, INVALID_REQUEST, NETWORK_ERROR,
};
use tether::infrastructure::openrouter::{
    models, ChatCompletionRequest, ClientConfig, Message, OpenRouterClient, RetryPolicy, Role,
};
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SENDER: &str = "0x00000000000000000000000000000000000000aa";

fn completion_body() -> serde_json::Value {
    json!({
        "id": "gen-123",
        "object": "chat.completion",
        "created": 1_700_000_000,
        "model": "google/gemini-2.5-flash",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": "pong"},
            "finish_reason": "stop"
        }],
        "usage": {"prompt_tokens": 3, "completion_tokens": 1, "total_tokens": 4}
    })
}

fn client(server: &MockServer, max_retries: u32) -> OpenRouterClient {
    let config = ClientConfig::new("sk-or-v1-test-key")
        .with_base_url(server.uri())
        .with_retry(RetryPolicy::new(max_retries, 1, 5));
    OpenRouterClient::new(config).unwrap()
}

fn ping() -> ChatCompletionRequest {
    ChatCompletionRequest::new(vec![Message::text(Role::User, "ping")])
}

async fn request_count(server: &MockServer) -> usize {
    server.received_requests().await.map_or(0, |r| r.len())
}

#[tokio::test]
async fn test_completion_success() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body()))
        .expect(1)
        .mount(&server)
        .await;

    let response = client(&server, 3).create_completion(ping()).await.unwrap();
    assert_eq!(response.id, "gen-123");
    assert_eq!(response.first_text().as_deref(), Some("pong"));
    assert_eq!(response.usage.unwrap().total_tokens, 4);
}

#[tokio::test]
async fn test_fixed_headers_are_sent() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer sk-or-v1-test-key"))
        .and(header("content-type", "application/json"))
        .and(header("http-referer", "https://example.org"))
        .and(header("x-title", "Tether Tests"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body()))
        .expect(1)
        .mount(&server)
        .await;

    let config = ClientConfig::new("sk-or-v1-test-key")
        .with_base_url(server.uri())
        .with_app(
            Some("https://example.org".to_string()),
            Some("Tether Tests".to_string()),
        );
    let client = OpenRouterClient::new(config).unwrap();
    assert!(client.create_completion(ping()).await.is_ok());
}

#[tokio::test]
async fn test_default_model_filled_in() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_partial_json(json!({"model": models::GEMINI_2_5_FLASH, "stream": false})))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body()))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server, 0);
    assert_eq!(client.default_model(), models::GEMINI_2_5_FLASH);
    client.create_completion(ping()).await.unwrap();
}

#[tokio::test]
async fn test_fallback_list_suppresses_default_model() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body()))
        .mount(&server)
        .await;

    let mut request = ping();
    request.models = Some(vec![models::LLAMA_4_SCOUT.to_string()]);
    client(&server, 0).create_completion(request).await.unwrap();

    let received = server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&received[0].body).unwrap();
    assert!(body.get("model").is_none());
    assert_eq!(body["models"], json!([models::LLAMA_4_SCOUT]));
}

#[tokio::test]
async fn test_retry_then_success() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(429))
        .up_to_n_times(2)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body()))
        .with_priority(2)
        .mount(&server)
        .await;

    let response = client(&server, 3).create_completion(ping()).await.unwrap();
    assert_eq!(response.id, "gen-123");
    assert_eq!(request_count(&server).await, 3);
}

#[tokio::test]
async fn test_retries_exhausted_returns_last_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let err = client(&server, 2).create_completion(ping()).await.unwrap_err();
    assert_eq!(err.code, 503);
    assert!(err.is_type(HTTP_ERROR));
    assert_eq!(err.message, "HTTP 503: Service Unavailable");
    assert_eq!(request_count(&server).await, 3);
}

#[tokio::test]
async fn test_non_retryable_status_sent_once() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "error": {"code": 404, "message": "No endpoints found", "metadata": {"model": "x/y"}}
        })))
        .mount(&server)
        .await;

    let err = client(&server, 3).create_completion(ping()).await.unwrap_err();
    assert_eq!(err.code, 404);
    assert_eq!(err.message, "No endpoints found");
    assert_eq!(err.metadata.unwrap()["model"], json!("x/y"));
    assert_eq!(request_count(&server).await, 1);
}

#[tokio::test]
async fn test_non_json_error_body_becomes_http_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/models"))
        .respond_with(ResponseTemplate::new(500).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let err = client(&server, 3).list_models().await.unwrap_err();
    assert_eq!(err.code, 500);
    assert!(err.is_type(HTTP_ERROR));
    assert_eq!(request_count(&server).await, 1);
}

#[tokio::test]
async fn test_empty_success_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_string("  \n"))
        .mount(&server)
        .await;

    let err = client(&server, 3).create_completion(ping()).await.unwrap_err();
    assert_eq!(err.code, 200);
    assert!(err.is_type(EMPTY_RESPONSE));
    assert_eq!(request_count(&server).await, 1);
}

#[tokio::test]
async fn test_undecodable_success_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/credits"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"unexpected": true})))
        .mount(&server)
        .await;

    let err = client(&server, 0).credits_balance().await.unwrap_err();
    assert!(err.is_type(DECODE_ERROR));
}

#[tokio::test]
async fn test_transport_failure_is_network_error() {
    let config = ClientConfig::new("sk-or-v1-test-key")
        .with_base_url("http://127.0.0.1:9")
        .with_retry(RetryPolicy::new(3, 1, 5));
    let err = OpenRouterClient::new(config)
        .unwrap()
        .list_models()
        .await
        .unwrap_err();
    assert_eq!(err.code, 0);
    assert!(err.is_type(NETWORK_ERROR));
    assert!(err.is_network());
}

#[tokio::test]
async fn test_retries_disabled_globally() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/models"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;

    let config = ClientConfig::new("k")
        .with_base_url(server.uri())
        .with_retry(RetryPolicy::new(3, 1, 5))
        .with_retries_enabled(false);
    let err = OpenRouterClient::new(config)
        .unwrap()
        .list_models()
        .await
        .unwrap_err();
    assert_eq!(err.code, 429);
    assert_eq!(request_count(&server).await, 1);
}

#[tokio::test]
async fn test_crypto_charge_is_never_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/credits/coinbase"))
        .and(body_partial_json(json!({"amount": 25.0, "sender": SENDER, "chain_id": 8453})))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let err = client(&server, 3)
        .create_crypto_charge(25.0, SENDER, 8453)
        .await
        .unwrap_err();
    assert_eq!(err.code, 503);
    assert_eq!(request_count(&server).await, 1);
}

#[tokio::test]
async fn test_invalid_crypto_charge_sends_nothing() {
    let server = MockServer::start().await;
    let client = client(&server, 3);

    for (amount, sender, chain) in [(0.0, SENDER, 8453), (10.0, SENDER, 56), (10.0, "0xnope", 1)] {
        let err = client
            .create_crypto_charge(amount, sender, chain)
            .await
            .unwrap_err();
        assert_eq!(err.code, 400);
        assert!(err.is_type(INVALID_REQUEST));
    }
    assert_eq!(request_count(&server).await, 0);
}

#[tokio::test]
async fn test_key_status_reads_rate_limit_headers() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/auth/key"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("X-RateLimit-Limit", "20")
                .insert_header("X-RateLimit-Remaining", "19")
                .insert_header("X-RateLimit-Reset", "1700000060")
                .set_body_json(json!({"data": {
                    "label": "sk-or-v1-abc...",
                    "usage": 1.25,
                    "limit": 10.0,
                    "is_free_tier": false,
                    "rate_limit": {"requests": 20, "interval": "10s"}
                }})),
        )
        .mount(&server)
        .await;

    let status = client(&server, 0).key_status().await.unwrap();
    assert_eq!(status.key.remaining(), Some(8.75));
    let rate_limit = status.rate_limit.unwrap();
    assert_eq!(rate_limit.remaining, 19);
    assert_eq!(rate_limit.reset_at_ms, 1_700_000_060_000);
}

#[tokio::test]
async fn test_generation_lookup_by_query() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/generation"))
        .and(query_param("id", "gen-123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {
            "id": "gen-123",
            "model": "google/gemini-2.5-flash",
            "created_at": "2025-01-01T00:00:00Z",
            "tokens_prompt": 3,
            "tokens_completion": 1,
            "total_cost": 0.00001
        }})))
        .expect(1)
        .mount(&server)
        .await;

    let details = client(&server, 0).get_generation("gen-123").await.unwrap();
    assert_eq!(details.tokens_prompt, Some(3));
    assert_eq!(details.total_cost, Some(0.00001));
}

#[tokio::test]
async fn test_model_lookup_unwraps_data() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/models/google/gemini-2.5-flash"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {
            "id": "google/gemini-2.5-flash",
            "name": "Gemini 2.5 Flash",
            "pricing": {"prompt": "0.0000003", "completion": "0.0000025"}
        }})))
        .mount(&server)
        .await;

    let model = client(&server, 0)
        .get_model(models::GEMINI_2_5_FLASH)
        .await
        .unwrap();
    assert_eq!(model.name, "Gemini 2.5 Flash");
}
