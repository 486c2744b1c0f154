use mockview_provider::{
    create_provider, GeminiProvider, LlmProvider, LlmRequest, ProviderConfig, ProviderErrorKind,
    ProviderType,
};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn mock_gemini_response(text: &str) -> serde_json::Value {
    serde_json::json!({
        "candidates": [{
            "content": {"role": "model", "parts": [{"text": text}]},
            "finishReason": "STOP"
        }],
        "usageMetadata": {"promptTokenCount": 11, "candidatesTokenCount": 4}
    })
}

#[tokio::test]
async fn gemini_basic_chat_with_header_verification() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/models/gemini-2.0-flash:generateContent"))
        .and(header("x-goog-api-key", "test-key"))
        .and(header("content-type", "application/json"))
        .and(body_partial_json(serde_json::json!({
            "contents": [{"role": "user", "parts": [{"text": "hi"}]}],
            "generationConfig": {"temperature": 0.5}
        })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(mock_gemini_response("Hello from Gemini")),
        )
        .expect(1)
        .mount(&server)
        .await;

    let provider = GeminiProvider::new("test-key", server.uri());
    let resp = provider
        .chat(LlmRequest::simple("gemini-2.0-flash".into(), None, "hi".into()).with_temperature(0.5))
        .await
        .unwrap();

    assert_eq!(resp.text, "Hello from Gemini");
    assert_eq!(resp.input_tokens, Some(11));
    assert_eq!(resp.output_tokens, Some(4));
}

#[tokio::test]
async fn gemini_rate_limit_is_reported_as_retryable() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/models/gemini-2.0-flash:generateContent"))
        .respond_with(ResponseTemplate::new(429).set_body_json(serde_json::json!({
            "error": {"code": 429, "status": "RESOURCE_EXHAUSTED", "message": "quota"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let provider = GeminiProvider::new("test-key", server.uri());
    let err = provider
        .chat(LlmRequest::simple("gemini-2.0-flash".into(), None, "hi".into()))
        .await
        .unwrap_err();

    let msg = err.to_string();
    assert!(msg.contains("[retryable]"));
    assert_eq!(ProviderErrorKind::classify(&msg), ProviderErrorKind::RateLimit);
}

#[tokio::test]
async fn gemini_auth_error_is_not_retryable() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/models/gemini-2.0-flash:generateContent"))
        .respond_with(ResponseTemplate::new(403).set_body_string("API key not valid"))
        .expect(1)
        .mount(&server)
        .await;

    let provider = GeminiProvider::new("bad-key", server.uri());
    let err = provider
        .chat(LlmRequest::simple("gemini-2.0-flash".into(), None, "hi".into()))
        .await
        .unwrap_err();

    let msg = err.to_string();
    assert!(!msg.contains("[retryable]"));
    assert_eq!(ProviderErrorKind::classify(&msg), ProviderErrorKind::AuthError);
}

#[tokio::test]
async fn configured_provider_uses_custom_base_url() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/models/gemini-2.0-flash:generateContent"))
        .and(header("x-goog-api-key", "cfg-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(mock_gemini_response("ok")))
        .expect(1)
        .mount(&server)
        .await;

    let config = ProviderConfig::new(ProviderType::Gemini)
        .with_api_key("cfg-key")
        .with_base_url(server.uri());
    let provider = create_provider(&config).unwrap();
    let resp = provider
        .chat(LlmRequest::simple("gemini-2.0-flash".into(), None, "hi".into()))
        .await
        .unwrap();
    assert_eq!(resp.text, "ok");
}
