//! Gemini request building, response parsing, and HTTP round trips.

use ghostline::credentials::ApiKey;
use ghostline::providers::gemini::{build_request, parse_response, GeminiProvider};
use ghostline::providers::{GenerateRequest, GenerativeProvider, ProviderError, ResponseSchema};

use crate::support::serve_once;

#[test]
fn plain_request_has_single_user_part_and_no_generation_config() {
    let body = build_request(&GenerateRequest::text("Advise me."));
    let value = match serde_json::to_value(&body) {
        Ok(value) => value,
        Err(err) => panic!("request should serialize: {err}"),
    };

    assert_eq!(value["contents"][0]["role"], "user");
    assert_eq!(value["contents"][0]["parts"][0]["text"], "Advise me.");
    assert!(value.get("generationConfig").is_none());
}

#[test]
fn structured_request_declares_json_mime_and_schema() {
    let request = GenerateRequest::text("Profile them.")
        .with_schema(ResponseSchema::required_strings(&["analysis", "tactic"]));
    let value = match serde_json::to_value(build_request(&request)) {
        Ok(value) => value,
        Err(err) => panic!("request should serialize: {err}"),
    };

    let config = &value["generationConfig"];
    assert_eq!(config["responseMimeType"], "application/json");
    assert_eq!(config["responseSchema"]["type"], "OBJECT");
    assert_eq!(
        config["responseSchema"]["required"],
        serde_json::json!(["analysis", "tactic"])
    );
}

#[test]
fn parses_first_part_of_first_candidate() {
    let body = r#"{
        "candidates": [
            {"content": {"role": "model", "parts": [{"text": "first"}, {"text": "second"}]}, "finishReason": "STOP"},
            {"content": {"role": "model", "parts": [{"text": "other candidate"}]}}
        ],
        "usageMetadata": {"promptTokenCount": 12, "candidatesTokenCount": 3}
    }"#;

    let response = match parse_response(body) {
        Ok(response) => response,
        Err(err) => panic!("response should parse: {err}"),
    };
    assert_eq!(response.text, "first");
    assert_eq!(response.finish_reason.as_deref(), Some("STOP"));
    let usage = response.usage.unwrap_or_default();
    assert_eq!(usage.input_tokens, 12);
    assert_eq!(usage.output_tokens, 3);
}

#[test]
fn empty_candidates_is_missing_text() {
    assert!(matches!(
        parse_response(r#"{"candidates": []}"#),
        Err(ProviderError::MissingText(_))
    ));
}

#[test]
fn absent_candidates_is_missing_text() {
    assert!(matches!(
        parse_response("{}"),
        Err(ProviderError::MissingText(_))
    ));
}

#[test]
fn non_json_body_is_parse_error() {
    assert!(matches!(
        parse_response("<html>oops</html>"),
        Err(ProviderError::Parse(_))
    ));
}

#[tokio::test]
async fn posts_to_generate_content_with_key_header() {
    let body = r#"{"candidates":[{"content":{"parts":[{"text":"Say less."}]}}]}"#;
    let (base, request) = serve_once("200 OK", body).await;

    let provider = GeminiProvider::new(
        format!("{base}/v1beta"),
        "gemini-test",
        ApiKey::new("test-key-123"),
    );
    let response = provider.generate(GenerateRequest::text("hello")).await;
    match response {
        Ok(response) => assert_eq!(response.text, "Say less."),
        Err(err) => panic!("generate should succeed: {err}"),
    }

    let raw = match request.await {
        Ok(raw) => raw,
        Err(err) => panic!("server task should finish: {err}"),
    };
    assert!(raw.starts_with("POST /v1beta/models/gemini-test:generateContent "));
    let lowered = raw.to_ascii_lowercase();
    assert!(lowered.contains("x-goog-api-key: test-key-123"));
    assert!(!raw.contains("key=test-key-123"));
    assert!(raw.contains(r#""text":"hello""#));
}

#[tokio::test]
async fn server_error_becomes_http_status() {
    let (base, _request) = serve_once("500 Internal Server Error", r#"{"error":"boom"}"#).await;
    let provider = GeminiProvider::new(base, "gemini-test", ApiKey::new("k"));

    match provider.generate(GenerateRequest::text("hello")).await {
        Err(ProviderError::HttpStatus { status, body }) => {
            assert_eq!(status, 500);
            assert!(body.contains("boom"));
        }
        other => panic!("expected HttpStatus, got {other:?}"),
    }
}

#[tokio::test]
async fn unreachable_endpoint_is_request_error_without_key() {
    let provider = GeminiProvider::new(
        "http://127.0.0.1:1",
        "gemini-test",
        ApiKey::new("secret-key"),
    );
    match provider.generate(GenerateRequest::text("hello")).await {
        Err(err @ ProviderError::Request(_)) => {
            assert!(!err.to_string().contains("secret-key"));
        }
        other => panic!("expected Request error, got {other:?}"),
    }
}

#[test]
fn model_id_is_the_model_name() {
    let provider = GeminiProvider::new("http://localhost", "gemini-2.0-flash", ApiKey::new("k"));
    assert_eq!(provider.model_id(), "gemini-2.0-flash");
}
