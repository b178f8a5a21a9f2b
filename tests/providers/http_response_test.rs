//! Error-body sanitization and the unconfigured provider.

use ghostline::providers::{
    sanitize_http_error_body, GenerateRequest, GenerativeProvider, ProviderError,
    UnconfiguredProvider,
};

#[test]
fn sanitize_redacts_google_api_keys() {
    let raw = "API key AIzaSyA1234567890abcdefghijklmnop is invalid";
    let sanitized = sanitize_http_error_body(raw);
    assert!(!sanitized.contains("AIzaSyA1234567890"));
    assert!(sanitized.contains("[REDACTED]"));
}

#[test]
fn sanitize_redacts_every_pattern_on_repeated_calls() {
    let raw = format!(
        "token ya29.{} and sk-{} and ghp_{}",
        "a".repeat(24),
        "B".repeat(40),
        "c".repeat(24)
    );
    let first = sanitize_http_error_body(&raw);
    assert_eq!(first, "token [REDACTED] and [REDACTED] and [REDACTED]");
    for _ in 0..3 {
        assert_eq!(sanitize_http_error_body(&raw), first);
    }
}

#[test]
fn sanitize_collapses_whitespace() {
    assert_eq!(
        sanitize_http_error_body("quota\n\n   exceeded\tfor project"),
        "quota exceeded for project"
    );
}

#[test]
fn sanitize_truncates_long_bodies() {
    let raw = "x".repeat(1000);
    let sanitized = sanitize_http_error_body(&raw);
    assert!(sanitized.ends_with("...[truncated]"));
    assert!(sanitized.chars().count() < 300);
}

#[tokio::test]
async fn unconfigured_provider_always_reports_unavailable() {
    let provider = UnconfiguredProvider::new("set GEMINI_API_KEY");
    assert_eq!(provider.model_id(), "unconfigured");
    match provider.generate(GenerateRequest::text("hi")).await {
        Err(ProviderError::Unavailable(reason)) => assert_eq!(reason, "set GEMINI_API_KEY"),
        other => panic!("expected Unavailable, got {other:?}"),
    }
}
