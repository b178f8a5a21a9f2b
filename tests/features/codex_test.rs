//! Codex library and anecdote generation.

use ghostline::features::codex::{
    default_sections, Codex, CodexError, ANECDOTE_FAILURE, CODEX_ERROR,
};
use ghostline::session::FeatureState;

use crate::support::{dispatcher, Scripted, ScriptedProvider};

#[test]
fn library_has_four_sections_of_three() {
    let sections = default_sections();
    let keys: Vec<&str> = sections.iter().map(|s| s.key).collect();
    assert_eq!(
        keys,
        vec!["persona", "counterintel", "field_ops", "sanctum"]
    );
    assert!(sections.iter().all(|s| s.principles.len() == 3));
    assert!(sections
        .iter()
        .flat_map(|s| s.principles.iter())
        .all(|p| p.anecdote.is_none()));
}

#[tokio::test]
async fn anecdote_is_stored_on_the_principle() {
    let provider =
        ScriptedProvider::replying(&[r#"{"anecdote":"Talleyrand served five regimes."}"#]);
    let codex = Codex::new(dispatcher(provider.clone()));

    match codex.generate_anecdote("persona", 0).await {
        Ok(text) => assert_eq!(text, "Talleyrand served five regimes."),
        Err(err) => panic!("generation should succeed: {err}"),
    }
    let stored = codex
        .sections()
        .into_iter()
        .find(|s| s.key == "persona")
        .and_then(|s| s.principles.into_iter().next())
        .and_then(|p| p.anecdote);
    assert_eq!(stored.as_deref(), Some("Talleyrand served five regimes."));
    assert!(codex.error().is_none());
    assert_eq!(codex.state(), FeatureState::Idle);

    let requests = provider.requests();
    assert!(requests.iter().all(|r| r.response_schema.is_some()));
    assert!(provider.last_prompt().contains("Principle: \""));
}

#[tokio::test]
async fn unknown_principle_makes_no_request() {
    let provider = ScriptedProvider::replying(&[]);
    let codex = Codex::new(dispatcher(provider.clone()));

    assert!(matches!(
        codex.generate_anecdote("persona", 9).await,
        Err(CodexError::UnknownPrinciple { index: 9, .. })
    ));
    assert!(matches!(
        codex.generate_anecdote("nowhere", 0).await,
        Err(CodexError::UnknownPrinciple { .. })
    ));
    assert_eq!(provider.calls(), 0);
}

#[tokio::test]
async fn failure_stores_fallback_and_sets_error() {
    let provider = ScriptedProvider::new(vec![
        Scripted::Status(500, "boom".to_owned()),
        Scripted::text(r#"{"anecdote":"Second time lucky."}"#),
    ]);
    let codex = Codex::new(dispatcher(provider));

    match codex.generate_anecdote("sanctum", 2).await {
        Ok(text) => assert_eq!(text, ANECDOTE_FAILURE),
        Err(err) => panic!("failures should be stored: {err}"),
    }
    assert_eq!(codex.error().as_deref(), Some(CODEX_ERROR));
    assert_eq!(codex.state(), FeatureState::Failed);

    match codex.generate_anecdote("sanctum", 2).await {
        Ok(text) => assert_eq!(text, "Second time lucky."),
        Err(err) => panic!("retry should succeed: {err}"),
    }
    assert!(codex.error().is_none());
}
