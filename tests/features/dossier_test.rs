//! Dossier compiler.

use ghostline::features::dossier::{DossierCompiler, DossierInput, DossierState, DOSSIER_INCOMPLETE};
use ghostline::session::FeatureState;

use crate::support::{dispatcher, Scripted, ScriptedProvider};

fn input(designation: &str, observable_trait: &str, vulnerability: &str) -> DossierInput {
    DossierInput {
        designation: designation.to_owned(),
        observable_trait: observable_trait.to_owned(),
        vulnerability: vulnerability.to_owned(),
    }
}

#[tokio::test]
async fn valid_reply_is_exposed_verbatim() {
    let provider = ScriptedProvider::replying(&[
        r#"{"analysis":"Arrogance shields a fear of irrelevance.","tactic":"Ask for advice, then ignore half of it."}"#,
    ]);
    let compiler = DossierCompiler::new(dispatcher(provider.clone()));

    let architect = input("The Architect", "Arrogance", "Fear");
    let state = match compiler.compile(&architect).await {
        Ok(state) => state,
        Err(err) => panic!("compile should succeed: {err}"),
    };
    assert_eq!(
        state,
        DossierState::Compiled {
            title: "Dossier: The Architect".to_owned(),
            analysis: "Arrogance shields a fear of irrelevance.".to_owned(),
            tactic: "Ask for advice, then ignore half of it.".to_owned(),
        }
    );
    assert_eq!(compiler.dossier(), Some(state));
    assert_eq!(compiler.state(), FeatureState::Idle);

    let requests = provider.requests();
    assert!(requests.iter().all(|r| r.response_schema.is_some()));
    let prompt = provider.last_prompt();
    assert!(prompt.contains("Target Designation: \"The Architect\""));
}

#[tokio::test]
async fn missing_required_input_makes_no_request() {
    let provider = ScriptedProvider::replying(&[]);
    let compiler = DossierCompiler::new(dispatcher(provider.clone()));

    let state = match compiler.compile(&input("  ", "Arrogance", "")).await {
        Ok(state) => state,
        Err(err) => panic!("validation failure should be a state: {err}"),
    };
    assert_eq!(
        state,
        DossierState::Failed {
            message: DOSSIER_INCOMPLETE.to_owned(),
            raw_reply: None,
        }
    );
    assert_eq!(provider.calls(), 0);
}

#[tokio::test]
async fn blank_vulnerability_asks_the_model_to_infer() {
    let provider = ScriptedProvider::replying(&[r#"{"analysis":"a","tactic":"t"}"#]);
    let compiler = DossierCompiler::new(dispatcher(provider.clone()));

    let _ = compiler.compile(&input("Mara", "Warmth", "")).await;
    assert!(provider
        .last_prompt()
        .contains("Not provided. Infer based on the trait."));
}

#[tokio::test]
async fn off_schema_reply_keeps_raw_text() {
    let provider = ScriptedProvider::replying(&["I cannot profile real people."]);
    let compiler = DossierCompiler::new(dispatcher(provider));

    match compiler.compile(&input("Mara", "Warmth", "")).await {
        Ok(DossierState::Failed { message, raw_reply }) => {
            assert!(message.starts_with("Failed to compile dossier."));
            assert_eq!(raw_reply.as_deref(), Some("I cannot profile real people."));
        }
        other => panic!("expected Failed, got {other:?}"),
    }
    assert_eq!(compiler.state(), FeatureState::Failed);
}

#[tokio::test]
async fn transport_failure_has_no_raw_reply() {
    let provider = ScriptedProvider::new(vec![Scripted::Status(500, "boom".to_owned())]);
    let compiler = DossierCompiler::new(dispatcher(provider));

    match compiler.compile(&input("Mara", "Warmth", "")).await {
        Ok(DossierState::Failed { message, raw_reply }) => {
            assert!(message.contains("status 500"));
            assert!(raw_reply.is_none());
        }
        other => panic!("expected Failed, got {other:?}"),
    }
}
