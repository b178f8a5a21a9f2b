//! Persona forge.

use ghostline::conversation::{Speaker, Transcript};
use ghostline::features::forge::{PersonaForge, FORGE_FAILURE, FORGE_OPENING};

use crate::support::{dispatcher, Scripted, ScriptedProvider};

const FINAL_REPLY: &str = "The persona is complete.\n```json\n{\"codename\":\"Nightjar\",\"objective\":\"Secure the partnership\",\"environment\":\"Investor dinners\",\"core_emotion\":\"Amused detachment\",\"anchor\":\"Slow, deliberate sips of water\"}\n```";

#[tokio::test]
async fn opens_with_interview_prompt() {
    let forge = PersonaForge::new(dispatcher(ScriptedProvider::replying(&[])));
    let turns = forge.conversation().turns().await;
    assert_eq!(turns.len(), 1);
    assert_eq!(turns[0].text, FORGE_OPENING);
}

#[tokio::test]
async fn question_turn_has_no_dossier() {
    let provider = ScriptedProvider::replying(&["What environment will you operate in?"]);
    let forge = PersonaForge::new(dispatcher(provider));

    let turn = match forge.send("I want the partnership.").await {
        Ok(turn) => turn,
        Err(err) => panic!("send should succeed: {err}"),
    };
    assert!(matches!(PersonaForge::dossier_in(&turn), Ok(None)));
    assert!(forge.completed_dossier().await.is_none());
}

#[tokio::test]
async fn final_turn_carries_dossier() {
    let provider = ScriptedProvider::replying(&["Which emotion?", FINAL_REPLY]);
    let forge = PersonaForge::new(dispatcher(provider));

    let _ = forge.send("Investor dinners.").await;
    let turn = match forge.send("Amused detachment. Call me Nightjar.").await {
        Ok(turn) => turn,
        Err(err) => panic!("send should succeed: {err}"),
    };

    match PersonaForge::dossier_in(&turn) {
        Ok(Some(dossier)) => {
            assert_eq!(dossier.codename, "Nightjar");
            assert_eq!(dossier.core_emotion, "Amused detachment");
        }
        other => panic!("expected dossier, got {other:?}"),
    }
    let completed = forge.completed_dossier().await.map(|d| d.codename);
    assert_eq!(completed.as_deref(), Some("Nightjar"));
}

#[tokio::test]
async fn malformed_block_is_reported_not_swallowed() {
    let provider = ScriptedProvider::replying(&["```json\n{\"codename\":\"Half\"}\n```"]);
    let forge = PersonaForge::new(dispatcher(provider));

    let turn = match forge.send("Done?").await {
        Ok(turn) => turn,
        Err(err) => panic!("send should succeed: {err}"),
    };
    assert!(PersonaForge::dossier_in(&turn).is_err());
    assert!(forge.completed_dossier().await.is_none());
}

#[test]
fn client_turns_are_never_dossiers() {
    let mut transcript = Transcript::new();
    let turn = transcript.push(Speaker::User, FINAL_REPLY).clone();
    assert!(matches!(PersonaForge::dossier_in(&turn), Ok(None)));
}

#[tokio::test]
async fn failure_appends_stand_by_turn() {
    let provider = ScriptedProvider::new(vec![Scripted::Status(500, "boom".to_owned())]);
    let forge = PersonaForge::new(dispatcher(provider));
    match forge.send("Hello").await {
        Ok(turn) => assert_eq!(turn.text, FORGE_FAILURE),
        Err(err) => panic!("failures should become turns: {err}"),
    }
}
