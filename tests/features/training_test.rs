//! Training simulator.

use ghostline::conversation::Speaker;
use ghostline::features::training::{
    SimulationProfile, TrainingSimulator, FEEDBACK_AWAITING, FEEDBACK_CRITICAL, FEEDBACK_NONE,
    SIMULATION_OPENING, TARGET_NO_RESPONSE,
};
use ghostline::features::FeatureError;
use ghostline::session::FeatureState;

use crate::support::{dispatcher, Scripted, ScriptedProvider};

fn profile() -> SimulationProfile {
    SimulationProfile {
        personality: "Skeptical procurement lead".to_owned(),
        objective: "Win a pilot contract".to_owned(),
    }
}

fn started(provider: std::sync::Arc<ScriptedProvider>) -> TrainingSimulator {
    let mut simulator = TrainingSimulator::new(dispatcher(provider));
    if let Err(err) = simulator.start(profile()) {
        panic!("start should succeed: {err}");
    }
    simulator
}

#[tokio::test]
async fn start_opens_with_target_turn_and_awaiting_feedback() {
    let simulator = started(ScriptedProvider::replying(&[]));
    let turns = simulator.conversation().turns().await;
    assert_eq!(turns.len(), 1);
    assert_eq!(turns[0].speaker, Speaker::SimulatedTarget);
    assert_eq!(turns[0].text, SIMULATION_OPENING);
    assert_eq!(simulator.feedback(), FEEDBACK_AWAITING);
}

#[tokio::test]
async fn start_requires_both_fields() {
    let mut simulator = TrainingSimulator::new(dispatcher(ScriptedProvider::replying(&[])));
    let result = simulator.start(SimulationProfile {
        personality: String::new(),
        objective: "x".to_owned(),
    });
    assert!(matches!(result, Err(FeatureError::InvalidProfile(_))));
}

#[tokio::test]
async fn send_before_start_is_rejected() {
    let simulator = TrainingSimulator::new(dispatcher(ScriptedProvider::replying(&[])));
    assert!(matches!(
        simulator.send("hi").await,
        Err(FeatureError::SessionNotStarted)
    ));
}

#[tokio::test]
async fn move_produces_target_reply_then_feedback() {
    let provider = ScriptedProvider::replying(&[
        "We already have a vendor.",
        "You led with price. Lead with risk.",
    ]);
    let simulator = started(provider.clone());

    let exchange = match simulator.send("Our price beats theirs.").await {
        Ok(exchange) => exchange,
        Err(err) => panic!("send should succeed: {err}"),
    };
    assert_eq!(exchange.target.speaker, Speaker::SimulatedTarget);
    assert_eq!(exchange.target.text, "We already have a vendor.");
    assert_eq!(exchange.feedback, "You led with price. Lead with risk.");
    assert_eq!(simulator.feedback(), exchange.feedback);
    assert_eq!(simulator.conversation().len().await, 3);
    assert_eq!(simulator.conversation().state(), FeatureState::Idle);

    let requests = provider.requests();
    assert_eq!(requests.len(), 2);
    let target_prompt = &requests[0].prompt;
    assert!(target_prompt.contains("User: Our price beats theirs."));
    assert!(target_prompt.contains("Your Personality Profile: Skeptical procurement lead"));
    let feedback_prompt = &requests[1].prompt;
    assert!(feedback_prompt.contains("Client: Our price beats theirs."));
    assert!(feedback_prompt.contains("Target: We already have a vendor."));
}

#[tokio::test]
async fn empty_replies_use_placeholders() {
    let provider = ScriptedProvider::new(vec![Scripted::text("   "), Scripted::MissingText]);
    let simulator = started(provider);

    let exchange = match simulator.send("Hello.").await {
        Ok(exchange) => exchange,
        Err(err) => panic!("send should succeed: {err}"),
    };
    assert_eq!(exchange.target.text, TARGET_NO_RESPONSE);
    assert_eq!(exchange.feedback, FEEDBACK_NONE);
}

#[tokio::test]
async fn transport_failure_marks_simulation_error() {
    let provider = ScriptedProvider::new(vec![Scripted::Status(500, "boom".to_owned())]);
    let simulator = started(provider.clone());

    let exchange = match simulator.send("Hello.").await {
        Ok(exchange) => exchange,
        Err(err) => panic!("failures should become turns: {err}"),
    };
    assert!(exchange.target.text.starts_with("// SIMULATION ERROR:"));
    assert_eq!(exchange.feedback, FEEDBACK_CRITICAL);
    assert_eq!(simulator.conversation().state(), FeatureState::Failed);
    assert_eq!(provider.calls(), 1);
}

#[tokio::test]
async fn feedback_failure_keeps_target_reply_and_marks_simulation_error() {
    let provider = ScriptedProvider::new(vec![
        Scripted::text("Who sent you?"),
        Scripted::Status(500, "boom".to_owned()),
    ]);
    let simulator = started(provider.clone());

    let exchange = match simulator.send("A mutual friend.").await {
        Ok(exchange) => exchange,
        Err(err) => panic!("failures should become turns: {err}"),
    };
    assert_eq!(exchange.target.text, "Who sent you?");
    assert_eq!(exchange.feedback, FEEDBACK_CRITICAL);
    assert_eq!(simulator.feedback(), FEEDBACK_CRITICAL);

    let turns = simulator.conversation().turns().await;
    assert_eq!(turns.len(), 4);
    match turns.last() {
        Some(turn) => {
            assert_eq!(turn.speaker, Speaker::SimulatedTarget);
            assert!(turn.text.starts_with("// SIMULATION ERROR:"));
        }
        None => panic!("transcript should not be empty"),
    }
    assert_eq!(provider.calls(), 2);
    assert_eq!(simulator.conversation().state(), FeatureState::Failed);
}
