//! Transcript append semantics.

use ghostline::conversation::{Speaker, Transcript, TurnId};

#[test]
fn ids_are_assigned_in_append_order() {
    let mut transcript = Transcript::new();
    let first = transcript.push(Speaker::User, "a").id;
    let second = transcript.push(Speaker::Advisor, "b").id;
    assert_eq!(first, TurnId(1));
    assert_eq!(second, TurnId(2));
}

#[test]
fn timestamps_never_decrease() {
    let mut transcript = Transcript::new();
    for n in 0..5 {
        transcript.push(Speaker::User, format!("{n}"));
    }
    let stamps: Vec<_> = transcript.turns().iter().map(|t| t.created_at).collect();
    assert!(stamps.windows(2).all(|w| w[0] <= w[1]));
}

#[test]
fn reset_clears_turns_but_keeps_ids_unique() {
    let mut transcript = Transcript::new();
    transcript.push(Speaker::User, "before");
    transcript.reset();
    assert!(transcript.is_empty());

    let after = transcript.push(Speaker::Advisor, "after").id;
    assert_eq!(after, TurnId(2));
    assert_eq!(transcript.len(), 1);
}

#[test]
fn last_returns_most_recent_turn() {
    let mut transcript = Transcript::new();
    assert!(transcript.last().is_none());
    transcript.push(Speaker::User, "one");
    transcript.push(Speaker::Advisor, "two");
    assert_eq!(transcript.last().map(|t| t.text.as_str()), Some("two"));
}
