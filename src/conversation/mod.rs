//! Conversation transcripts: turns, speakers, and the per-feature history.
//!
//! A [`Transcript`] is owned by exactly one feature instance and only ever
//! grows by appending [`Turn`]s. The [`context`] submodule derives bounded
//! windows from it and renders them into prompt text.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub mod context;

pub use context::{bound_context, render_transcript, SpeakerLabels, DEFAULT_CONTEXT_LIMIT};

// ---------------------------------------------------------------------------
// Core types
// ---------------------------------------------------------------------------

/// Who produced a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Speaker {
    /// The human operating the client.
    User,
    /// The advisor persona answering through the model.
    Advisor,
    /// The character played by the model in the training simulator.
    SimulatedTarget,
}

impl Speaker {
    /// Stable lowercase identifier, used in logs.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Advisor => "advisor",
            Self::SimulatedTarget => "simulated_target",
        }
    }
}

/// Identifier of a turn, unique and increasing within one transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TurnId(pub u64);

impl fmt::Display for TurnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One exchange unit in a conversation. Never edited after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    /// Transcript-local identifier.
    pub id: TurnId,
    /// Author of the turn.
    pub speaker: Speaker,
    /// Message body.
    pub text: String,
    /// When the turn was appended.
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Transcript
// ---------------------------------------------------------------------------

/// Ordered, append-only history of one conversational feature session.
#[derive(Debug, Clone)]
pub struct Transcript {
    turns: Vec<Turn>,
    next_id: u64,
}

impl Default for Transcript {
    fn default() -> Self {
        Self::new()
    }
}

impl Transcript {
    /// Create an empty transcript whose first turn will get id 1.
    pub fn new() -> Self {
        Self {
            turns: Vec::new(),
            next_id: 1,
        }
    }

    /// Append a new turn and return a reference to it.
    pub fn push(&mut self, speaker: Speaker, text: impl Into<String>) -> &Turn {
        let id = TurnId(self.next_id);
        self.next_id = self.next_id.saturating_add(1);
        let index = self.turns.len();
        self.turns.push(Turn {
            id,
            speaker,
            text: text.into(),
            created_at: Utc::now(),
        });
        &self.turns[index]
    }

    /// All turns in conversation order.
    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    /// The most recently appended turn.
    pub fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }

    /// Number of turns.
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    /// Whether no turns have been appended since creation or the last reset.
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Drop every turn. Ids keep increasing so they stay unique across resets.
    pub fn reset(&mut self) {
        self.turns.clear();
    }
}
