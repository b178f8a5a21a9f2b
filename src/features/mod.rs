//! Advisor features built on the shared context and dispatch machinery.
//!
//! Every conversational feature owns a [`Conversation`]: its transcript plus
//! the single-flight state. Failures from the model never escape a feature;
//! they become fallback turns or error fields.

use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

use crate::conversation::{
    bound_context, render_transcript, Speaker, SpeakerLabels, Transcript, Turn,
};
use crate::prompt::PromptError;
use crate::session::{Busy, FeatureState, FlightControl, FlightGuard};

pub mod chat;
pub mod codex;
pub mod dossier;
pub mod forge;
pub mod live;
pub mod training;

pub use chat::AdvisorChat;
pub use codex::Codex;
pub use dossier::DossierCompiler;
pub use forge::PersonaForge;
pub use live::LiveTactics;
pub use training::TrainingSimulator;

/// Errors a feature reports to its caller instead of a reply.
#[derive(Debug, thiserror::Error)]
pub enum FeatureError {
    /// A request is already outstanding for this feature.
    #[error(transparent)]
    Busy(#[from] Busy),
    /// The submitted text was blank.
    #[error("input is empty")]
    EmptyInput,
    /// The feature needs a profile and `start` has not been called.
    #[error("session has not been started")]
    SessionNotStarted,
    /// A required profile field is blank.
    #[error("invalid profile: {0}")]
    InvalidProfile(String),
    /// Template interpolation failed.
    #[error(transparent)]
    Prompt(#[from] PromptError),
}

/// Transcript and request state owned by one feature instance.
#[derive(Debug)]
pub struct Conversation {
    session_id: Uuid,
    transcript: Mutex<Transcript>,
    flight: FlightControl,
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new()
    }
}

impl Conversation {
    /// Empty conversation with a fresh session id.
    pub fn new() -> Self {
        Self {
            session_id: Uuid::new_v4(),
            transcript: Mutex::new(Transcript::new()),
            flight: FlightControl::new(),
        }
    }

    /// Conversation that opens with one framing turn.
    pub fn with_opening(speaker: Speaker, text: impl Into<String>) -> Self {
        let conversation = Self::new();
        let mut transcript = Transcript::new();
        transcript.push(speaker, text);
        Self {
            transcript: Mutex::new(transcript),
            ..conversation
        }
    }

    /// Identifier of the current session, for log correlation.
    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// Current request state.
    pub fn state(&self) -> FeatureState {
        self.flight.state()
    }

    /// Snapshot of every turn so far.
    pub async fn turns(&self) -> Vec<Turn> {
        self.transcript.lock().await.turns().to_vec()
    }

    /// Number of turns so far.
    pub async fn len(&self) -> usize {
        self.transcript.lock().await.len()
    }

    /// Whether the transcript is empty.
    pub async fn is_empty(&self) -> bool {
        self.transcript.lock().await.is_empty()
    }

    /// Clear the transcript and open a new session with one framing turn.
    pub fn restart(&mut self, speaker: Speaker, text: impl Into<String>) {
        self.session_id = Uuid::new_v4();
        let transcript = self.transcript.get_mut();
        transcript.reset();
        transcript.push(speaker, text);
        debug!(session_id = %self.session_id, "conversation restarted");
    }

    pub(crate) fn begin(&self) -> Result<FlightGuard<'_>, Busy> {
        self.flight.begin()
    }

    /// Append a turn and return a copy of it.
    pub(crate) async fn append(&self, speaker: Speaker, text: impl Into<String>) -> Turn {
        self.transcript.lock().await.push(speaker, text).clone()
    }

    /// Render the bounded window of the current transcript.
    pub(crate) async fn window(&self, limit: usize, labels: &SpeakerLabels) -> String {
        let transcript = self.transcript.lock().await;
        render_transcript(&bound_context(transcript.turns(), Some(limit)), labels)
    }
}

/// Trimmed input, or [`FeatureError::EmptyInput`].
pub(crate) fn require_input(input: &str) -> Result<&str, FeatureError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(FeatureError::EmptyInput);
    }
    Ok(trimmed)
}

/// `Err(InvalidProfile)` naming `field` when `value` is blank.
pub(crate) fn require_field(field: &str, value: &str) -> Result<(), FeatureError> {
    if value.trim().is_empty() {
        return Err(FeatureError::InvalidProfile(format!("{field} is required")));
    }
    Ok(())
}
