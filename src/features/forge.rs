//! Persona forge: a guided interview that ends in a fenced JSON dossier.

use tracing::{info, warn};

use crate::conversation::{Speaker, SpeakerLabels, Turn, DEFAULT_CONTEXT_LIMIT};
use crate::dispatch::Dispatcher;
use crate::prompt::{build_request, PromptFields, PERSONA_FORGE};
use crate::providers::GenerateRequest;
use crate::structured::{PersonaDossier, SchemaViolation};

use super::{require_input, Conversation, FeatureError};

/// Advisor turn that opens the forge.
pub const FORGE_OPENING: &str = "We will forge a persona. A weaponized identity. Tell me everything about your objective and your current limitations. Hold nothing back.";

/// Advisor turn appended when the model cannot be reached.
pub const FORGE_FAILURE: &str = "A communication error has occurred. Stand by.";

/// Persona forge feature.
#[derive(Debug)]
pub struct PersonaForge {
    dispatcher: Dispatcher,
    conversation: Conversation,
    limit: usize,
}

impl PersonaForge {
    /// New forge seeded with the opening advisor turn.
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self {
            dispatcher,
            conversation: Conversation::with_opening(Speaker::Advisor, FORGE_OPENING),
            limit: DEFAULT_CONTEXT_LIMIT,
        }
    }

    /// Override the context window size.
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Transcript and request state.
    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    /// Answer the advisor's question; returns the advisor's next turn.
    ///
    /// # Errors
    ///
    /// Returns [`FeatureError::EmptyInput`] for blank input and
    /// [`FeatureError::Busy`] while a previous reply is outstanding.
    pub async fn send(&self, input: &str) -> Result<Turn, FeatureError> {
        let input = require_input(input)?;
        let flight = self.conversation.begin()?;

        self.conversation.append(Speaker::User, input).await;
        let history = self
            .conversation
            .window(self.limit, &SpeakerLabels::advisor())
            .await;
        let prompt = build_request(&PERSONA_FORGE, &PromptFields::new(), &history)?;

        let request = GenerateRequest::text(prompt);
        let (text, ok) = match self.dispatcher.dispatch(request).await {
            Ok(reply) => (reply.text, true),
            Err(e) => {
                warn!(
                    session_id = %self.conversation.session_id(),
                    error = %e,
                    "persona forge request failed"
                );
                (FORGE_FAILURE.to_owned(), false)
            }
        };

        let turn = self.conversation.append(Speaker::Advisor, text).await;
        flight.finish(ok);

        match Self::dossier_in(&turn) {
            Ok(Some(dossier)) => info!(codename = %dossier.codename, "persona dossier completed"),
            Ok(None) => {}
            Err(v) => warn!(reason = %v.reason, "persona dossier block is malformed"),
        }
        Ok(turn)
    }

    /// The persona dossier carried by an advisor turn, if any.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaViolation`] when the turn contains a fenced JSON block
    /// that is not a valid dossier. Callers display the raw text instead.
    pub fn dossier_in(turn: &Turn) -> Result<Option<PersonaDossier>, SchemaViolation> {
        if turn.speaker != Speaker::Advisor {
            return Ok(None);
        }
        PersonaDossier::extract(&turn.text)
    }

    /// The most recent valid dossier in the transcript.
    pub async fn completed_dossier(&self) -> Option<PersonaDossier> {
        self.conversation
            .turns()
            .await
            .iter()
            .rev()
            .find_map(|turn| Self::dossier_in(turn).ok().flatten())
    }
}
