//! Open-ended advisor chat.

use tracing::{info, warn};

use crate::conversation::{Speaker, SpeakerLabels, Turn};
use crate::dispatch::Dispatcher;
use crate::prompt::{build_request, PromptFields, ADVISOR_CHAT};
use crate::providers::GenerateRequest;

use super::{require_input, Conversation, FeatureError};

/// Advisor turn that opens every chat.
pub const CHAT_OPENING: &str = "The stage is set. Describe the scene and the players. More importantly, tell me what you want to achieve. I will guide your hand.";

/// Advisor turn appended when counsel cannot be retrieved.
pub const CHAT_FAILURE: &str = "Error: Could not retrieve counsel. The line may be compromised.";

/// Window size for the chat, which carries more history than other features.
pub const CHAT_CONTEXT_LIMIT: usize = 12;

/// Advisor chat feature.
#[derive(Debug)]
pub struct AdvisorChat {
    dispatcher: Dispatcher,
    conversation: Conversation,
    limit: usize,
}

impl AdvisorChat {
    /// New chat seeded with the opening advisor turn.
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self {
            dispatcher,
            conversation: Conversation::with_opening(Speaker::Advisor, CHAT_OPENING),
            limit: CHAT_CONTEXT_LIMIT,
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

    /// Submit a client message and return the advisor's reply turn.
    ///
    /// Model failures produce a [`CHAT_FAILURE`] turn rather than an error.
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
        let prompt = build_request(&ADVISOR_CHAT, &PromptFields::new(), &history)?;

        let request = GenerateRequest::text(prompt);
        let (text, ok) = match self.dispatcher.dispatch(request).await {
            Ok(reply) => (reply.text, true),
            Err(e) => {
                warn!(
                    session_id = %self.conversation.session_id(),
                    error = %e,
                    "chat counsel failed"
                );
                (CHAT_FAILURE.to_owned(), false)
            }
        };

        let turn = self.conversation.append(Speaker::Advisor, text).await;
        flight.finish(ok);
        info!(
            session_id = %self.conversation.session_id(),
            turn = %turn.id,
            ok,
            "chat reply recorded"
        );
        Ok(turn)
    }
}
