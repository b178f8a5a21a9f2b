//! Live tactics: counsel during an ongoing conversation with a named target.

use std::sync::OnceLock;

use regex::Regex;
use tracing::{info, warn};

use crate::conversation::{Speaker, SpeakerLabels, Turn, DEFAULT_CONTEXT_LIMIT};
use crate::dispatch::{DispatchError, Dispatcher};
use crate::prompt::{build_request, PromptFields, LIVE_TACTICS};
use crate::providers::GenerateRequest;

use super::{require_field, require_input, Conversation, FeatureError};

/// Advisor turn used when the reply carries no text.
pub const LIVE_NO_RESPONSE: &str = "Error: No valid response from advisor.";

/// Who the client is talking to and what they want.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TargetProfile {
    /// Target name; may be blank.
    pub name: String,
    /// Free-form description of the target. Required.
    pub description: String,
    /// What the client wants to achieve. Required.
    pub objective: String,
}

impl TargetProfile {
    /// Name shown in prompts, `Unknown` when blank.
    pub fn display_name(&self) -> &str {
        let name = self.name.trim();
        if name.is_empty() {
            "Unknown"
        } else {
            name
        }
    }
}

/// Live tactics feature.
#[derive(Debug)]
pub struct LiveTactics {
    dispatcher: Dispatcher,
    conversation: Conversation,
    profile: Option<TargetProfile>,
    limit: usize,
}

impl LiveTactics {
    /// A feature with no session started.
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self {
            dispatcher,
            conversation: Conversation::new(),
            profile: None,
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

    /// Profile of the running session.
    pub fn profile(&self) -> Option<&TargetProfile> {
        self.profile.as_ref()
    }

    /// Start (or restart) a session against `profile`.
    ///
    /// Clears the transcript and posts an opening advisor turn.
    ///
    /// # Errors
    ///
    /// Returns [`FeatureError::InvalidProfile`] when the description or
    /// objective is blank.
    pub fn start(&mut self, profile: TargetProfile) -> Result<(), FeatureError> {
        require_field("description", &profile.description)?;
        require_field("objective", &profile.objective)?;

        let opening = format!(
            "Session started. Target: {}. Objective: {}. Report the conversation as it happens, or ask for an opening move. I will provide counsel.",
            profile.display_name(),
            profile.objective.trim()
        );
        self.conversation.restart(Speaker::Advisor, opening);
        info!(
            session_id = %self.conversation.session_id(),
            target = profile.display_name(),
            "live session started"
        );
        self.profile = Some(profile);
        Ok(())
    }

    /// Report the conversation or ask for a move; returns the advisor turn.
    ///
    /// # Errors
    ///
    /// Returns [`FeatureError::SessionNotStarted`] before [`LiveTactics::start`],
    /// [`FeatureError::EmptyInput`] for blank input, and [`FeatureError::Busy`]
    /// while a previous reply is outstanding.
    pub async fn send(&self, input: &str) -> Result<Turn, FeatureError> {
        let profile = self
            .profile
            .as_ref()
            .ok_or(FeatureError::SessionNotStarted)?;
        let input = require_input(input)?;
        let flight = self.conversation.begin()?;

        self.conversation.append(Speaker::User, input).await;
        let history = self
            .conversation
            .window(self.limit, &SpeakerLabels::advisor())
            .await;
        let fields = PromptFields::new()
            .with("name", profile.display_name())
            .with("description", profile.description.trim())
            .with("objective", profile.objective.trim());
        let prompt = build_request(&LIVE_TACTICS, &fields, &history)?;

        let request = GenerateRequest::text(prompt);
        let (text, ok) = match self.dispatcher.dispatch(request).await {
            Ok(reply) => (strip_move_markers(&reply.text), true),
            Err(e) => {
                warn!(
                    session_id = %self.conversation.session_id(),
                    error = %e,
                    "live tactics counsel failed"
                );
                (failure_text(&e), false)
            }
        };

        let turn = self.conversation.append(Speaker::Advisor, text).await;
        flight.finish(ok);
        Ok(turn)
    }
}

fn failure_text(err: &DispatchError) -> String {
    match err {
        DispatchError::MalformedResponse(_) => LIVE_NO_RESPONSE.to_owned(),
        other => format!("Error: Comms failure. {other}"),
    }
}

fn move_marker_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\*(?:Opener|Follow-up|Rationale):\*").ok())
        .as_ref()
}

/// Remove `*Opener:*`, `*Follow-up:*` and `*Rationale:*` markers and trim.
pub fn strip_move_markers(text: &str) -> String {
    match move_marker_regex() {
        Some(regex) => regex.replace_all(text, "").trim().to_owned(),
        None => text.trim().to_owned(),
    }
}
