//! Training simulator: the model plays a target and the advisor critiques
//! each move.
//!
//! Every client move costs two sequential requests. The first asks the model
//! to answer in character; its reply is appended as a target turn. The second
//! asks the advisor to critique the exchange, including that new turn, and
//! replaces the feedback panel.

use std::sync::Mutex;

use tracing::{info, warn};

use crate::conversation::{Speaker, SpeakerLabels, Turn, DEFAULT_CONTEXT_LIMIT};
use crate::dispatch::{DispatchError, Dispatcher};
use crate::prompt::{build_request, PromptFields, SIMULATION, SIMULATION_FEEDBACK};
use crate::providers::GenerateRequest;

use super::{require_field, require_input, Conversation, FeatureError};

/// Target turn that opens every simulation.
pub const SIMULATION_OPENING: &str = "The simulation has begun. I am ready.";
/// Feedback shown before the first move.
pub const FEEDBACK_AWAITING: &str = "Awaiting your first move.";
/// Target turn used when the reply carries no text.
pub const TARGET_NO_RESPONSE: &str = "I am not sure how to respond to that.";
/// Feedback used when the critique carries no text.
pub const FEEDBACK_NONE: &str = "No feedback available.";
/// Feedback shown after a transport failure.
pub const FEEDBACK_CRITICAL: &str = "The simulation has encountered a critical error.";

/// Character the model plays and what the client is trying to do.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SimulationProfile {
    /// Personality profile of the simulated target. Required.
    pub personality: String,
    /// Client's objective. Required.
    pub objective: String,
}

/// Outcome of one client move.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulationExchange {
    /// Target turn appended for this move.
    pub target: Turn,
    /// Feedback after this move.
    pub feedback: String,
}

/// Training simulator feature.
#[derive(Debug)]
pub struct TrainingSimulator {
    dispatcher: Dispatcher,
    conversation: Conversation,
    profile: Option<SimulationProfile>,
    feedback: Mutex<String>,
    limit: usize,
}

impl TrainingSimulator {
    /// A simulator with no session started.
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self {
            dispatcher,
            conversation: Conversation::new(),
            profile: None,
            feedback: Mutex::new(FEEDBACK_AWAITING.to_owned()),
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

    /// Latest advisor feedback.
    pub fn feedback(&self) -> String {
        self.feedback
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    fn set_feedback(&self, text: impl Into<String>) -> String {
        let text = text.into();
        *self
            .feedback
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = text.clone();
        text
    }

    /// Start (or restart) a simulation.
    ///
    /// # Errors
    ///
    /// Returns [`FeatureError::InvalidProfile`] when personality or objective
    /// is blank.
    pub fn start(&mut self, profile: SimulationProfile) -> Result<(), FeatureError> {
        require_field("personality", &profile.personality)?;
        require_field("objective", &profile.objective)?;

        self.conversation
            .restart(Speaker::SimulatedTarget, SIMULATION_OPENING);
        self.set_feedback(FEEDBACK_AWAITING);
        info!(session_id = %self.conversation.session_id(), "simulation started");
        self.profile = Some(profile);
        Ok(())
    }

    /// Make a move; returns the target's reply and the advisor's critique.
    ///
    /// # Errors
    ///
    /// Returns [`FeatureError::SessionNotStarted`] before
    /// [`TrainingSimulator::start`], [`FeatureError::EmptyInput`] for blank
    /// input, and [`FeatureError::Busy`] while a previous move is outstanding.
    pub async fn send(&self, input: &str) -> Result<SimulationExchange, FeatureError> {
        let profile = self
            .profile
            .as_ref()
            .ok_or(FeatureError::SessionNotStarted)?;
        let input = require_input(input)?;
        let flight = self.conversation.begin()?;

        let fields = PromptFields::new()
            .with("personality", profile.personality.trim())
            .with("objective", profile.objective.trim());

        self.conversation.append(Speaker::User, input).await;

        // Step 1: target reply.
        let history = self
            .conversation
            .window(self.limit, &SpeakerLabels::simulation())
            .await;
        let prompt = build_request(&SIMULATION, &fields, &history)?;
        let request = GenerateRequest::text(prompt);
        let target_text = match self.dispatcher.dispatch(request).await {
            Ok(reply) if !reply.text.trim().is_empty() => reply.text,
            Ok(_) | Err(DispatchError::MalformedResponse(_)) => TARGET_NO_RESPONSE.to_owned(),
            Err(e) => {
                let target = self.record_failure(&e).await;
                flight.fail();
                return Ok(SimulationExchange {
                    target,
                    feedback: self.feedback(),
                });
            }
        };
        let target = self
            .conversation
            .append(Speaker::SimulatedTarget, target_text)
            .await;

        // Step 2: advisor feedback over the window that includes the new reply.
        let history = self
            .conversation
            .window(self.limit, &SpeakerLabels::feedback())
            .await;
        let prompt = build_request(&SIMULATION_FEEDBACK, &fields, &history)?;
        let request = GenerateRequest::text(prompt);
        let feedback = match self.dispatcher.dispatch(request).await {
            Ok(reply) if !reply.text.trim().is_empty() => reply.text,
            Ok(_) | Err(DispatchError::MalformedResponse(_)) => FEEDBACK_NONE.to_owned(),
            Err(e) => {
                self.record_failure(&e).await;
                flight.fail();
                return Ok(SimulationExchange {
                    target,
                    feedback: self.feedback(),
                });
            }
        };

        let feedback = self.set_feedback(feedback);
        flight.succeed();
        Ok(SimulationExchange { target, feedback })
    }

    async fn record_failure(&self, err: &DispatchError) -> Turn {
        warn!(
            session_id = %self.conversation.session_id(),
            error = %err,
            "simulation request failed"
        );
        self.set_feedback(FEEDBACK_CRITICAL);
        self.conversation
            .append(
                Speaker::SimulatedTarget,
                format!("// SIMULATION ERROR: {err} //"),
            )
            .await
    }
}
