//! Static reference library of principles, with model-generated anecdotes.

use std::sync::{Mutex, MutexGuard};

use tracing::{info, warn};

use crate::dispatch::Dispatcher;
use crate::prompt::{build_request, PromptFields, CODEX_ANECDOTE};
use crate::session::{FeatureState, FlightControl};
use crate::structured::AnecdoteReply;

use super::FeatureError;

/// Anecdote stored on a principle when generation fails.
pub const ANECDOTE_FAILURE: &str = "Error generating example.";
/// Codex-level error shown after a failed generation.
pub const CODEX_ERROR: &str = "Failed to generate example. Please try again.";

/// One principle in the library.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principle {
    /// Short name.
    pub title: String,
    /// One-paragraph explanation.
    pub text: String,
    /// Generated anecdote, once requested.
    pub anecdote: Option<String>,
}

/// A themed group of principles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodexSection {
    /// Stable key used to address the section.
    pub key: &'static str,
    /// Display title.
    pub title: &'static str,
    /// Principles in display order.
    pub principles: Vec<Principle>,
}

/// Errors specific to the codex.
#[derive(Debug, thiserror::Error)]
pub enum CodexError {
    /// No principle at that section/index.
    #[error("no principle {index} in section {section:?}")]
    UnknownPrinciple {
        /// Requested section key.
        section: String,
        /// Requested index.
        index: usize,
    },
    /// Shared feature failure.
    #[error(transparent)]
    Feature(#[from] FeatureError),
}

fn principle(title: &str, text: &str) -> Principle {
    Principle {
        title: title.to_owned(),
        text: text.to_owned(),
        anecdote: None,
    }
}

/// The built-in library.
pub fn default_sections() -> Vec<CodexSection> {
    vec![
        CodexSection {
            key: "persona",
            title: "On Persona",
            principles: vec![
                principle(
                    "The Mask of Virtue",
                    "Cultivate an image of calm, magnanimity, and principle. This is the velvet glove that disarms suspicion.",
                ),
                principle(
                    "The Reputation for Cruelty",
                    "It is better to be feared than loved. Demonstrate, through decisive action, that you are not one to be trifled with.",
                ),
                principle(
                    "Mastery of Non-Expression",
                    "An unreadable face is a tactical advantage. It frustrates opponents and forces them to make the first mistake.",
                ),
            ],
        },
        CodexSection {
            key: "counterintel",
            title: "On Counterintelligence",
            principles: vec![
                principle(
                    "Assume Universal Surveillance",
                    "Act as if your every move is observed by a hostile power. This fosters discipline.",
                ),
                principle(
                    "Identify Disinformation",
                    "Most of what people say is noise to bolster their ego. Filter it to find the rare fragments of truth.",
                ),
                principle(
                    "Control Information Outflow",
                    "Every word is a potential leak. Say less than necessary, and only to serve a strategic purpose.",
                ),
            ],
        },
        CodexSection {
            key: "field_ops",
            title: "On Field Operations",
            principles: vec![
                principle(
                    "Infiltration",
                    "Enter with purpose. Secure a position of tactical advantage where you can observe without being the center of attention.",
                ),
                principle(
                    "Controlled Engagement",
                    "Do not engage randomly. Select targets based on intelligence. Your objective is to test defenses and gauge utility.",
                ),
                principle(
                    "Exfiltration",
                    "Your departure is a critical part of the operation. A sudden absence at a moment of high tension is more powerful than a long goodbye.",
                ),
            ],
        },
        CodexSection {
            key: "sanctum",
            title: "Core Tenets",
            principles: vec![
                principle(
                    "The Ends Justify the Means (Machiavelli)",
                    "A ruler must be willing to do whatever it takes to maintain the state. Morality is a luxury that cannot be afforded.",
                ),
                principle(
                    "The Principle of Authority (Cialdini)",
                    "People obey figures of authority. Project it at all times, even when you do not possess it formally.",
                ),
                principle(
                    "Submit to Reality (Greene)",
                    "True mastery comes from a brutal acceptance of your own limitations and the long, painful process required to overcome them.",
                ),
            ],
        },
    ]
}

/// Codex feature.
#[derive(Debug)]
pub struct Codex {
    dispatcher: Dispatcher,
    sections: Mutex<Vec<CodexSection>>,
    error: Mutex<Option<String>>,
    flight: FlightControl,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
}

impl Codex {
    /// Codex over the built-in library.
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self::with_sections(dispatcher, default_sections())
    }

    /// Codex over a custom library.
    pub fn with_sections(dispatcher: Dispatcher, sections: Vec<CodexSection>) -> Self {
        Self {
            dispatcher,
            sections: Mutex::new(sections),
            error: Mutex::new(None),
            flight: FlightControl::new(),
        }
    }

    /// Snapshot of the library.
    pub fn sections(&self) -> Vec<CodexSection> {
        lock(&self.sections).clone()
    }

    /// Error from the last failed generation, cleared on the next attempt.
    pub fn error(&self) -> Option<String> {
        lock(&self.error).clone()
    }

    /// Current request state.
    pub fn state(&self) -> FeatureState {
        self.flight.state()
    }

    /// Generate and store an anecdote for one principle.
    ///
    /// On model failure the principle's anecdote becomes [`ANECDOTE_FAILURE`]
    /// and [`Codex::error`] is set; the stored text is returned either way.
    ///
    /// # Errors
    ///
    /// Returns [`CodexError::UnknownPrinciple`] for a bad address and
    /// [`FeatureError::Busy`] while another anecdote is being generated.
    pub async fn generate_anecdote(
        &self,
        section: &str,
        index: usize,
    ) -> Result<String, CodexError> {
        let target = lock(&self.sections)
            .iter()
            .find(|s| s.key == section)
            .and_then(|s| s.principles.get(index))
            .cloned()
            .ok_or_else(|| CodexError::UnknownPrinciple {
                section: section.to_owned(),
                index,
            })?;

        let flight = self.flight.begin().map_err(FeatureError::from)?;
        *lock(&self.error) = None;

        let fields = PromptFields::new()
            .with("title", target.title.as_str())
            .with("description", target.text.as_str());
        let prompt = build_request(&CODEX_ANECDOTE, &fields, "").map_err(FeatureError::from)?;

        let reply: Result<AnecdoteReply, _> = self.dispatcher.dispatch_structured(prompt).await;
        let (anecdote, ok) = match reply {
            Ok(reply) => {
                info!(principle = %target.title, "anecdote generated");
                (reply.anecdote, true)
            }
            Err(e) => {
                warn!(principle = %target.title, error = %e, "anecdote generation failed");
                *lock(&self.error) = Some(CODEX_ERROR.to_owned());
                (ANECDOTE_FAILURE.to_owned(), false)
            }
        };

        if let Some(slot) = lock(&self.sections)
            .iter_mut()
            .find(|s| s.key == section)
            .and_then(|s| s.principles.get_mut(index))
        {
            slot.anecdote = Some(anecdote.clone());
        }

        flight.finish(ok);
        Ok(anecdote)
    }
}
