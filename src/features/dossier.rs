//! One-shot psychological dossier compiled from three intelligence fields.

use std::sync::Mutex;

use tracing::{info, warn};

use crate::dispatch::{DispatchError, Dispatcher};
use crate::prompt::{build_request, PromptFields, DOSSIER};
use crate::session::{FeatureState, FlightControl};
use crate::structured::DossierReply;

use super::FeatureError;

/// Message shown when designation or trait is missing.
pub const DOSSIER_INCOMPLETE: &str =
    "Incomplete intelligence. Designation and Observable Trait are mandatory for profiling.";

const VULNERABILITY_UNKNOWN: &str = "Not provided. Infer based on the trait.";

/// What the client knows about the target.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DossierInput {
    /// Target designation. Required.
    pub designation: String,
    /// Observable trait (the mask). Required.
    pub observable_trait: String,
    /// Hypothesized core vulnerability (the shadow). Optional.
    pub vulnerability: String,
}

/// Result of the last compilation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DossierState {
    /// The model produced both fields.
    Compiled {
        /// `Dossier: <designation>`.
        title: String,
        /// Psychological profile, verbatim.
        analysis: String,
        /// Actionable tactic, verbatim.
        tactic: String,
    },
    /// Compilation was refused or failed.
    Failed {
        /// Human-readable error.
        message: String,
        /// Raw reply text when the model answered off-schema.
        raw_reply: Option<String>,
    },
}

/// Dossier compiler feature.
#[derive(Debug)]
pub struct DossierCompiler {
    dispatcher: Dispatcher,
    flight: FlightControl,
    last: Mutex<Option<DossierState>>,
}

impl DossierCompiler {
    /// A compiler with no dossier yet.
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self {
            dispatcher,
            flight: FlightControl::new(),
            last: Mutex::new(None),
        }
    }

    /// Current request state.
    pub fn state(&self) -> FeatureState {
        self.flight.state()
    }

    /// The most recent compilation result.
    pub fn dossier(&self) -> Option<DossierState> {
        self.last
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    fn store(&self, state: DossierState) -> DossierState {
        *self
            .last
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = Some(state.clone());
        state
    }

    /// Compile a dossier. Failures are returned as [`DossierState::Failed`].
    ///
    /// # Errors
    ///
    /// Returns [`FeatureError::Busy`] while a compilation is outstanding.
    pub async fn compile(&self, input: &DossierInput) -> Result<DossierState, FeatureError> {
        let designation = input.designation.trim();
        let observable_trait = input.observable_trait.trim();
        if designation.is_empty() || observable_trait.is_empty() {
            return Ok(self.store(DossierState::Failed {
                message: DOSSIER_INCOMPLETE.to_owned(),
                raw_reply: None,
            }));
        }

        let flight = self.flight.begin()?;

        let vulnerability = match input.vulnerability.trim() {
            "" => VULNERABILITY_UNKNOWN,
            v => v,
        };
        let fields = PromptFields::new()
            .with("designation", designation)
            .with("observable_trait", observable_trait)
            .with("vulnerability", vulnerability);
        let prompt = build_request(&DOSSIER, &fields, "")?;

        let reply: Result<DossierReply, _> = self.dispatcher.dispatch_structured(prompt).await;
        let state = match reply {
            Ok(reply) => {
                info!(designation, "dossier compiled");
                DossierState::Compiled {
                    title: format!("Dossier: {designation}"),
                    analysis: reply.analysis,
                    tactic: reply.tactic,
                }
            }
            Err(e) => {
                warn!(designation, error = %e, "dossier compilation failed");
                let raw_reply = match &e {
                    DispatchError::SchemaViolation(v) => Some(v.raw.clone()),
                    _ => None,
                };
                DossierState::Failed {
                    message: format!(
                        "Failed to compile dossier. The system may be unavailable. Details: {e}"
                    ),
                    raw_reply,
                }
            }
        };

        flight.finish(matches!(state, DossierState::Compiled { .. }));
        Ok(self.store(state))
    }
}
