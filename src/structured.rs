//! Typed structured replies extracted from model text.
//!
//! Features that expect JSON declare a [`StructuredReply`] type. The type
//! carries its required keys, which drive both the outbound response schema
//! and validation of the reply after parsing. A reply that is not a JSON
//! object with every required key as a string is a [`SchemaViolation`].

use std::sync::OnceLock;

use regex::Regex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::providers::ResponseSchema;

/// Reply text did not match the declared schema.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("schema violation: {reason}")]
pub struct SchemaViolation {
    /// What was wrong.
    pub reason: String,
    /// The offending text, for raw fallback display.
    pub raw: String,
}

impl SchemaViolation {
    fn new(reason: impl Into<String>, raw: &str) -> Self {
        Self {
            reason: reason.into(),
            raw: raw.to_owned(),
        }
    }
}

/// A reply shape a feature asks the model for.
pub trait StructuredReply: DeserializeOwned + Sized {
    /// Keys that must be present as strings.
    const REQUIRED_KEYS: &'static [&'static str];

    /// Outbound response schema.
    fn schema() -> ResponseSchema {
        ResponseSchema::required_strings(Self::REQUIRED_KEYS)
    }

    /// Parse and validate reply text.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaViolation`] when the text is not a JSON object or a
    /// required key is missing or not a string.
    fn parse(text: &str) -> Result<Self, SchemaViolation> {
        let value: Value = serde_json::from_str(text.trim())
            .map_err(|e| SchemaViolation::new(format!("invalid JSON: {e}"), text))?;

        let Some(object) = value.as_object() else {
            return Err(SchemaViolation::new("reply is not a JSON object", text));
        };

        for key in Self::REQUIRED_KEYS {
            match object.get(*key) {
                Some(Value::String(_)) => {}
                Some(_) => {
                    return Err(SchemaViolation::new(
                        format!("key {key:?} is not a string"),
                        text,
                    ))
                }
                None => {
                    return Err(SchemaViolation::new(
                        format!("missing required key {key:?}"),
                        text,
                    ))
                }
            }
        }

        serde_json::from_value(value).map_err(|e| SchemaViolation::new(e.to_string(), text))
    }
}

// ---------------------------------------------------------------------------
// Reply variants
// ---------------------------------------------------------------------------

/// Dossier compiler reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DossierReply {
    /// How the observable trait masks the vulnerability.
    pub analysis: String,
    /// Suggested social tactic.
    pub tactic: String,
}

impl StructuredReply for DossierReply {
    const REQUIRED_KEYS: &'static [&'static str] = &["analysis", "tactic"];
}

/// Codex anecdote reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnecdoteReply {
    /// Short story illustrating a principle.
    pub anecdote: String,
}

impl StructuredReply for AnecdoteReply {
    const REQUIRED_KEYS: &'static [&'static str] = &["anecdote"];
}

/// Final persona produced by the persona forge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonaDossier {
    /// Persona codename.
    pub codename: String,
    /// Actionable objective.
    pub objective: String,
    /// Operational environment.
    pub environment: String,
    /// Emotional state to project.
    pub core_emotion: String,
    /// Grounding mannerism.
    pub anchor: String,
}

impl StructuredReply for PersonaDossier {
    const REQUIRED_KEYS: &'static [&'static str] = &[
        "codename",
        "objective",
        "environment",
        "core_emotion",
        "anchor",
    ];
}

impl PersonaDossier {
    /// Look for a fenced persona dossier in free text.
    ///
    /// `Ok(None)` when the text has no fenced JSON block.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaViolation`] when a block is present but invalid.
    pub fn extract(text: &str) -> Result<Option<Self>, SchemaViolation> {
        match extract_fenced_json(text) {
            Some(block) => Self::parse(block).map(Some),
            None => Ok(None),
        }
    }
}

// ---------------------------------------------------------------------------
// Fenced payload extraction
// ---------------------------------------------------------------------------

fn fenced_json_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)```json[ \t]*\r?\n(.*?)\r?\n[ \t]*```").ok())
        .as_ref()
}

/// Body of the first ```` ```json ```` fenced block in `text`, if any.
pub fn extract_fenced_json(text: &str) -> Option<&str> {
    fenced_json_regex()?
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}
