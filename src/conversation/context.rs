//! Context window bounding and transcript rendering.
//!
//! Every outbound request carries a bounded view of the transcript: the first
//! turn (which frames the conversation) plus the most recent exchanges. The
//! bounded window is then flattened into `Label: text` lines for the prompt.

use tracing::debug;

use super::{Speaker, Turn};

/// Window size used when the caller gives no limit, or a limit of zero.
pub const DEFAULT_CONTEXT_LIMIT: usize = 10;

// ---------------------------------------------------------------------------
// Bounding
// ---------------------------------------------------------------------------

/// Bound a transcript to at most `limit` turns.
///
/// Strategy:
/// - At or under the limit, the turns are returned unchanged
/// - Otherwise keep the first turn and the last `limit - 1` turns
/// - Interior turns are dropped, never summarised
///
/// A missing or zero limit falls back to [`DEFAULT_CONTEXT_LIMIT`]. The input
/// slice is never modified.
pub fn bound_context(turns: &[Turn], limit: Option<usize>) -> Vec<Turn> {
    let limit = match limit {
        Some(0) | None => DEFAULT_CONTEXT_LIMIT,
        Some(n) => n,
    };

    if turns.len() <= limit {
        return turns.to_vec();
    }

    let tail_len = limit.saturating_sub(1);
    let tail_start = turns.len().saturating_sub(tail_len);

    let mut window = Vec::with_capacity(limit);
    window.push(turns[0].clone());
    window.extend_from_slice(&turns[tail_start..]);

    debug!(from = turns.len(), to = window.len(), "context truncated");
    window
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

/// Display labels for each speaker when a window is rendered into a prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeakerLabels {
    /// Label for [`Speaker::User`].
    pub user: String,
    /// Label for [`Speaker::Advisor`].
    pub advisor: String,
    /// Label for [`Speaker::SimulatedTarget`].
    pub simulated_target: String,
}

impl SpeakerLabels {
    /// Client / Advisor / Target, used by the advisor personas.
    pub fn advisor() -> Self {
        Self::new("Client", "Advisor", "Target")
    }

    /// User / Advisor / Target, used when the model plays the target.
    pub fn simulation() -> Self {
        Self::new("User", "Advisor", "Target")
    }

    /// Client versus everyone else, used for simulator feedback.
    pub fn feedback() -> Self {
        Self::new("Client", "Target", "Target")
    }

    /// Build a custom label set.
    pub fn new(
        user: impl Into<String>,
        advisor: impl Into<String>,
        simulated_target: impl Into<String>,
    ) -> Self {
        Self {
            user: user.into(),
            advisor: advisor.into(),
            simulated_target: simulated_target.into(),
        }
    }

    /// Label for a speaker.
    pub fn label(&self, speaker: Speaker) -> &str {
        match speaker {
            Speaker::User => &self.user,
            Speaker::Advisor => &self.advisor,
            Speaker::SimulatedTarget => &self.simulated_target,
        }
    }
}

/// Render turns as newline-joined `"<label>: <text>"` entries.
///
/// Turn text is copied verbatim, so a multi-line turn spans several lines
/// and only its first line carries the label.
pub fn render_transcript(turns: &[Turn], labels: &SpeakerLabels) -> String {
    turns
        .iter()
        .map(|turn| format!("{}: {}", labels.label(turn.speaker), turn.text))
        .collect::<Vec<_>>()
        .join("\n")
}
