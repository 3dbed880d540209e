//! Classification of raw boss output.

use crate::ai::COMPLETION_SENTINEL;

/// What the boss asked for on one turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BossReply {
    /// Ask the intern this question next.
    Continue(String),
    /// Stop and answer with this text.
    Complete(String),
    /// The sentinel was present but carried no answer.
    Malformed(String),
}

impl BossReply {
    /// Classify raw boss output.
    ///
    /// The sentinel is matched case-sensitively after leading whitespace. The
    /// answer is the remainder with surrounding whitespace trimmed. Output
    /// that is blank, or a sentinel with nothing after it, is malformed and
    /// keeps the raw text.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if let Some(rest) = trimmed.strip_prefix(COMPLETION_SENTINEL) {
            let answer = rest.trim();
            if answer.is_empty() {
                Self::Malformed(raw.to_string())
            } else {
                Self::Complete(answer.to_string())
            }
        } else if trimmed.is_empty() {
            Self::Malformed(raw.to_string())
        } else {
            Self::Continue(trimmed.to_string())
        }
    }
}
